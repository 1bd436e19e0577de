//! The logical-clock-driven instruction interpreter.

use crate::event::{Event, Outcome};
use crate::transaction::{Action, Transaction, TransactionBody, TransactionStatus};
use repsim_concurrency::{Acquire, LockManager, WaitForGraph};
use repsim_core::error::{Error, Result};
use repsim_core::instruction::Instruction;
use repsim_core::types::{ItemId, SiteId, SiteList, Tick, TransactionId, Value};
use repsim_store::{SiteDump, SiteStore};
use rustc_hash::FxHashMap;

/// The simulator: owns the site store, the lock manager, and the
/// transaction registry, and advances the logical clock by one per
/// processed instruction (re-dispatches included).
///
/// Drivers call [`Simulator::tick_boundary`] before each fresh input
/// line and once after the stream ends, and feed lines to
/// [`Simulator::process_instruction`].
#[derive(Debug)]
pub struct Simulator {
    /// Tick the next instruction will execute at.
    tick: Tick,
    store: SiteStore,
    locks: LockManager,
    txns: FxHashMap<TransactionId, Transaction>,
    /// Ended transactions in the order they ended.
    ended: Vec<(TransactionId, Outcome)>,
}

impl Simulator {
    /// Fresh simulator: all sites up, initial values, no transactions.
    pub fn new() -> Self {
        Simulator {
            tick: 0,
            store: SiteStore::new(),
            locks: LockManager::new(),
            txns: FxHashMap::default(),
            ended: Vec::new(),
        }
    }

    // ========================================================================
    // Public entry points
    // ========================================================================

    /// Parse and dispatch one instruction, consuming one clock tick.
    ///
    /// A malformed line still consumes its tick but changes no
    /// transaction or site state.
    pub fn process_instruction(&mut self, line: &str) -> Result<Vec<Event>> {
        let tick = self.tick;
        self.tick += 1;
        let instruction: Instruction = line.parse()?;
        tracing::debug!(tick, line = line.trim(), "dispatch");

        let mut events = Vec::new();
        match instruction {
            Instruction::Begin { txn } => self.begin(txn, tick, line),
            Instruction::BeginRo { txn } => self.begin_read_only(txn, tick, line, &mut events),
            Instruction::Read { txn, item } => self.read(txn, item, tick, line, &mut events)?,
            Instruction::Write { txn, item, value } => {
                self.write(txn, item, value, tick, line, &mut events)?
            }
            Instruction::Fail { site } => {
                self.store.fail(site, tick);
                events.push(Event::SiteFailed { site });
            }
            Instruction::Recover { site } => {
                self.store.recover(site, tick);
                self.locks.merge_site_waiters();
                events.push(Event::SiteRecovered { site });
            }
            Instruction::End { txn } => self.end(txn, line, &mut events)?,
            Instruction::Dump => events.push(Event::Dump {
                sites: self.store.dump(),
            }),
        }
        Ok(events)
    }

    /// Deadlock pass followed by a FIFO drain of the ready queue: the
    /// work done at every tick boundary.
    pub fn tick_boundary(&mut self) -> Vec<Event> {
        let mut events = self.detect_and_resolve_deadlocks();
        events.extend(self.run_ready());
        events
    }

    /// Run one wait-for-graph analysis and kill the youngest member of
    /// every cycle found. Killing a victim can leave a larger tangle
    /// partially intact; later boundaries pick up the rest.
    pub fn detect_and_resolve_deadlocks(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        for cycle in WaitForGraph::from_lock_manager(&self.locks).cycles() {
            tracing::info!(?cycle, "deadlock cycle detected");
            let victim = cycle
                .iter()
                .copied()
                .max_by_key(|t| (self.start_tick(*t), t.0));
            events.push(Event::CycleDetected { cycle });
            if let Some(victim) = victim {
                self.kill(victim);
                events.push(Event::Killed { txn: victim });
            }
        }
        events
    }

    /// Drain the ready queue, re-dispatching each transaction's stored
    /// instruction until it succeeds or blocks again. Each re-dispatch
    /// is an ordinary clock tick.
    pub fn run_ready(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(id) = self.locks.pop_ready() {
            let Some(txn) = self.txns.get_mut(&id) else {
                continue;
            };
            if txn.is_terminal() {
                continue;
            }
            txn.status = TransactionStatus::Running;
            let line = txn.current_instruction.clone();
            tracing::debug!(txn = id.0, line, "resuming blocked transaction");
            events.push(Event::Resumed { txn: id });
            match self.process_instruction(&line) {
                Ok(more) => events.extend(more),
                Err(err) => tracing::warn!(txn = id.0, %err, "stored instruction did not re-parse"),
            }
        }
        events
    }

    // ========================================================================
    // Read-only accessors
    // ========================================================================

    /// Tick the next instruction will execute at.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Lifecycle state of a transaction, if it has begun.
    pub fn transaction_status(&self, id: TransactionId) -> Option<TransactionStatus> {
        self.txns.get(&id).map(|t| t.status)
    }

    /// How a transaction ended, if it has.
    pub fn outcome(&self, id: TransactionId) -> Option<Outcome> {
        self.ended
            .iter()
            .find(|(t, _)| *t == id)
            .map(|(_, outcome)| *outcome)
    }

    /// Every ended transaction in end order.
    pub fn outcomes(&self) -> &[(TransactionId, Outcome)] {
        &self.ended
    }

    /// Per-site value rows.
    pub fn dump(&self) -> Vec<SiteDump> {
        self.store.dump()
    }

    /// The site store (inspection only).
    pub fn store(&self) -> &SiteStore {
        &self.store
    }

    /// The lock manager (inspection only).
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    // ========================================================================
    // Dispatch targets
    // ========================================================================

    fn begin(&mut self, id: TransactionId, tick: Tick, line: &str) {
        tracing::debug!(txn = id.0, tick, "begin read-write transaction");
        self.txns
            .insert(id, Transaction::read_write(id, tick, line.trim()));
    }

    /// Begin a read-only transaction and try to capture its snapshot.
    /// A retry after blocking re-creates the transaction at the retry
    /// tick, snapshot attempt included.
    fn begin_read_only(
        &mut self,
        id: TransactionId,
        tick: Tick,
        line: &str,
        events: &mut Vec<Event>,
    ) {
        let mut txn = Transaction::read_only(id, tick, line.trim());
        match self.store.snapshot() {
            Some(snapshot) => {
                tracing::debug!(txn = id.0, tick, "read-only snapshot acquired");
                txn.body = TransactionBody::ReadOnly {
                    snapshot: Some(snapshot),
                };
                events.push(Event::SnapshotTaken { txn: id });
            }
            None => {
                tracing::debug!(txn = id.0, tick, "snapshot unavailable, transaction parked");
                txn.status = TransactionStatus::Blocked;
                self.locks.push_site_waiter(id);
                events.push(Event::SnapshotUnavailable { txn: id });
            }
        }
        self.txns.insert(id, txn);
    }

    fn read(
        &mut self,
        id: TransactionId,
        item: ItemId,
        tick: Tick,
        line: &str,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let txn = self
            .txns
            .get_mut(&id)
            .ok_or(Error::UnknownTransaction(id.0))?;

        if let TransactionBody::ReadOnly { snapshot } = &txn.body {
            match snapshot {
                Some(snapshot) => {
                    txn.current_instruction = line.trim().to_string();
                    if let Some(value) = snapshot.get(&item).copied() {
                        events.push(Event::ReadValue {
                            txn: id,
                            item,
                            value,
                        });
                    }
                }
                // Still waiting for the snapshot; keep the stored
                // beginRO so the wake-up acquires it.
                None => events.push(Event::SnapshotUnavailable { txn: id }),
            }
            return Ok(());
        }
        txn.current_instruction = line.trim().to_string();

        match self.locks.acquire_shared(id, item, &mut self.store) {
            Acquire::Granted { sites } => {
                let site = sites[0];
                let stored = self.store.site(site).value(item);
                self.log_read(id, item, tick, site, stored, events);
            }
            Acquire::Blocked { blockers } => {
                self.block(id);
                events.push(Event::Blocked {
                    txn: id,
                    item,
                    waiting_for: blockers,
                });
            }
            Acquire::SiteWait => {
                self.block(id);
                events.push(Event::NoAvailableSite { txn: id, item });
            }
        }
        Ok(())
    }

    fn log_read(
        &mut self,
        id: TransactionId,
        item: ItemId,
        tick: Tick,
        site: SiteId,
        stored: Option<Value>,
        events: &mut Vec<Event>,
    ) {
        let Some(txn) = self.txns.get_mut(&id) else {
            return;
        };
        let TransactionBody::ReadWrite {
            log,
            pending_writes,
        } = &mut txn.body
        else {
            return;
        };
        let value = pending_writes
            .get(&item)
            .copied()
            .or(stored)
            .expect("a site that granted a lock replicates the item");
        let mut sites = SiteList::new();
        sites.push(site);
        log.insert(tick, Action::Read { item, value, sites });
        events.push(Event::ReadValue {
            txn: id,
            item,
            value,
        });
    }

    fn write(
        &mut self,
        id: TransactionId,
        item: ItemId,
        value: Value,
        tick: Tick,
        line: &str,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let txn = self
            .txns
            .get_mut(&id)
            .ok_or(Error::UnknownTransaction(id.0))?;
        if txn.is_read_only() {
            return Err(Error::InvalidInstruction(format!(
                "read-only transaction T{} cannot write",
                id.0
            )));
        }
        txn.current_instruction = line.trim().to_string();

        match self.locks.acquire_exclusive(id, item, &mut self.store) {
            Acquire::Granted { sites } => {
                if let Some(txn) = self.txns.get_mut(&id) {
                    if let TransactionBody::ReadWrite {
                        log,
                        pending_writes,
                    } = &mut txn.body
                    {
                        pending_writes.insert(item, value);
                        log.insert(tick, Action::Write { item, value, sites });
                    }
                }
                tracing::debug!(txn = id.0, item = item.0, value, "write buffered");
            }
            Acquire::Blocked { blockers } => {
                self.block(id);
                events.push(Event::Blocked {
                    txn: id,
                    item,
                    waiting_for: blockers,
                });
            }
            Acquire::SiteWait => {
                self.block(id);
                events.push(Event::NoAvailableSite { txn: id, item });
            }
        }
        Ok(())
    }

    fn end(&mut self, id: TransactionId, line: &str, events: &mut Vec<Event>) -> Result<()> {
        let txn = self
            .txns
            .get_mut(&id)
            .ok_or(Error::UnknownTransaction(id.0))?;
        txn.current_instruction = line.trim().to_string();
        let status = txn.status;
        let read_only = txn.is_read_only();

        match status {
            TransactionStatus::Committed | TransactionStatus::Aborted => {
                let outcome = self.outcome(id).unwrap_or(Outcome::Aborted);
                events.push(Event::AlreadyEnded { txn: id, outcome });
            }
            TransactionStatus::Blocked => {
                events.push(Event::EndWhileBlocked { txn: id });
            }
            TransactionStatus::Running if read_only => {
                self.finish(id, Outcome::Committed);
                events.push(Event::Committed { txn: id });
            }
            TransactionStatus::Running => match self.stale_site(id) {
                None => self.commit(id, events),
                Some(stale_site) => {
                    tracing::info!(
                        txn = id.0,
                        site = stale_site.0,
                        "touched site failed after lock grant, aborting"
                    );
                    self.locks.release_locks(id, &mut self.store);
                    self.finish(id, Outcome::Aborted);
                    events.push(Event::Aborted {
                        txn: id,
                        stale_site,
                    });
                }
            },
        }

        // Retry everything parked on site unavailability next boundary.
        self.locks.merge_site_waiters();
        Ok(())
    }

    // ========================================================================
    // Commit path
    // ========================================================================

    /// First-committer validation: a touched site that failed after
    /// the tick its lock was granted invalidates the whole
    /// transaction. Returns the first such site.
    fn stale_site(&self, id: TransactionId) -> Option<SiteId> {
        let txn = self.txns.get(&id)?;
        let TransactionBody::ReadWrite { log, .. } = &txn.body else {
            return None;
        };
        for (granted_at, action) in log {
            for &site in action.sites() {
                if matches!(self.store.site(site).last_failed(), Some(failed) if failed > *granted_at)
                {
                    return Some(site);
                }
            }
        }
        None
    }

    fn commit(&mut self, id: TransactionId, events: &mut Vec<Event>) {
        let writes: Vec<(ItemId, Value, SiteList)> = match self.txns.get(&id) {
            Some(Transaction {
                body: TransactionBody::ReadWrite { log, .. },
                ..
            }) => log
                .values()
                .filter_map(|action| match action {
                    Action::Write { item, value, sites } => {
                        Some((*item, *value, sites.clone()))
                    }
                    Action::Read { .. } => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        for (item, value, sites) in writes {
            self.store.write(item, value, &sites);
        }
        self.locks.release_locks(id, &mut self.store);
        self.finish(id, Outcome::Committed);
        events.push(Event::Committed { txn: id });
    }

    /// Kill a deadlock victim: wait-record purge, lock release, and a
    /// terminal Killed outcome.
    fn kill(&mut self, victim: TransactionId) {
        self.locks.kill(victim, &mut self.store);
        self.finish(victim, Outcome::Killed);
    }

    fn finish(&mut self, id: TransactionId, outcome: Outcome) {
        if let Some(txn) = self.txns.get_mut(&id) {
            txn.status = match outcome {
                Outcome::Committed => TransactionStatus::Committed,
                Outcome::Aborted | Outcome::Killed => TransactionStatus::Aborted,
            };
            if let TransactionBody::ReadWrite { pending_writes, .. } = &mut txn.body {
                pending_writes.clear();
            }
        }
        self.ended.push((id, outcome));
        tracing::info!(txn = id.0, %outcome, "transaction ended");
    }

    fn block(&mut self, id: TransactionId) {
        if let Some(txn) = self.txns.get_mut(&id) {
            txn.status = TransactionStatus::Blocked;
        }
    }

    fn start_tick(&self, id: TransactionId) -> Tick {
        self.txns.get(&id).map(|t| t.started_at).unwrap_or(0)
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}
