//! Lock acquisition and release under the available-copies protocol.
//!
//! A read locks one readable Up replica; a write locks every Up
//! replica. Blocked requests are parked in a per-item FIFO wait record
//! of `(waiter, blocking-set)` pairs; requests that found no usable
//! replica at all are parked on a separate site-unavailability list
//! and retried opportunistically after `end` and `recover`.

use repsim_core::types::{ItemId, SiteList, TransactionId};
use repsim_store::{Lock, LockKind, SiteStore};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Outcome of a lock acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquire {
    /// Locks granted at the listed sites (one site for a shared
    /// acquisition, every Up replica for an exclusive one).
    Granted {
        /// Sites where a lock was created, joined, promoted, or reused.
        sites: SiteList,
    },
    /// The request conflicts with existing holders; the transaction
    /// has been enqueued on the item's wait record.
    Blocked {
        /// Who the transaction now waits for, in ascending id order.
        blockers: Vec<TransactionId>,
    },
    /// No Up replica could serve the request; the transaction has been
    /// placed on the site-unavailability waiting list.
    SiteWait,
}

#[derive(Debug)]
struct Waiter {
    txn: TransactionId,
    blockers: FxHashSet<TransactionId>,
}

/// Acquires and releases locks across the site fleet and owns all of
/// the waiting bookkeeping: per-item wait records, the
/// site-unavailability list, and the ready queue of transactions
/// eligible to re-run their stored instruction.
#[derive(Debug, Default)]
pub struct LockManager {
    /// Per-item FIFO of waiting transactions and who blocks them.
    waits: FxHashMap<ItemId, Vec<Waiter>>,
    /// Transactions waiting for any usable replica to appear.
    site_waiters: Vec<TransactionId>,
    /// Transactions cleared to retry, drained FIFO by the scheduler.
    ready: VecDeque<TransactionId>,
}

impl LockManager {
    /// Fresh manager with no locks and no waiters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a shared lock on `item` for `txn`.
    ///
    /// Walks the item's replicas in site order and decides at the
    /// first Up site where the item is readable: grant a new shared
    /// lock, join an existing shared lock (only while nobody is queued
    /// for the item), reuse the transaction's own exclusive lock, or
    /// block on the current holders. Sites that are Down or whose copy
    /// is awaiting revalidation are skipped entirely.
    pub fn acquire_shared(
        &mut self,
        txn: TransactionId,
        item: ItemId,
        store: &mut SiteStore,
    ) -> Acquire {
        for site_id in item.replica_sites() {
            let site = store.site_mut(site_id);
            if !site.is_up() || !site.is_readable(item) {
                continue;
            }
            let queue_clear = self.queue_empty(item);
            return match site.lock_mut(item) {
                None => {
                    site.set_lock(Lock::new(LockKind::Shared, txn, site_id, item));
                    tracing::debug!(%txn, %item, site = site_id.0, "shared lock granted");
                    granted_at(site_id)
                }
                Some(lock) if lock.kind == LockKind::Shared && queue_clear => {
                    if !lock.held_by(txn) {
                        lock.holders.push(txn);
                    }
                    tracing::debug!(%txn, %item, site = site_id.0, "shared lock joined");
                    granted_at(site_id)
                }
                Some(lock) if lock.kind == LockKind::Exclusive && lock.held_solely_by(txn) => {
                    // Reading under its own exclusive lock.
                    granted_at(site_id)
                }
                Some(lock) => {
                    let holders = lock.holders.clone();
                    let blockers = self.enqueue(item, txn, &holders);
                    tracing::debug!(%txn, %item, ?blockers, "shared request blocked");
                    Acquire::Blocked { blockers }
                }
            };
        }

        tracing::debug!(%txn, %item, "no readable replica for shared request");
        self.site_waiters.push(txn);
        Acquire::SiteWait
    }

    /// Acquire exclusive locks on `item` for `txn` at every Up
    /// replica.
    ///
    /// Per site: lock if free, promote the transaction's own sole
    /// shared lock (only while nobody is queued), or reuse its own
    /// exclusive lock. Any conflict fails the whole acquisition and
    /// enqueues the transaction; sites granted earlier in the same
    /// walk are left locked (see DESIGN.md). With no Up replica at
    /// all, the transaction joins the site-unavailability list.
    pub fn acquire_exclusive(
        &mut self,
        txn: TransactionId,
        item: ItemId,
        store: &mut SiteStore,
    ) -> Acquire {
        let mut granted = SiteList::new();
        for site_id in item.replica_sites() {
            let site = store.site_mut(site_id);
            if !site.is_up() {
                continue;
            }
            let queue_clear = self.queue_empty(item);
            match site.lock_mut(item) {
                None => {
                    site.set_lock(Lock::new(LockKind::Exclusive, txn, site_id, item));
                    granted.push(site_id);
                }
                Some(lock)
                    if lock.kind == LockKind::Shared
                        && queue_clear
                        && lock.held_solely_by(txn) =>
                {
                    lock.kind = LockKind::Exclusive;
                    tracing::debug!(%txn, %item, site = site_id.0, "lock promoted to exclusive");
                    granted.push(site_id);
                }
                Some(lock) if lock.kind == LockKind::Exclusive && lock.held_solely_by(txn) => {
                    granted.push(site_id);
                }
                Some(lock) => {
                    let holders = lock.holders.clone();
                    let blockers = self.enqueue(item, txn, &holders);
                    tracing::debug!(%txn, %item, ?blockers, "exclusive request blocked");
                    return Acquire::Blocked { blockers };
                }
            }
        }

        if granted.is_empty() {
            tracing::debug!(%txn, %item, "no up replica for exclusive request");
            self.site_waiters.push(txn);
            return Acquire::SiteWait;
        }
        tracing::debug!(%txn, %item, ?granted, "exclusive locks granted");
        Acquire::Granted { sites: granted }
    }

    /// Release every lock `txn` holds anywhere, then wake any waiter
    /// left with an empty blocking set on the affected items.
    ///
    /// The site lock tables are the source of truth: every item's
    /// replicas are scanned for locks listing the transaction, so
    /// entries wiped by an intervening site failure are simply absent,
    /// and exclusive grants stranded by a failed multi-site walk are
    /// reclaimed here.
    pub fn release_locks(&mut self, txn: TransactionId, store: &mut SiteStore) {
        for item in ItemId::all() {
            let mut held = false;
            for site_id in item.replica_sites() {
                let site = store.site_mut(site_id);
                let Some(lock) = site.lock_mut(item) else {
                    continue;
                };
                if !lock.held_by(txn) {
                    continue;
                }
                held = true;
                if lock.kind == LockKind::Shared && lock.holders.len() > 1 {
                    lock.holders.retain(|t| *t != txn);
                } else {
                    site.clear_lock(item);
                }
            }
            if held {
                self.wake(item, txn);
            }
        }
        tracing::debug!(%txn, "all locks released");
    }

    /// Kill a deadlock victim: drop its pending requests from every
    /// wait record, release its locks, and purge it from every
    /// remaining blocking set (waking whoever that frees).
    pub fn kill(&mut self, txn: TransactionId, store: &mut SiteStore) {
        for queue in self.waits.values_mut() {
            queue.retain(|w| w.txn != txn);
        }
        self.waits.retain(|_, queue| !queue.is_empty());
        self.site_waiters.retain(|t| *t != txn);
        self.ready.retain(|t| *t != txn);

        self.release_locks(txn, store);

        let items_waited: Vec<ItemId> = self.waits.keys().copied().collect();
        for item in items_waited {
            self.wake(item, txn);
        }
        tracing::info!(%txn, "transaction killed");
    }

    /// Move every site-unavailability waiter onto the ready queue.
    /// Invoked by the scheduler after `end` and `recover`.
    pub fn merge_site_waiters(&mut self) {
        self.ready.extend(self.site_waiters.drain(..));
    }

    /// Park a transaction on the site-unavailability list directly
    /// (used when a read-only snapshot cannot be taken).
    pub fn push_site_waiter(&mut self, txn: TransactionId) {
        self.site_waiters.push(txn);
    }

    /// Next transaction cleared to re-run, FIFO.
    pub fn pop_ready(&mut self) -> Option<TransactionId> {
        self.ready.pop_front()
    }

    /// Whether nobody is queued on `item`'s wait record.
    pub fn queue_empty(&self, item: ItemId) -> bool {
        self.waits.get(&item).map_or(true, |q| q.is_empty())
    }

    /// Transactions queued on `item`, FIFO order.
    pub fn waiters(&self, item: ItemId) -> Vec<TransactionId> {
        self.waits
            .get(&item)
            .map(|q| q.iter().map(|w| w.txn).collect())
            .unwrap_or_default()
    }

    /// Whether `txn` is parked: queued on some item's wait record or
    /// on the site-unavailability list. Merely blocking someone else
    /// does not count.
    pub fn is_waiting(&self, txn: TransactionId) -> bool {
        self.site_waiters.contains(&txn)
            || self.waits.values().any(|q| q.iter().any(|w| w.txn == txn))
    }

    /// `(waiter, blocking-set)` pairs across all items, for the
    /// wait-for graph.
    pub(crate) fn wait_edges(
        &self,
    ) -> impl Iterator<Item = (TransactionId, &FxHashSet<TransactionId>)> {
        self.waits
            .values()
            .flat_map(|q| q.iter().map(|w| (w.txn, &w.blockers)))
    }

    /// Enqueue `txn` on `item`: it must wait for everyone already
    /// queued plus the current holders. Re-enqueueing keeps the
    /// transaction's FIFO position and replaces its blocking set.
    fn enqueue(
        &mut self,
        item: ItemId,
        txn: TransactionId,
        holders: &[TransactionId],
    ) -> Vec<TransactionId> {
        let queue = self.waits.entry(item).or_default();
        let mut blockers: FxHashSet<TransactionId> = queue
            .iter()
            .filter(|w| w.txn != txn)
            .map(|w| w.txn)
            .collect();
        blockers.extend(holders.iter().copied());
        blockers.remove(&txn);

        let mut sorted: Vec<TransactionId> = blockers.iter().copied().collect();
        sorted.sort_unstable();

        if let Some(existing) = queue.iter_mut().find(|w| w.txn == txn) {
            existing.blockers = blockers;
        } else {
            queue.push(Waiter { txn, blockers });
        }
        sorted
    }

    /// Remove `released` from every blocking set on `item`, then
    /// promote each waiter whose set became empty to the ready queue,
    /// FIFO order.
    fn wake(&mut self, item: ItemId, released: TransactionId) {
        let mut promoted = Vec::new();
        if let Some(queue) = self.waits.get_mut(&item) {
            for waiter in queue.iter_mut() {
                waiter.blockers.remove(&released);
            }
            queue.retain(|w| {
                if w.blockers.is_empty() {
                    promoted.push(w.txn);
                    false
                } else {
                    true
                }
            });
        }
        if self.queue_empty(item) {
            self.waits.remove(&item);
        }
        for txn in promoted {
            tracing::debug!(%txn, %item, "waiter promoted to ready queue");
            self.ready.push_back(txn);
        }
    }
}

fn granted_at(site: repsim_core::types::SiteId) -> Acquire {
    let mut sites = SiteList::new();
    sites.push(site);
    Acquire::Granted { sites }
}
