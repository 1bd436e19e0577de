//! A single site: values, locks, readability, and its fail/recover
//! state machine.

use repsim_core::types::{ItemId, SiteId, Tick, TransactionId, Value};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Whether a site is serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    /// Serving reads and writes.
    Up,
    /// Failed; holds no locks and serves nothing until recovery.
    Down,
}

/// Lock mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    /// Shared read lock; may accumulate holders.
    Shared,
    /// Exclusive write lock; exactly one holder.
    Exclusive,
}

/// A lock on one item at one site. A site's lock table holds at most
/// one lock per item; sharing is expressed through `holders`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    /// Current mode. Promotion flips Shared to Exclusive in place.
    pub kind: LockKind,
    /// Transactions holding the lock, in acquisition order.
    pub holders: SmallVec<[TransactionId; 2]>,
    /// Site this lock lives at.
    pub site: SiteId,
    /// Item it covers.
    pub item: ItemId,
}

impl Lock {
    /// New lock with a single holder.
    pub fn new(kind: LockKind, txn: TransactionId, site: SiteId, item: ItemId) -> Self {
        let mut holders = SmallVec::new();
        holders.push(txn);
        Lock {
            kind,
            holders,
            site,
            item,
        }
    }

    /// Whether `txn` is among the holders.
    pub fn held_by(&self, txn: TransactionId) -> bool {
        self.holders.contains(&txn)
    }

    /// Whether `txn` is the one and only holder.
    pub fn held_solely_by(&self, txn: TransactionId) -> bool {
        self.holders.len() == 1 && self.holders[0] == txn
    }
}

/// One site of the replicated store.
///
/// Invariant: an item appears in this site's tables only if the site
/// is one of the item's designated replicas.
#[derive(Debug)]
pub struct Site {
    id: SiteId,
    status: SiteStatus,
    values: FxHashMap<ItemId, Value>,
    locks: FxHashMap<ItemId, Lock>,
    readable: FxHashSet<ItemId>,
    last_failed: Option<Tick>,
    last_recovered: Option<Tick>,
}

impl Site {
    /// Fresh site holding its replica subset at initial values, all
    /// readable, no locks, never failed.
    pub fn new(id: SiteId) -> Self {
        let mut values = FxHashMap::default();
        let mut readable = FxHashSet::default();
        for item in ItemId::all().filter(|item| item.stored_at(id)) {
            values.insert(item, item.initial_value());
            readable.insert(item);
        }
        Site {
            id,
            status: SiteStatus::Up,
            values,
            locks: FxHashMap::default(),
            readable,
            last_failed: None,
            last_recovered: None,
        }
    }

    /// Site id.
    pub fn id(&self) -> SiteId {
        self.id
    }

    /// Whether the site is up.
    pub fn is_up(&self) -> bool {
        self.status == SiteStatus::Up
    }

    /// Current status.
    pub fn status(&self) -> SiteStatus {
        self.status
    }

    /// Tick of the most recent failure, if any.
    pub fn last_failed(&self) -> Option<Tick> {
        self.last_failed
    }

    /// Tick of the most recent recovery, if any.
    pub fn last_recovered(&self) -> Option<Tick> {
        self.last_recovered
    }

    /// Whether this site stores `item` at all.
    pub fn stores(&self, item: ItemId) -> bool {
        self.values.contains_key(&item)
    }

    /// Whether `item` may currently be read at this site.
    pub fn is_readable(&self, item: ItemId) -> bool {
        self.readable.contains(&item)
    }

    /// Current stored value of `item`, if this site replicates it.
    pub fn value(&self, item: ItemId) -> Option<Value> {
        self.values.get(&item).copied()
    }

    /// Current lock on `item`, if any.
    pub fn lock(&self, item: ItemId) -> Option<&Lock> {
        self.locks.get(&item)
    }

    /// Mutable access to the current lock on `item`.
    pub fn lock_mut(&mut self, item: ItemId) -> Option<&mut Lock> {
        self.locks.get_mut(&item)
    }

    /// Install a lock, replacing any existing entry for the item.
    pub fn set_lock(&mut self, lock: Lock) {
        self.locks.insert(lock.item, lock);
    }

    /// Clear the lock-table entry for `item`.
    pub fn clear_lock(&mut self, item: ItemId) {
        self.locks.remove(&item);
    }

    /// Fail the site: mark Down, wipe the lock table (holders are not
    /// notified), wipe the readable set, record the tick.
    pub fn fail(&mut self, ts: Tick) {
        self.status = SiteStatus::Down;
        self.locks.clear();
        self.readable.clear();
        self.last_failed = Some(ts);
    }

    /// Recover the site: mark Up and record the tick. Only
    /// non-replicated items become readable again; a replicated item
    /// stays unreadable until the next committed write reaches this
    /// site, since the local copy may be stale.
    pub fn recover(&mut self, ts: Tick) {
        self.status = SiteStatus::Up;
        for item in self.values.keys().copied().filter(|i| !i.is_replicated()) {
            self.readable.insert(item);
        }
        self.last_recovered = Some(ts);
    }

    /// Store a committed value and mark the item readable here.
    pub fn write(&mut self, item: ItemId, value: Value) {
        self.values.insert(item, value);
        self.readable.insert(item);
    }

    /// `(item, value)` rows in ascending item order, for dumps.
    pub fn rows(&self) -> Vec<(ItemId, Value)> {
        let mut rows: Vec<_> = self.values.iter().map(|(i, v)| (*i, *v)).collect();
        rows.sort_by_key(|(item, _)| *item);
        rows
    }
}
