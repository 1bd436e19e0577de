//! Identifier newtypes and the static replication layout.
//!
//! The database is fixed at startup: ten sites, twenty data items.
//! Items with an even id are replicated at every site; items with an
//! odd id live at exactly one site, `(id mod 10) + 1`. The layout
//! never changes during a run, so it is encoded here as pure functions
//! on [`ItemId`] rather than as mutable state.

use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;

/// Number of sites in the simulated database.
pub const NUM_SITES: u32 = 10;

/// Number of data items in the simulated database.
pub const NUM_ITEMS: u32 = 20;

/// Value stored for a data item.
pub type Value = i64;

/// Logical clock reading. The clock advances by exactly one per
/// processed instruction, including re-dispatches of resumed
/// transactions.
pub type Tick = u64;

/// Site id list, sized for the full replica set of an even item.
pub type SiteList = SmallVec<[SiteId; NUM_SITES as usize]>;

/// Identifier of a transaction (`T3` in instruction text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TransactionId(pub u32);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Identifier of a site, in `1..=NUM_SITES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SiteId(pub u32);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site {}", self.0)
    }
}

impl SiteId {
    /// Iterate over every site id in ascending order.
    pub fn all() -> impl Iterator<Item = SiteId> {
        (1..=NUM_SITES).map(SiteId)
    }
}

/// Identifier of a data item (`x7` in instruction text), in
/// `1..=NUM_ITEMS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl ItemId {
    /// Iterate over every item id in ascending order.
    pub fn all() -> impl Iterator<Item = ItemId> {
        (1..=NUM_ITEMS).map(ItemId)
    }

    /// Whether this item is replicated at every site (even ids) as
    /// opposed to stored at a single home site (odd ids).
    pub fn is_replicated(self) -> bool {
        self.0 % 2 == 0
    }

    /// The single site storing a non-replicated item.
    pub fn home_site(self) -> SiteId {
        SiteId(self.0 % NUM_SITES + 1)
    }

    /// The sites holding a copy of this item, in ascending site order.
    pub fn replica_sites(self) -> SiteList {
        if self.is_replicated() {
            SiteId::all().collect()
        } else {
            let mut sites = SiteList::new();
            sites.push(self.home_site());
            sites
        }
    }

    /// Whether `site` is one of this item's designated replicas.
    pub fn stored_at(self, site: SiteId) -> bool {
        self.is_replicated() || self.home_site() == site
    }

    /// Value every item holds before the first committed write.
    pub fn initial_value(self) -> Value {
        10 * Value::from(self.0)
    }
}
