//! The aggregate of all ten sites.

use crate::site::Site;
use repsim_core::types::{ItemId, SiteId, Tick, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// Values of one site, as reported by [`SiteStore::dump`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteDump {
    /// Site being reported.
    pub site: SiteId,
    /// `(item, value)` rows in ascending item order.
    pub items: Vec<(ItemId, Value)>,
}

/// Owns every [`Site`] and answers cross-site questions: committed
/// writes, snapshot scans, and dumps. Failure and recovery are
/// delegated to the site's own state machine.
#[derive(Debug)]
pub struct SiteStore {
    sites: Vec<Site>,
}

impl SiteStore {
    /// Fresh store with all sites up and at initial values.
    pub fn new() -> Self {
        SiteStore {
            sites: SiteId::all().map(Site::new).collect(),
        }
    }

    /// Shared access to one site.
    pub fn site(&self, id: SiteId) -> &Site {
        &self.sites[(id.0 - 1) as usize]
    }

    /// Mutable access to one site.
    pub fn site_mut(&mut self, id: SiteId) -> &mut Site {
        &mut self.sites[(id.0 - 1) as usize]
    }

    /// Iterate over all sites in id order.
    pub fn sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter()
    }

    /// Fail a site at tick `ts`.
    pub fn fail(&mut self, id: SiteId, ts: Tick) {
        tracing::info!(site = id.0, tick = ts, "site failed");
        self.site_mut(id).fail(ts);
    }

    /// Recover a site at tick `ts`.
    pub fn recover(&mut self, id: SiteId, ts: Tick) {
        tracing::info!(site = id.0, tick = ts, "site recovered");
        self.site_mut(id).recover(ts);
    }

    /// Apply a committed write to each listed site. Besides storing
    /// the value this marks the item readable at those sites, which is
    /// how a replicated item regains readability after recovery.
    pub fn write(&mut self, item: ItemId, value: Value, sites: &[SiteId]) {
        for &id in sites {
            self.site_mut(id).write(item, value);
        }
        tracing::debug!(item = item.0, value, ?sites, "committed write applied");
    }

    /// Read `item` from the first Up site where it is currently
    /// readable, in ascending site order.
    pub fn snapshot_read(&self, item: ItemId) -> Option<(SiteId, Value)> {
        item.replica_sites().iter().find_map(|&id| {
            let site = self.site(id);
            if site.is_up() && site.is_readable(item) {
                site.value(item).map(|v| (id, v))
            } else {
                None
            }
        })
    }

    /// Whole-database snapshot for a read-only transaction:
    /// all-or-nothing. `None` if any item has no readable Up replica.
    pub fn snapshot(&self) -> Option<BTreeMap<ItemId, Value>> {
        let mut snapshot = BTreeMap::new();
        for item in ItemId::all() {
            let (_, value) = self.snapshot_read(item)?;
            snapshot.insert(item, value);
        }
        Some(snapshot)
    }

    /// Per-site value rows, for the `dump()` instruction.
    pub fn dump(&self) -> Vec<SiteDump> {
        self.sites
            .iter()
            .map(|site| SiteDump {
                site: site.id(),
                items: site.rows(),
            })
            .collect()
    }
}

impl Default for SiteStore {
    fn default() -> Self {
        Self::new()
    }
}
