//! Site and data-item storage for the simulator
//!
//! A fixed fleet of ten sites, each holding the subset of the twenty
//! data items that replicate to it. Each site carries its own value
//! table, lock table, readable-item set, and failure/recovery
//! timestamps. [`SiteStore`] is the aggregate the lock manager and the
//! scheduler operate on; there is no ambient or static state.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod site;
mod store;

pub use site::{Lock, LockKind, Site, SiteStatus};
pub use store::{SiteDump, SiteStore};
