//! Structured events emitted by the simulator.
//!
//! Every dispatch returns the events it produced instead of printing;
//! the CLI renders them for humans or as JSON.

use repsim_core::types::{ItemId, SiteId, TransactionId, Value};
use repsim_store::SiteDump;
use serde::Serialize;
use std::fmt;

/// How an ended transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Committed at `end`.
    Committed,
    /// Forced to abort by commit validation.
    Aborted,
    /// Chosen as a deadlock victim.
    Killed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Committed => write!(f, "committed"),
            Outcome::Aborted => write!(f, "aborted"),
            Outcome::Killed => write!(f, "killed"),
        }
    }
}

/// One observable state transition or result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A granted read produced a value.
    ReadValue {
        /// Reading transaction.
        txn: TransactionId,
        /// Item read.
        item: ItemId,
        /// Observed value.
        value: Value,
    },
    /// A read-only transaction captured its full-database snapshot.
    SnapshotTaken {
        /// Snapshotting transaction.
        txn: TransactionId,
    },
    /// A read-only transaction could not snapshot some item anywhere
    /// and is parked until a site event.
    SnapshotUnavailable {
        /// Blocked transaction.
        txn: TransactionId,
    },
    /// A lock request conflicted and the transaction is now queued.
    Blocked {
        /// Waiting transaction.
        txn: TransactionId,
        /// Contested item.
        item: ItemId,
        /// Transactions it must wait for, ascending.
        waiting_for: Vec<TransactionId>,
    },
    /// No Up replica could serve the request; parked on the
    /// site-unavailability list.
    NoAvailableSite {
        /// Waiting transaction.
        txn: TransactionId,
        /// Item with no usable replica.
        item: ItemId,
    },
    /// A site went down.
    SiteFailed {
        /// Failed site.
        site: SiteId,
    },
    /// A site came back up.
    SiteRecovered {
        /// Recovered site.
        site: SiteId,
    },
    /// A transaction committed.
    Committed {
        /// Committed transaction.
        txn: TransactionId,
    },
    /// Commit validation failed; the transaction aborted.
    Aborted {
        /// Aborted transaction.
        txn: TransactionId,
        /// Site whose failure invalidated the commit.
        stale_site: SiteId,
    },
    /// A deadlock cycle was found.
    CycleDetected {
        /// Members of the cycle, ascending.
        cycle: Vec<TransactionId>,
    },
    /// The youngest member of a cycle was killed.
    Killed {
        /// Victim.
        txn: TransactionId,
    },
    /// A previously blocked transaction is re-running its stored
    /// instruction.
    Resumed {
        /// Resuming transaction.
        txn: TransactionId,
    },
    /// `end` on a transaction that already ended.
    AlreadyEnded {
        /// Target transaction.
        txn: TransactionId,
        /// How it had ended.
        outcome: Outcome,
    },
    /// `end` on a transaction that is still blocked; nothing changes.
    EndWhileBlocked {
        /// Target transaction.
        txn: TransactionId,
    },
    /// Result of `dump()`: every site's current values.
    Dump {
        /// Per-site rows in site order.
        sites: Vec<SiteDump>,
    },
}
