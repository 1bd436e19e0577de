//! Transaction objects owned by the simulator's registry.

use repsim_core::types::{ItemId, SiteList, Tick, TransactionId, Value};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionStatus {
    /// Making progress; eligible to receive instructions.
    Running,
    /// Parked on a wait record or the site-unavailability list,
    /// waiting to re-run its stored instruction.
    Blocked,
    /// Ended successfully.
    Committed,
    /// Ended by abort (commit validation) or deadlock kill.
    Aborted,
}

/// One logged operation of a read-write transaction, keyed in the
/// operation log by the tick at which its lock was granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A granted read: the value observed and the site it came from.
    Read {
        /// Item read.
        item: ItemId,
        /// Value observed (possibly the transaction's own pending write).
        value: Value,
        /// The single site whose lock served the read.
        sites: SiteList,
    },
    /// A granted write: deferred until commit.
    Write {
        /// Item written.
        item: ItemId,
        /// Value to apply at commit.
        value: Value,
        /// Every site locked for the write.
        sites: SiteList,
    },
}

impl Action {
    /// Sites this action touched.
    pub fn sites(&self) -> &SiteList {
        match self {
            Action::Read { sites, .. } | Action::Write { sites, .. } => sites,
        }
    }
}

/// Variant-specific payload: the read-write/read-only split as a
/// tagged union.
#[derive(Debug)]
pub enum TransactionBody {
    /// Locking transaction with a deferred-write buffer.
    ReadWrite {
        /// Tick-ordered log of granted operations, consulted by
        /// commit validation and replayed (writes only) at commit.
        log: BTreeMap<Tick, Action>,
        /// Uncommitted writes, item to newest value (read-your-writes).
        pending_writes: FxHashMap<ItemId, Value>,
    },
    /// Lock-free transaction reading from a start-time snapshot.
    ReadOnly {
        /// Full-database snapshot; `None` while the transaction is
        /// still waiting for every item to have a readable replica.
        snapshot: Option<BTreeMap<ItemId, Value>>,
    },
}

/// A transaction: shared header plus variant payload.
#[derive(Debug)]
pub struct Transaction {
    /// Identity.
    pub id: TransactionId,
    /// Logical start time.
    pub started_at: Tick,
    /// Lifecycle state.
    pub status: TransactionStatus,
    /// The literal instruction text currently being (re)executed;
    /// re-dispatched verbatim when the transaction unblocks.
    pub current_instruction: String,
    /// Variant payload.
    pub body: TransactionBody,
}

impl Transaction {
    /// New read-write transaction, Running, empty log.
    pub fn read_write(id: TransactionId, started_at: Tick, instruction: &str) -> Self {
        Transaction {
            id,
            started_at,
            status: TransactionStatus::Running,
            current_instruction: instruction.to_string(),
            body: TransactionBody::ReadWrite {
                log: BTreeMap::new(),
                pending_writes: FxHashMap::default(),
            },
        }
    }

    /// New read-only transaction with no snapshot yet.
    pub fn read_only(id: TransactionId, started_at: Tick, instruction: &str) -> Self {
        Transaction {
            id,
            started_at,
            status: TransactionStatus::Running,
            current_instruction: instruction.to_string(),
            body: TransactionBody::ReadOnly { snapshot: None },
        }
    }

    /// Whether this transaction has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            TransactionStatus::Committed | TransactionStatus::Aborted
        )
    }

    /// Whether this is the read-only variant.
    pub fn is_read_only(&self) -> bool {
        matches!(self.body, TransactionBody::ReadOnly { .. })
    }
}
