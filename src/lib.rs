//! # repsim
//!
//! Deterministic, single-threaded simulator of distributed concurrency
//! control over a replicated data store.
//!
//! Ten sites replicate twenty data items (even-numbered items
//! everywhere, odd-numbered items at a single home site). Transactions
//! read and write under available-copies two-phase locking, a
//! wait-for-graph pass kills the youngest member of every deadlock
//! cycle, and commit validation aborts any transaction whose touched
//! sites failed after it accessed them. Everything is driven by a
//! logical clock that advances by one per instruction, so a given
//! input always produces the same output.
//!
//! ## Quick Start
//!
//! ```
//! use repsim::prelude::*;
//!
//! let mut sim = Simulator::new();
//! sim.tick_boundary();
//! sim.process_instruction("begin(T1)")?;
//! sim.tick_boundary();
//! let events = sim.process_instruction("R(T1,x3)")?;
//! assert_eq!(
//!     events,
//!     vec![Event::ReadValue {
//!         txn: TransactionId(1),
//!         item: ItemId(3),
//!         value: 30,
//!     }]
//! );
//! # Ok::<(), repsim::Error>(())
//! ```
//!
//! ## Layers
//!
//! - [`repsim_core`] - ids, instruction grammar, errors
//! - [`repsim_store`] - sites, replicas, the fail/recover state machine
//! - [`repsim_concurrency`] - lock manager, wait records, deadlock detection
//! - [`repsim_engine`] - transactions, commit validation, the scheduler

#![warn(missing_docs)]

pub mod prelude;

// Re-export the driving surface
pub use repsim_engine::{Event, Outcome, Simulator, TransactionStatus};

// Re-export identifiers and errors
pub use repsim_core::{
    Error, Instruction, ItemId, Result, SiteId, Tick, TransactionId, Value, NUM_ITEMS, NUM_SITES,
};

// Re-export the lower layers for callers that inspect internals
pub use repsim_concurrency::{Acquire, LockManager, WaitForGraph};
pub use repsim_store::{Site, SiteDump, SiteStatus, SiteStore};
