//! Transaction lifecycle and instruction scheduling
//!
//! The [`Simulator`] is the logical-clock-driven interpreter tying the
//! store and the concurrency layer together: it parses one instruction
//! per tick, dispatches it to the transaction registry and lock
//! manager, re-drives blocked transactions once they become
//! unblockable, and runs deadlock detection at every tick boundary.
//!
//! Nothing here performs I/O: each dispatch returns the [`Event`]s it
//! produced, and a driver (the CLI crate, or a test) decides what to
//! do with them.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod event;
mod simulator;
mod transaction;

pub use event::{Event, Outcome};
pub use simulator::Simulator;
pub use transaction::{Action, Transaction, TransactionBody, TransactionStatus};
