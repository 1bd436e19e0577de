//! Concurrency layer for the replicated-store simulator
//!
//! This crate implements the available-copies locking protocol:
//! - [`LockManager`]: shared/exclusive acquisition across replicas,
//!   in-place promotion, release with wake-up cascade, per-item FIFO
//!   wait records, and the site-unavailability waiting list
//! - [`WaitForGraph`]: the transaction wait-for graph derived from the
//!   wait records, with cycle detection via Tarjan's SCC algorithm

#![warn(missing_docs)]
#![warn(clippy::all)]

mod deadlock;
mod manager;

pub use deadlock::WaitForGraph;
pub use manager::{Acquire, LockManager};
