//! End-to-end simulation tests
//!
//! Each test replays a full instruction script through the same
//! boundary-then-dispatch loop the CLI uses and checks the event
//! stream, transaction outcomes, and final site values.

#[path = "../common/mod.rs"]
mod common;

mod deadlock;
mod determinism;
mod failures;
mod locking;
mod read_only;
