//! Core types for the replicated-store simulator
//!
//! This crate defines the fundamental vocabulary shared by every other
//! crate in the workspace:
//! - [`types`]: identifier newtypes, the logical clock, and the static
//!   replication layout
//! - [`instruction`]: the textual instruction grammar and its parser
//! - [`error`]: the canonical error type

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod instruction;
pub mod types;

pub use error::{Error, Result};
pub use instruction::Instruction;
pub use types::{ItemId, SiteId, SiteList, Tick, TransactionId, Value, NUM_ITEMS, NUM_SITES};
