//! Convenient imports for repsim.
//!
//! Re-exports the types almost every driver touches:
//!
//! ```
//! use repsim::prelude::*;
//!
//! let mut sim = Simulator::new();
//! sim.process_instruction("begin(T1)")?;
//! # Ok::<(), repsim::Error>(())
//! ```

// Driving surface
pub use crate::{Event, Outcome, Simulator, TransactionStatus};

// Error handling
pub use crate::{Error, Result};

// Identifiers
pub use crate::{ItemId, SiteId, Tick, TransactionId, Value};

// Topology constants
pub use crate::{NUM_ITEMS, NUM_SITES};
