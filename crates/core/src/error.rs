//! Canonical error type for the simulator.
//!
//! Almost all failure in the protocol is a domain state (a blocked
//! transaction, a killed deadlock victim, a forced abort), not an
//! error. The `Err` paths are limited to malformed instruction text
//! and references to ids the simulator has never seen.

use thiserror::Error;

/// All simulator errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The instruction text did not parse. The logical clock still
    /// advances; no transaction or site state changes.
    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),

    /// An instruction referenced a transaction id with no `begin`.
    #[error("unknown transaction T{0}")]
    UnknownTransaction(u32),
}

/// Result type for simulator operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error came from instruction parsing.
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::InvalidInstruction(_))
    }
}
