//! The module contains the error the engine can throw.
//!
//! Every variant maps to one class of failure the REST layer can report:
//! bad input, a forbidden actor, a missing record, an impossible state
//! transition, or a database fault.

use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Bad input: allocation sums that do not match, non-positive or
    /// over-balance amounts, empty rejection reasons, archived households.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// The acting user exists but is not allowed to perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    KeyNotFound(String),
    /// A state transition attempted from a terminal state.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
