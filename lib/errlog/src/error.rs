//! Error types for the error ledger.

use agentry_core::ErrorLogId;
use std::fmt;

/// Errors from error-ledger operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLogError {
    /// No error log with this ID exists.
    NotFound { id: ErrorLogId },
    /// The underlying store failed.
    Storage { reason: String },
}

impl fmt::Display for ErrorLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "error log not found: {id}"),
            Self::Storage { reason } => write!(f, "error log storage failed: {reason}"),
        }
    }
}

impl std::error::Error for ErrorLogError {}
