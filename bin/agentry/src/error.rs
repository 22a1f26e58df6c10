//! Dispatcher error types.

use std::fmt;

/// Errors that stop the dispatcher before it can report an outcome.
#[derive(Debug)]
pub enum DispatchError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// The intent could not be read.
    ReadInput { source: String, details: String },
    /// The intent was not valid JSON.
    ParseIntent { details: String },
    /// A failure could not be written to the error ledger.
    ErrorLog { details: String },
    /// The outcome could not be written to stdout.
    Output { details: String },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "configuration error: {details}"),
            Self::ReadInput { source, details } => {
                write!(f, "failed to read intent from {source}: {details}")
            }
            Self::ParseIntent { details } => write!(f, "invalid task intent: {details}"),
            Self::ErrorLog { details } => write!(f, "failed to log tool failure: {details}"),
            Self::Output { details } => write!(f, "failed to write outcome: {details}"),
        }
    }
}

impl std::error::Error for DispatchError {}
