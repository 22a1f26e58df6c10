//! Error types for the adapter crate.
//!
//! An [`AdapterError`] is what an adapter raises when the call itself blew up
//! (the connection dropped, credentials were refused). Expected, reportable
//! failures travel inside a [`TaskResult`](crate::TaskResult) instead.

use agentry_core::ErrorCode;
use std::fmt;

/// Errors raised by adapter calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Connection to the external service failed.
    ConnectionFailed { reason: String },
    /// The external service refused the credentials.
    AuthenticationFailed { reason: String },
    /// The external service is throttling requests.
    RateLimited { retry_after_secs: Option<u64> },
    /// The external service answered with something unexpected.
    ProtocolError { reason: String },
    /// The call was abandoned because its cancellation token fired.
    Cancelled,
}

impl AdapterError {
    /// Returns the failure code this error is classified under.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AuthenticationFailed { .. } => ErrorCode::AuthError,
            Self::ConnectionFailed { .. }
            | Self::RateLimited { .. }
            | Self::ProtocolError { .. } => {
                ErrorCode::ApiError
            }
            Self::Cancelled => ErrorCode::UnknownError,
        }
    }

    /// Returns whether retrying the call could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed { reason } => {
                write!(f, "connection failed: {reason}")
            }
            Self::AuthenticationFailed { reason } => {
                write!(f, "authentication failed: {reason}")
            }
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::ProtocolError { reason } => {
                write!(f, "protocol error: {reason}")
            }
            Self::Cancelled => write!(f, "call cancelled"),
        }
    }
}

impl std::error::Error for AdapterError {}
