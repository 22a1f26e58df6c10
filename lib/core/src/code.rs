//! Failure-code registry.
//!
//! Error codes travel as plain strings (`auth_error`, `api_error`, ...) so that
//! adapters can introduce new ones without a coordinated release. Parsing
//! normalizes the known codes and keeps anything else in [`ErrorCode::Other`],
//! which callers treat as the "unknown" bucket for alerting.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A classified failure code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Credential or connection problem with the external tool.
    AuthError,
    /// The external tool rejected the call.
    ApiError,
    /// The intent context was malformed or incomplete.
    ValidationError,
    /// The adapter does not implement the requested intent.
    UnsupportedIntent,
    /// No adapter is registered for the requested tool.
    UnknownTool,
    /// An attempt exceeded its wall-clock budget.
    Timeout,
    /// An unexpected failure that could not be classified further.
    UnknownError,
    /// A code outside the registry, kept verbatim.
    Other(String),
}

impl ErrorCode {
    /// Every code the registry knows about, in their canonical spelling.
    pub const KNOWN: [&'static str; 7] = [
        "auth_error",
        "api_error",
        "validation_error",
        "unsupported_intent",
        "unknown_tool",
        "timeout",
        "unknown_error",
    ];

    /// Parses a free-text code.
    ///
    /// Matching ignores case, surrounding whitespace and `-`/`_` differences.
    /// Empty input maps to [`ErrorCode::UnknownError`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "auth_error" => Self::AuthError,
            "api_error" => Self::ApiError,
            "validation_error" => Self::ValidationError,
            "unsupported_intent" => Self::UnsupportedIntent,
            "unknown_tool" => Self::UnknownTool,
            "timeout" => Self::Timeout,
            "unknown_error" | "" => Self::UnknownError,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AuthError => "auth_error",
            Self::ApiError => "api_error",
            Self::ValidationError => "validation_error",
            Self::UnsupportedIntent => "unsupported_intent",
            Self::UnknownTool => "unknown_tool",
            Self::Timeout => "timeout",
            Self::UnknownError => "unknown_error",
            Self::Other(code) => code,
        }
    }

    /// Returns whether the code is part of the registry.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Returns whether a failure with this code is worth another attempt.
    ///
    /// Malformed requests and credential problems fail the same way every
    /// time; everything else may be transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::AuthError | Self::ValidationError | Self::UnsupportedIntent | Self::UnknownTool
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ErrorCode {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
