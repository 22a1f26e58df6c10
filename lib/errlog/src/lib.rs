//! Error ledger for agent tool failures.
//!
//! Callers forward terminal failures here. The ledger keeps them queryable
//! per agent, tracks which have been resolved, and supplies the user-safe
//! fallback message shown instead of raw error text.

pub mod error;
pub mod fallback;
pub mod handler;
pub mod log;
pub mod store;

pub use error::ErrorLogError;
pub use fallback::FallbackMessages;
pub use handler::ErrorHandler;
pub use log::{ErrorLog, NewErrorLog};
pub use store::{ErrorLogStore, InMemoryErrorLogStore};
