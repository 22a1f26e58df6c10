//! Tool adapters for the agentry engine.
//!
//! This crate provides:
//!
//! - **Task intents and results**: the request/response pair every tool speaks
//! - **Adapter trait**: common interface for all external tools
//! - **Registry**: capability-keyed lookup of adapters by tool name
//! - **Mock adapters**: simulated Gmail and Notion tools

pub mod adapter;
pub mod error;
pub mod gmail;
pub mod intent;
pub mod notion;
pub mod registry;
pub mod result;

pub use adapter::{Adapter, AdapterInfo, IntentInfo};
pub use error::AdapterError;
pub use gmail::GmailAdapter;
pub use intent::TaskIntent;
pub use notion::NotionAdapter;
pub use registry::AdapterRegistry;
pub use result::{TaskError, TaskResult};
