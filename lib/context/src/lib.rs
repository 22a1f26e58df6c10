//! Context mapping for the agentry engine.
//!
//! Agents refer to external objects (a Notion page, a Gmail thread) through
//! their own context keys. This crate stores the association between such a
//! key and the external system's identifier, scoped per user, agent and tool,
//! and resolves it in both directions.
//!
//! - **Mappings**: [`ContextMapping`] records and the fields used to create
//!   and patch them
//! - **Store**: the [`MappingStore`] seam and its in-memory implementation
//! - **Mapper**: [`ContextMapper`], the service callers use

pub mod error;
pub mod mapper;
pub mod mapping;
pub mod store;

pub use error::ContextError;
pub use mapper::ContextMapper;
pub use mapping::{ContextMapping, MappingKey, MappingPatch, NewContextMapping};
pub use store::{InMemoryMappingStore, MappingStore};
