//! Metadata store (C1): durable catalog of projects, users, roles, topics,
//! subscriptions and ACLs, plus per-subscription offset / pending-ack state.
//!
//! The real persistent store is an external collaborator (spec §1 Non-goals); this
//! crate defines its contract as [`MetadataStore`] and ships an in-memory reference
//! implementation, [`InMemoryMetadataStore`], good enough to back the gateway in
//! tests and small deployments.

mod error;
mod in_memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use in_memory::InMemoryMetadataStore;
pub use store::MetadataStore;
