//! Append-only, per-stream versioned event log.
//!
//! The store is the system of record. It knows nothing about concrete event
//! variants: callers hand it already-serialized [`PendingEvent`]s and get back
//! [`EventRecord`]s. Turning records back into typed events goes through an
//! [`EventRegistry`].

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod registry;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventId, EventMetadata, EventRecord, PendingEvent, SCHEMA_VERSION, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::EventQuery;
pub use registry::EventRegistry;
pub use store::{EventStore, EventStoreExt, EventStream};
