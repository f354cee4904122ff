//! Explicit mapping from stored event tags to decoders.

use std::collections::HashMap;

use crate::{EventRecord, EventStoreError, Result};

/// Turns a stored payload into one typed event variant.
pub type Decoder<E> = fn(serde_json::Value) -> serde_json::Result<E>;

/// Decoders for every event variant of one aggregate type.
///
/// A registry is built once at startup. A record whose tag is not registered,
/// or which belongs to another aggregate type, is rejected rather than
/// guessed at.
pub struct EventRegistry<E> {
    aggregate_type: &'static str,
    decoders: HashMap<&'static str, Decoder<E>>,
}

impl<E> EventRegistry<E> {
    pub fn new(aggregate_type: &'static str) -> Self {
        Self {
            aggregate_type,
            decoders: HashMap::new(),
        }
    }

    /// Adds a decoder for `event_type`.
    pub fn register(mut self, event_type: &'static str, decoder: Decoder<E>) -> Self {
        let previous = self.decoders.insert(event_type, decoder);
        debug_assert!(previous.is_none(), "event type {event_type} registered twice");
        self
    }

    pub fn aggregate_type(&self) -> &'static str {
        self.aggregate_type
    }

    pub fn is_registered(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    pub fn event_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.decoders.keys().copied()
    }

    /// Decodes one record.
    pub fn decode(&self, record: &EventRecord) -> Result<E> {
        if record.aggregate_type != self.aggregate_type {
            return Err(self.unknown(record));
        }

        let decoder = self
            .decoders
            .get(record.event_type.as_str())
            .ok_or_else(|| self.unknown(record))?;

        decoder(record.payload.clone()).map_err(|source| EventStoreError::CorruptEventRecord {
            record_id: record.record_id,
            event_type: record.event_type.clone(),
            source,
        })
    }

    /// Decodes a whole stream, failing on the first unresolvable record.
    pub fn decode_all(&self, records: &[EventRecord]) -> Result<Vec<E>> {
        records.iter().map(|record| self.decode(record)).collect()
    }

    /// Decodes what it can and skips the rest with a warning.
    ///
    /// Only suitable for diagnostic listings: skipping a record while
    /// rebuilding an aggregate would desynchronize its version from its state.
    pub fn decode_lenient<'a>(&self, records: &'a [EventRecord]) -> Vec<(&'a EventRecord, E)> {
        records
            .iter()
            .filter_map(|record| match self.decode(record) {
                Ok(event) => Some((record, event)),
                Err(error) => {
                    tracing::warn!(
                        record_id = %record.record_id,
                        aggregate_id = %record.aggregate_id,
                        event_type = %record.event_type,
                        %error,
                        "skipping unresolvable event record"
                    );
                    None
                }
            })
            .collect()
    }

    fn unknown(&self, record: &EventRecord) -> EventStoreError {
        EventStoreError::UnknownEventType {
            aggregate_type: record.aggregate_type.clone(),
            event_type: record.event_type.clone(),
        }
    }
}

impl<E> std::fmt::Debug for EventRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<_> = self.decoders.keys().collect();
        tags.sort();
        f.debug_struct("EventRegistry")
            .field("aggregate_type", &self.aggregate_type)
            .field("event_types", &tags)
            .finish()
    }
}
