//! Core projection trait and position tracking.

use std::collections::HashSet;

use async_trait::async_trait;
use event_store::EventRecord;
use uuid::Uuid;

use crate::Result;

/// Tracks which stored records a projection has applied.
///
/// Progress is keyed by record identity, not by offset into the log, so a
/// record that was appended but never published is still picked up by the
/// next catch-up, and one that was published is never applied twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    applied: HashSet<Uuid>,
}

impl ProjectionPosition {
    /// Creates a new position with nothing applied.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Number of distinct records applied so far.
    pub fn events_processed(&self) -> u64 {
        self.applied.len() as u64
    }

    /// Whether the record has already been applied.
    pub fn contains(&self, record_id: Uuid) -> bool {
        self.applied.contains(&record_id)
    }

    /// Marks the record as applied. Returns false if it already was.
    pub fn advance(&mut self, record_id: Uuid) -> bool {
        self.applied.insert(record_id)
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.events_processed())
    }
}

/// A projection that processes stored events and updates one or more read models.
///
/// Handlers receive every record in the log, including ones for aggregate
/// types they do not care about. Updates are not guarded by a per-row
/// version, so the processor delivers each record to a projection once.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Returns the name of this projection.
    fn name(&self) -> &'static str;

    /// Handles a single event, updating the projection's read model.
    async fn handle(&self, record: &EventRecord) -> Result<()>;

    /// Clears the read models.
    async fn reset(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_starts_at_zero() {
        let pos = ProjectionPosition::zero();
        assert_eq!(pos.events_processed(), 0);
    }

    #[test]
    fn position_advances_once_per_record() {
        let mut pos = ProjectionPosition::zero();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert!(pos.advance(first));
        assert!(pos.advance(second));
        assert!(!pos.advance(first));

        assert_eq!(pos.events_processed(), 2);
        assert!(pos.contains(first));
        assert!(!pos.contains(Uuid::new_v4()));
    }

    #[test]
    fn position_display() {
        let mut pos = ProjectionPosition::zero();
        for _ in 0..42 {
            pos.advance(Uuid::new_v4());
        }
        assert_eq!(pos.to_string(), "position(42)");
    }
}
