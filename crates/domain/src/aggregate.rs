//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::{EventId, EventRegistry, PendingEvent, Version};

/// Trait for domain events.
///
/// Domain events are immutable facts named in past tense. Each aggregate has
/// one closed enum of them; every variant has a stable tag and a body that
/// serializes on its own.
pub trait DomainEvent: Clone + std::fmt::Debug + Send + Sync + Sized + 'static {
    /// Stable tag stored next to the payload.
    fn event_type(&self) -> &'static str;

    fn event_id(&self) -> EventId;

    fn occurred_on(&self) -> DateTime<Utc>;

    /// Serializes the variant body (without the enum wrapper).
    fn payload(&self) -> serde_json::Result<serde_json::Value>;

    /// Decoders for every variant of this enum.
    fn registry() -> &'static EventRegistry<Self>;

    /// Prepares the event for appending to the store.
    fn to_pending(&self) -> serde_json::Result<PendingEvent> {
        Ok(PendingEvent::new(
            self.event_id(),
            self.event_type(),
            self.occurred_on(),
            self.payload()?,
        ))
    }
}

/// Version counter plus the buffer of events raised since the last save.
///
/// Owned by each aggregate value; the provided methods on [`Aggregate`] are
/// the only code that moves it forward.
#[derive(Debug, Clone)]
pub struct ChangeTracker<E> {
    version: Version,
    uncommitted: Vec<E>,
}

impl<E> Default for ChangeTracker<E> {
    fn default() -> Self {
        Self {
            version: Version::initial(),
            uncommitted: Vec::new(),
        }
    }
}

impl<E> ChangeTracker<E> {
    /// Version of the last event folded into state, committed or not.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Version the stream had when the aggregate was loaded.
    pub fn committed_version(&self) -> Version {
        self.version.rewind(self.uncommitted.len())
    }

    pub fn uncommitted(&self) -> &[E] {
        &self.uncommitted
    }

    pub fn has_uncommitted(&self) -> bool {
        !self.uncommitted.is_empty()
    }

    fn record(&mut self, event: E) {
        self.version = self.version.next();
        self.uncommitted.push(event);
    }

    fn advance(&mut self) {
        self.version = self.version.next();
    }

    fn take(&mut self) -> Vec<E> {
        std::mem::take(&mut self.uncommitted)
    }
}

/// Trait for event-sourced aggregates.
///
/// State is only ever changed by [`Aggregate::apply`], the fold. Business
/// operations validate and then call [`Aggregate::apply_new`]; loading from
/// the store calls [`Aggregate::apply_historical`].
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;

    /// Aggregate type name stored with every record of the stream.
    fn aggregate_type() -> &'static str;

    /// Returns None for a blank aggregate that has not folded its creation event.
    fn id(&self) -> Option<AggregateId>;

    fn changes(&self) -> &ChangeTracker<Self::Event>;

    fn changes_mut(&mut self) -> &mut ChangeTracker<Self::Event>;

    /// Folds one event into state.
    ///
    /// Must be deterministic and must not fail: the event is already a fact.
    /// The event type is a closed enum, so an unrecognised event cannot reach
    /// this point; unknown tags are rejected when records are decoded.
    fn apply(&mut self, event: &Self::Event);

    fn version(&self) -> Version {
        self.changes().version()
    }

    /// Folds a freshly raised event and queues it for saving.
    fn apply_new(&mut self, event: Self::Event) {
        self.apply(&event);
        self.changes_mut().record(event);
    }

    /// Folds already-stored events without queueing them.
    fn apply_historical(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(&event);
            self.changes_mut().advance();
        }
    }

    /// Removes and returns the events raised since the last save.
    fn take_uncommitted(&mut self) -> Vec<Self::Event> {
        self.changes_mut().take()
    }

    /// Rebuilds an aggregate from its history. Returns None for an empty history.
    fn from_history(events: impl IntoIterator<Item = Self::Event>) -> Option<Self> {
        let mut events = events.into_iter().peekable();
        events.peek()?;

        let mut aggregate = Self::default();
        aggregate.apply_historical(events);
        Some(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Opened {
        event_id: EventId,
        occurred_on: DateTime<Utc>,
        locker_id: AggregateId,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Filled {
        event_id: EventId,
        occurred_on: DateTime<Utc>,
        items: u32,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum LockerEvent {
        Opened(Opened),
        Filled(Filled),
    }

    static LOCKER_EVENTS: LazyLock<EventRegistry<LockerEvent>> = LazyLock::new(|| {
        EventRegistry::new("Locker")
            .register("LockerOpened", |p| {
                serde_json::from_value(p).map(LockerEvent::Opened)
            })
            .register("LockerFilled", |p| {
                serde_json::from_value(p).map(LockerEvent::Filled)
            })
    });

    impl DomainEvent for LockerEvent {
        fn event_type(&self) -> &'static str {
            match self {
                LockerEvent::Opened(_) => "LockerOpened",
                LockerEvent::Filled(_) => "LockerFilled",
            }
        }

        fn event_id(&self) -> EventId {
            match self {
                LockerEvent::Opened(e) => e.event_id,
                LockerEvent::Filled(e) => e.event_id,
            }
        }

        fn occurred_on(&self) -> DateTime<Utc> {
            match self {
                LockerEvent::Opened(e) => e.occurred_on,
                LockerEvent::Filled(e) => e.occurred_on,
            }
        }

        fn payload(&self) -> serde_json::Result<serde_json::Value> {
            match self {
                LockerEvent::Opened(e) => serde_json::to_value(e),
                LockerEvent::Filled(e) => serde_json::to_value(e),
            }
        }

        fn registry() -> &'static EventRegistry<Self> {
            &LOCKER_EVENTS
        }
    }

    #[derive(Debug, Default)]
    struct Locker {
        id: Option<AggregateId>,
        items: u32,
        changes: ChangeTracker<LockerEvent>,
    }

    impl Aggregate for Locker {
        type Event = LockerEvent;

        fn aggregate_type() -> &'static str {
            "Locker"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn changes(&self) -> &ChangeTracker<LockerEvent> {
            &self.changes
        }

        fn changes_mut(&mut self) -> &mut ChangeTracker<LockerEvent> {
            &mut self.changes
        }

        fn apply(&mut self, event: &LockerEvent) {
            match event {
                LockerEvent::Opened(e) => self.id = Some(e.locker_id),
                LockerEvent::Filled(e) => self.items += e.items,
            }
        }
    }

    fn opened(id: AggregateId) -> LockerEvent {
        LockerEvent::Opened(Opened {
            event_id: EventId::new(),
            occurred_on: Utc::now(),
            locker_id: id,
        })
    }

    fn filled(items: u32) -> LockerEvent {
        LockerEvent::Filled(Filled {
            event_id: EventId::new(),
            occurred_on: Utc::now(),
            items,
        })
    }

    #[test]
    fn apply_new_bumps_version_and_queues() {
        let mut locker = Locker::default();
        locker.apply_new(opened(AggregateId::new()));
        locker.apply_new(filled(3));

        assert_eq!(locker.version(), Version::new(2));
        assert_eq!(locker.changes().uncommitted().len(), 2);
        assert_eq!(locker.changes().committed_version(), Version::initial());
        assert_eq!(locker.items, 3);
    }

    #[test]
    fn apply_historical_does_not_queue() {
        let mut locker = Locker::default();
        locker.apply_historical(vec![opened(AggregateId::new()), filled(2), filled(5)]);

        assert_eq!(locker.version(), Version::new(3));
        assert!(!locker.changes().has_uncommitted());
        assert_eq!(locker.items, 7);
    }

    #[test]
    fn take_uncommitted_drains_buffer_but_keeps_version() {
        let mut locker = Locker::from_history(vec![opened(AggregateId::new())]).unwrap();
        locker.apply_new(filled(1));

        let taken = locker.take_uncommitted();
        assert_eq!(taken.len(), 1);
        assert!(locker.take_uncommitted().is_empty());
        assert_eq!(locker.version(), Version::new(2));
        assert_eq!(locker.changes().committed_version(), Version::new(2));
    }

    #[test]
    fn from_empty_history_is_none() {
        assert!(Locker::from_history(Vec::new()).is_none());
    }

    #[test]
    fn replay_is_deterministic() {
        let id = AggregateId::new();
        let history = vec![opened(id), filled(4), filled(6)];

        let first = Locker::from_history(history.clone()).unwrap();
        let second = Locker::from_history(history).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.items, second.items);
        assert_eq!(first.version(), second.version());
    }

    #[test]
    fn pending_event_round_trips_through_registry() {
        let event = filled(9);
        let pending = event.to_pending().unwrap();
        assert_eq!(pending.event_type, "LockerFilled");
        assert_eq!(pending.event_id, event.event_id());

        let record = event_store::EventRecord {
            record_id: uuid::Uuid::new_v4(),
            aggregate_id: AggregateId::new(),
            aggregate_type: "Locker".to_string(),
            event_type: pending.event_type.clone(),
            payload: pending.payload.clone(),
            metadata: event_store::EventMetadata::new(pending.event_id, pending.occurred_on),
            occurred_on: pending.occurred_on,
            version: Version::first(),
            created_at: Utc::now(),
        };
        let decoded = LockerEvent::registry().decode(&record).unwrap();
        assert_eq!(decoded, event);
    }
}
