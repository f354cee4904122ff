//! Repositories that rebuild aggregates from the event log and save their new events.

use std::marker::PhantomData;

use common::AggregateId;
use domain::{Aggregate, Card, CardId, DomainEvent, Student, StudentId};
use event_store::{EventRecord, EventStore};
use projections::{CardsView, StudentsView};

use crate::error::ApplicationError;
use crate::unit_of_work::UnitOfWork;
use crate::Result;

/// Loads and saves one aggregate type through the event store.
///
/// Loading folds the full stream; saving appends whatever the aggregate raised
/// since it was loaded, using the version it was loaded at as the expected
/// version.
pub struct EventSourcedRepository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    unit_of_work: UnitOfWork<S>,
    _phantom: PhantomData<fn() -> A>,
}

impl<S, A> Clone for EventSourcedRepository<S, A>
where
    S: EventStore + Clone,
    A: Aggregate,
{
    fn clone(&self) -> Self {
        Self {
            unit_of_work: self.unit_of_work.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<S, A> EventSourcedRepository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    pub fn new(unit_of_work: UnitOfWork<S>) -> Self {
        Self {
            unit_of_work,
            _phantom: PhantomData,
        }
    }

    /// Rebuilds the aggregate from its history.
    ///
    /// Returns None when the id has no events, or when its stream belongs to a
    /// different aggregate type. Any record the event registry cannot resolve
    /// fails the whole load.
    #[tracing::instrument(skip(self), fields(aggregate_type = A::aggregate_type()))]
    pub async fn get_by_id(&self, aggregate_id: AggregateId) -> Result<Option<A>> {
        let records = self.unit_of_work.store().load(aggregate_id).await?;

        match records.first() {
            None => return Ok(None),
            Some(first) if first.aggregate_type != A::aggregate_type() => {
                tracing::debug!(
                    %aggregate_id,
                    found = %first.aggregate_type,
                    "stream belongs to another aggregate type"
                );
                return Ok(None);
            }
            Some(_) => {}
        }

        let events = A::Event::registry().decode_all(&records)?;
        Ok(A::from_history(events))
    }

    /// Persists the aggregate's uncommitted events and publishes them.
    ///
    /// Does nothing, and touches neither the store nor the projections, when
    /// the aggregate has no uncommitted events.
    #[tracing::instrument(skip(self, aggregate), fields(aggregate_type = A::aggregate_type()))]
    pub async fn save(&self, aggregate: &mut A) -> Result<Vec<EventRecord>> {
        if !aggregate.changes().has_uncommitted() {
            return Ok(Vec::new());
        }

        let aggregate_id = aggregate.id().ok_or(ApplicationError::MissingIdentity {
            aggregate_type: A::aggregate_type(),
        })?;
        let expected_version = aggregate.changes().committed_version();
        let pending = aggregate
            .changes()
            .uncommitted()
            .iter()
            .map(DomainEvent::to_pending)
            .collect::<serde_json::Result<Vec<_>>>()?;

        let records = self
            .unit_of_work
            .commit(aggregate_id, A::aggregate_type(), pending, expected_version)
            .await?;

        aggregate.take_uncommitted();
        Ok(records)
    }
}

/// Card repository with lookups resolved through the card read model.
///
/// The read model is a secondary index: a card created by a save that has not
/// been published yet is not found by number or by student.
pub struct CardRepository<S: EventStore> {
    inner: EventSourcedRepository<S, Card>,
    cards: CardsView,
}

impl<S: EventStore + Clone> Clone for CardRepository<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            cards: self.cards.clone(),
        }
    }
}

impl<S: EventStore> CardRepository<S> {
    pub fn new(unit_of_work: UnitOfWork<S>, cards: CardsView) -> Self {
        Self {
            inner: EventSourcedRepository::new(unit_of_work),
            cards,
        }
    }

    pub fn view(&self) -> &CardsView {
        &self.cards
    }

    pub async fn get_by_id(&self, card_id: CardId) -> Result<Option<Card>> {
        self.inner.get_by_id(card_id.as_aggregate_id()).await
    }

    pub async fn find_by_card_number(&self, card_number: &str) -> Result<Option<Card>> {
        match self.cards.find_by_card_number(card_number).await {
            Some(row) => self.get_by_id(row.card_id).await,
            None => Ok(None),
        }
    }

    /// The card currently assigned to `student_id`, per the read model.
    pub async fn find_by_assigned_student(&self, student_id: StudentId) -> Result<Option<Card>> {
        match self.cards.find_by_assigned_student(student_id).await {
            Some(row) => self.get_by_id(row.card_id).await,
            None => Ok(None),
        }
    }

    pub async fn save(&self, card: &mut Card) -> Result<Vec<EventRecord>> {
        self.inner.save(card).await
    }
}

/// Student repository with natural-key lookups resolved through the student
/// read model.
pub struct StudentRepository<S: EventStore> {
    inner: EventSourcedRepository<S, Student>,
    students: StudentsView,
}

impl<S: EventStore + Clone> Clone for StudentRepository<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            students: self.students.clone(),
        }
    }
}

impl<S: EventStore> StudentRepository<S> {
    pub fn new(unit_of_work: UnitOfWork<S>, students: StudentsView) -> Self {
        Self {
            inner: EventSourcedRepository::new(unit_of_work),
            students,
        }
    }

    pub fn view(&self) -> &StudentsView {
        &self.students
    }

    pub async fn get_by_id(&self, student_id: StudentId) -> Result<Option<Student>> {
        self.inner.get_by_id(student_id.as_aggregate_id()).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Student>> {
        match self.students.find_by_email(email).await {
            Some(row) => self.get_by_id(row.student_id).await,
            None => Ok(None),
        }
    }

    pub async fn find_by_student_number(&self, student_number: &str) -> Result<Option<Student>> {
        match self.students.find_by_student_number(student_number).await {
            Some(row) => self.get_by_id(row.student_id).await,
            None => Ok(None),
        }
    }

    pub async fn save(&self, student: &mut Student) -> Result<Vec<EventRecord>> {
        self.inner.save(student).await
    }
}
