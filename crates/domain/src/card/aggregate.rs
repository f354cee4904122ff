//! Card aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;

use crate::aggregate::{Aggregate, ChangeTracker};
use crate::student::StudentId;

use super::{
    CardAssignment, CardError, CardEvent, CardId, CardNumber, CardStatus, CardType,
    events::{CardAssignedToStudent, CardCreated, CardStatusChanged, CardUnassignedFromStudent},
};

/// Card aggregate root.
///
/// An identity card that can be bound to at most one student at a time.
#[derive(Debug, Clone, Default)]
pub struct Card {
    id: Option<CardId>,
    card_number: Option<CardNumber>,
    card_type: CardType,
    status: CardStatus,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    /// Most recent assignment; kept after unassignment with `unassigned_at` set.
    assignment: Option<CardAssignment>,
    changes: ChangeTracker<CardEvent>,
}

impl Card {
    pub const AGGREGATE_TYPE: &'static str = "Card";
}

impl Aggregate for Card {
    type Event = CardEvent;

    fn aggregate_type() -> &'static str {
        Self::AGGREGATE_TYPE
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(CardId::as_aggregate_id)
    }

    fn changes(&self) -> &ChangeTracker<CardEvent> {
        &self.changes
    }

    fn changes_mut(&mut self) -> &mut ChangeTracker<CardEvent> {
        &mut self.changes
    }

    fn apply(&mut self, event: &CardEvent) {
        match event {
            CardEvent::Created(data) => self.apply_created(data),
            CardEvent::AssignedToStudent(data) => self.apply_assigned(data),
            CardEvent::UnassignedFromStudent(data) => self.apply_unassigned(data),
            CardEvent::StatusChanged(data) => self.apply_status_changed(data),
        }
    }
}

// Query methods
impl Card {
    pub fn card_id(&self) -> Option<CardId> {
        self.id
    }

    pub fn card_number(&self) -> Option<&CardNumber> {
        self.card_number.as_ref()
    }

    pub fn card_type(&self) -> CardType {
        self.card_type
    }

    pub fn status(&self) -> CardStatus {
        self.status
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// The current assignment, if the card is bound to a student right now.
    pub fn current_assignment(&self) -> Option<&CardAssignment> {
        self.assignment.as_ref().filter(|a| a.is_current())
    }

    pub fn is_assigned(&self) -> bool {
        self.current_assignment().is_some()
    }

    pub fn assigned_student_id(&self) -> Option<StudentId> {
        self.current_assignment().map(|a| a.student_id)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

// Command methods
impl Card {
    /// Issues a new card. The caller is responsible for checking that
    /// `expires_at` lies in the future.
    pub fn create(
        card_id: CardId,
        card_number: CardNumber,
        card_type: CardType,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut card = Card::default();
        card.apply_new(CardEvent::created(
            card_id,
            card_number,
            card_type,
            expires_at,
            now,
        ));
        card
    }

    pub fn assign_to_student(
        &mut self,
        student_id: StudentId,
        now: DateTime<Utc>,
    ) -> Result<(), CardError> {
        let card_id = self.require_created()?;

        if self.is_assigned() {
            return Err(CardError::AlreadyAssigned);
        }
        if !self.status.is_active() {
            return Err(CardError::InactiveCard {
                status: self.status,
            });
        }
        if self.is_expired(now) {
            return Err(CardError::ExpiredCard {
                expires_at: self.expires_at,
            });
        }

        self.apply_new(CardEvent::assigned_to_student(card_id, student_id, now));
        Ok(())
    }

    pub fn unassign(&mut self, now: DateTime<Utc>) -> Result<(), CardError> {
        let card_id = self.require_created()?;
        let student_id = self.assigned_student_id().ok_or(CardError::NotAssigned)?;

        self.apply_new(CardEvent::unassigned_from_student(card_id, student_id, now));
        Ok(())
    }

    /// Moves the card to `new_status`, releasing any current assignment first.
    ///
    /// Changing to the status the card already has raises nothing.
    pub fn change_status(
        &mut self,
        new_status: CardStatus,
        now: DateTime<Utc>,
    ) -> Result<(), CardError> {
        let card_id = self.require_created()?;

        if new_status == self.status {
            return Ok(());
        }
        if self.is_assigned() {
            self.unassign(now)?;
        }

        self.apply_new(CardEvent::status_changed(
            card_id,
            self.status,
            new_status,
            now,
        ));
        Ok(())
    }

    pub fn report_lost(&mut self, now: DateTime<Utc>) -> Result<(), CardError> {
        self.change_status(CardStatus::Lost, now)
    }

    pub fn report_stolen(&mut self, now: DateTime<Utc>) -> Result<(), CardError> {
        self.change_status(CardStatus::Stolen, now)
    }

    pub fn report_damaged(&mut self, now: DateTime<Utc>) -> Result<(), CardError> {
        self.change_status(CardStatus::Damaged, now)
    }

    fn require_created(&self) -> Result<CardId, CardError> {
        self.id.ok_or(CardError::NotCreated)
    }
}

// Event application
impl Card {
    fn apply_created(&mut self, data: &CardCreated) {
        self.id = Some(data.card_id);
        self.card_number = Some(data.card_number.clone());
        self.card_type = data.card_type;
        self.status = CardStatus::Active;
        self.issued_at = data.occurred_on;
        self.expires_at = data.expires_at;
        self.assignment = None;
    }

    fn apply_assigned(&mut self, data: &CardAssignedToStudent) {
        self.assignment = Some(CardAssignment::new(data.student_id, data.assigned_at));
        self.updated_at = Some(data.occurred_on);
    }

    fn apply_unassigned(&mut self, data: &CardUnassignedFromStudent) {
        if let Some(assignment) = self.assignment.as_mut() {
            assignment.unassigned_at = Some(data.unassigned_at);
        }
        self.updated_at = Some(data.occurred_on);
    }

    fn apply_status_changed(&mut self, data: &CardStatusChanged) {
        self.status = data.new_status;
        self.updated_at = Some(data.occurred_on);
    }
}
