//! Keeps card rows, and the card side of student rows, in step with card events.

use async_trait::async_trait;
use domain::card::{CardAssignedToStudent, CardCreated, CardStatusChanged, CardUnassignedFromStudent};
use domain::{Card, CardEvent, DomainEvent};
use event_store::EventRecord;

use crate::Result;
use crate::projection::Projection;
use crate::views::{CardRow, CardsView, StudentsView};

/// Projects the card stream into [`CardsView`] and the assignment fields of
/// [`StudentsView`].
///
/// When both views are written, the card lock is always taken first.
#[derive(Clone)]
pub struct CardProjection {
    cards: CardsView,
    students: StudentsView,
}

impl CardProjection {
    pub fn new(cards: CardsView, students: StudentsView) -> Self {
        Self {
            cards,
            students,
        }
    }

    async fn on_created(&self, data: &CardCreated) {
        self.cards
            .insert(CardRow {
                card_id: data.card_id,
                card_number: data.card_number.as_str().to_string(),
                masked_card_number: data.card_number.masked(),
                card_type: data.card_type,
                status: Default::default(),
                issued_at: data.occurred_on,
                expires_at: data.expires_at,
                updated_at: None,
                assigned_student_id: None,
                assigned_student_name: None,
                assigned_student_email: None,
                assigned_at: None,
            })
            .await;
    }

    async fn on_assigned(&self, data: &CardAssignedToStudent) {
        let mut cards = self.cards.rows().write().await;
        let mut students = self.students.rows().write().await;

        let (Some(card), Some(student)) = (
            cards.get_mut(&data.card_id),
            students.get_mut(&data.student_id),
        ) else {
            tracing::debug!(
                card_id = %data.card_id,
                student_id = %data.student_id,
                "assignment skipped, counterpart row missing"
            );
            return;
        };

        card.assigned_student_id = Some(data.student_id);
        card.assigned_student_name = Some(student.full_name.clone());
        card.assigned_student_email = Some(student.email.clone());
        card.assigned_at = Some(data.assigned_at);
        card.updated_at = Some(data.occurred_on);

        student.assigned_card_id = Some(data.card_id);
        student.assigned_card_number = Some(card.masked_card_number.clone());
        student.assigned_at = Some(data.assigned_at);
    }

    async fn on_unassigned(&self, data: &CardUnassignedFromStudent) {
        let mut cards = self.cards.rows().write().await;
        let mut students = self.students.rows().write().await;

        if let Some(card) = cards.get_mut(&data.card_id) {
            card.clear_assignment();
            card.updated_at = Some(data.occurred_on);
        }
        if let Some(student) = students.get_mut(&data.student_id) {
            if student.assigned_card_id == Some(data.card_id) {
                student.clear_assignment();
            }
        }
    }

    async fn on_status_changed(&self, data: &CardStatusChanged) {
        let mut cards = self.cards.rows().write().await;
        if let Some(card) = cards.get_mut(&data.card_id) {
            card.status = data.new_status;
            card.updated_at = Some(data.occurred_on);
        }
    }
}

#[async_trait]
impl Projection for CardProjection {
    fn name(&self) -> &'static str {
        "CardProjection"
    }

    async fn handle(&self, record: &EventRecord) -> Result<()> {
        if record.aggregate_type == Card::AGGREGATE_TYPE {
            match CardEvent::registry().decode(record)? {
                CardEvent::Created(data) => self.on_created(&data).await,
                CardEvent::AssignedToStudent(data) => self.on_assigned(&data).await,
                CardEvent::UnassignedFromStudent(data) => self.on_unassigned(&data).await,
                CardEvent::StatusChanged(data) => self.on_status_changed(&data).await,
            }
        }
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.cards.clear().await;
        Ok(())
    }
}
