//! Keeps student rows, and the student side of card rows, in step with student events.

use async_trait::async_trait;
use domain::student::{StudentCreated, StudentProfileUpdated, StudentStatusChanged};
use domain::{DomainEvent, Student, StudentEvent};
use event_store::EventRecord;

use crate::Result;
use crate::projection::Projection;
use crate::views::{CardsView, StudentRow, StudentsView};

/// Projects the student stream into [`StudentsView`] and the denormalized
/// student fields of [`CardsView`].
#[derive(Clone)]
pub struct StudentProjection {
    students: StudentsView,
    cards: CardsView,
}

impl StudentProjection {
    pub fn new(students: StudentsView, cards: CardsView) -> Self {
        Self {
            students,
            cards,
        }
    }

    async fn on_created(&self, data: &StudentCreated) {
        let row = StudentRow {
            student_id: data.student_id,
            first_name: data.first_name.to_string(),
            last_name: data.last_name.to_string(),
            full_name: format!("{} {}", data.first_name, data.last_name),
            email: data.email.to_string(),
            student_number: data.student_number.to_string(),
            status: Default::default(),
            created_at: data.occurred_on,
            updated_at: None,
            assigned_card_id: None,
            assigned_card_number: None,
            assigned_at: None,
        };
        self.students.rows().write().await.insert(row.student_id, row);
    }

    async fn on_status_changed(&self, data: &StudentStatusChanged) {
        let mut students = self.students.rows().write().await;
        if let Some(student) = students.get_mut(&data.student_id) {
            student.status = data.new_status;
            student.updated_at = Some(data.occurred_on);
        }
    }

    async fn on_profile_updated(&self, data: &StudentProfileUpdated) {
        let mut cards = self.cards.rows().write().await;
        let mut students = self.students.rows().write().await;

        let Some(student) = students.get_mut(&data.student_id) else {
            return;
        };
        student.first_name = data.first_name.to_string();
        student.last_name = data.last_name.to_string();
        student.full_name = format!("{} {}", data.first_name, data.last_name);
        student.email = data.email.to_string();
        student.updated_at = Some(data.occurred_on);

        if let Some(card) = student
            .assigned_card_id
            .and_then(|card_id| cards.get_mut(&card_id))
        {
            card.assigned_student_name = Some(student.full_name.clone());
            card.assigned_student_email = Some(student.email.clone());
        }
    }
}

#[async_trait]
impl Projection for StudentProjection {
    fn name(&self) -> &'static str {
        "StudentProjection"
    }

    async fn handle(&self, record: &EventRecord) -> Result<()> {
        if record.aggregate_type == Student::AGGREGATE_TYPE {
            match StudentEvent::registry().decode(record)? {
                StudentEvent::Created(data) => self.on_created(&data).await,
                StudentEvent::StatusChanged(data) => self.on_status_changed(&data).await,
                StudentEvent::ProfileUpdated(data) => self.on_profile_updated(&data).await,
            }
        }
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.students.clear().await;
        Ok(())
    }
}
