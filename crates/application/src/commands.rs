//! Command inputs and their success payloads.

use chrono::{DateTime, Utc};
use domain::{CardId, CardType, StudentId, StudentStatus};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CreateCard {
    pub card_type: CardType,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct AssignCard {
    pub card_id: CardId,
    pub student_id: StudentId,
}

/// Raw student fields; validated by the value objects before anything is raised.
#[derive(Debug, Clone)]
pub struct CreateStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub student_number: String,
}

#[derive(Debug, Clone)]
pub struct UpdateStudentProfile {
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Returned once at issue time; the only payload carrying the full card number.
#[derive(Debug, Clone, Serialize)]
pub struct CardIssued {
    pub card_id: CardId,
    pub card_number: String,
    pub card_type: CardType,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardAssigned {
    pub card_id: CardId,
    pub student_id: StudentId,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardUnassigned {
    pub card_id: CardId,
    pub masked_card_number: String,
    pub student_id: StudentId,
    pub unassigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentEnrolled {
    pub student_id: StudentId,
    pub full_name: String,
    pub email: String,
    pub student_number: String,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
}
