//! Student read model: one row per student, with the held card denormalized in.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::{CardId, StudentId, StudentStatus};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::read_model::ReadModel;

/// Query-side view of one student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRow {
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub student_number: String,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub assigned_card_id: Option<CardId>,
    pub assigned_card_number: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
}

impl StudentRow {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn has_assigned_card(&self) -> bool {
        self.assigned_card_id.is_some()
    }

    /// "Full Name (NUMBER)".
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.full_name, self.student_number)
    }

    pub(crate) fn clear_assignment(&mut self) {
        self.assigned_card_id = None;
        self.assigned_card_number = None;
        self.assigned_at = None;
    }

    fn matches(&self, needle: &str) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.full_name,
            &self.email,
            &self.student_number,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// In-memory student read model. Clones share the same rows.
#[derive(Clone, Default)]
pub struct StudentsView {
    rows: Arc<RwLock<HashMap<StudentId, StudentRow>>>,
}

impl StudentsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, student_id: StudentId) -> Option<StudentRow> {
        self.rows.read().await.get(&student_id).cloned()
    }

    /// Case-insensitive match on the stored (lower-cased) address.
    pub async fn find_by_email(&self, email: &str) -> Option<StudentRow> {
        let email = email.trim().to_lowercase();
        self.rows
            .read()
            .await
            .values()
            .find(|row| row.email == email)
            .cloned()
    }

    pub async fn find_by_student_number(&self, student_number: &str) -> Option<StudentRow> {
        let student_number = student_number.trim().to_ascii_uppercase();
        self.rows
            .read()
            .await
            .values()
            .find(|row| row.student_number == student_number)
            .cloned()
    }

    /// Every student ordered by last name, then first name.
    pub async fn all(&self) -> Vec<StudentRow> {
        let mut rows: Vec<_> = self.rows.read().await.values().cloned().collect();
        sort_by_name(&mut rows);
        rows
    }

    pub async fn active(&self) -> Vec<StudentRow> {
        let mut rows = self.all().await;
        rows.retain(StudentRow::is_active);
        rows
    }

    /// Substring search over names, email and student number.
    pub async fn search(&self, term: &str) -> Vec<StudentRow> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut rows: Vec<_> = self
            .rows
            .read()
            .await
            .values()
            .filter(|row| row.matches(&needle))
            .cloned()
            .collect();
        sort_by_name(&mut rows);
        rows
    }

    pub(crate) fn rows(&self) -> &Arc<RwLock<HashMap<StudentId, StudentRow>>> {
        &self.rows
    }

    pub(crate) async fn clear(&self) {
        self.rows.write().await.clear();
    }
}

fn sort_by_name(rows: &mut [StudentRow]) {
    rows.sort_by(|a, b| {
        a.last_name
            .cmp(&b.last_name)
            .then_with(|| a.first_name.cmp(&b.first_name))
    });
}

impl ReadModel for StudentsView {
    fn name(&self) -> &'static str {
        "StudentsView"
    }

    fn count(&self) -> usize {
        self.rows.try_read().map(|rows| rows.len()).unwrap_or(0)
    }
}
