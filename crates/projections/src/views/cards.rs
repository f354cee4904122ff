//! Card read model: one row per card, with the assigned student denormalized in.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use domain::{CardId, CardStatus, CardType, StudentId};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::read_model::ReadModel;

/// Query-side view of one card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardRow {
    pub card_id: CardId,
    #[serde(skip_serializing)]
    pub card_number: String,
    pub masked_card_number: String,
    pub card_type: CardType,
    pub status: CardStatus,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub assigned_student_id: Option<StudentId>,
    pub assigned_student_name: Option<String>,
    pub assigned_student_email: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
}

impl CardRow {
    pub fn is_assigned(&self) -> bool {
        self.assigned_student_id.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whole days left before expiry; negative once expired.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_days()
    }

    pub(crate) fn clear_assignment(&mut self) {
        self.assigned_student_id = None;
        self.assigned_student_name = None;
        self.assigned_student_email = None;
        self.assigned_at = None;
    }
}

/// In-memory card read model.
///
/// Clones share the same rows. Lookups here are a secondary index over the
/// event log and may trail it by whatever has not been published yet.
#[derive(Clone, Default)]
pub struct CardsView {
    rows: Arc<RwLock<HashMap<CardId, CardRow>>>,
}

impl CardsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, card_id: CardId) -> Option<CardRow> {
        self.rows.read().await.get(&card_id).cloned()
    }

    pub async fn find_by_card_number(&self, card_number: &str) -> Option<CardRow> {
        self.rows
            .read()
            .await
            .values()
            .find(|row| row.card_number == card_number)
            .cloned()
    }

    pub async fn find_by_assigned_student(&self, student_id: StudentId) -> Option<CardRow> {
        self.rows
            .read()
            .await
            .values()
            .find(|row| row.assigned_student_id == Some(student_id))
            .cloned()
    }

    /// Every card ordered by card number.
    pub async fn all(&self) -> Vec<CardRow> {
        let mut rows: Vec<_> = self.rows.read().await.values().cloned().collect();
        rows.sort_by(|a, b| a.card_number.cmp(&b.card_number));
        rows
    }

    /// Cards that could be handed out right now.
    pub async fn available(&self, now: DateTime<Utc>) -> Vec<CardRow> {
        let mut rows = self.all().await;
        rows.retain(|row| !row.is_assigned() && row.is_active() && !row.is_expired(now));
        rows
    }

    /// Assigned cards ordered by student name, then card number.
    pub async fn assigned(&self) -> Vec<CardRow> {
        let mut rows: Vec<_> = self
            .rows
            .read()
            .await
            .values()
            .filter(|row| row.is_assigned())
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.assigned_student_name
                .cmp(&b.assigned_student_name)
                .then_with(|| a.card_number.cmp(&b.card_number))
        });
        rows
    }

    /// Unexpired cards whose expiry falls within `days` of `now`, soonest first.
    ///
    /// A window reaching past the representable calendar has no upper bound.
    pub async fn expiring_within(&self, now: DateTime<Utc>, days: i64) -> Vec<CardRow> {
        let horizon = Duration::try_days(days).and_then(|window| now.checked_add_signed(window));
        let mut rows: Vec<_> = self
            .rows
            .read()
            .await
            .values()
            .filter(|row| row.expires_at >= now && horizon.is_none_or(|h| row.expires_at <= h))
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.expires_at);
        rows
    }

    pub(crate) async fn insert(&self, row: CardRow) {
        self.rows.write().await.insert(row.card_id, row);
    }

    pub(crate) fn rows(&self) -> &Arc<RwLock<HashMap<CardId, CardRow>>> {
        &self.rows
    }

    pub(crate) async fn clear(&self) {
        self.rows.write().await.clear();
    }
}

impl ReadModel for CardsView {
    fn name(&self) -> &'static str {
        "CardsView"
    }

    fn count(&self) -> usize {
        self.rows.try_read().map(|rows| rows.len()).unwrap_or(0)
    }
}
