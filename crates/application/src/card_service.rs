//! Card command and query handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::Clock;
use domain::{Card, CardError, CardId, CardNumber, CardStatus, StudentId};
use event_store::EventStore;
use projections::CardRow;

use crate::commands::{AssignCard, CardAssigned, CardIssued, CardUnassigned, CreateCard};
use crate::error::{ApplicationError, InvariantViolation};
use crate::repository::{CardRepository, StudentRepository};
use crate::{Result, track};

/// Handles card commands against the event log and card queries against the
/// read model.
pub struct CardService<S: EventStore> {
    cards: CardRepository<S>,
    students: StudentRepository<S>,
    clock: Arc<dyn Clock>,
}

impl<S: EventStore> CardService<S> {
    pub fn new(
        cards: CardRepository<S>,
        students: StudentRepository<S>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cards,
            students,
            clock,
        }
    }

    /// Issues a new Active card with a freshly generated number.
    #[tracing::instrument(skip(self))]
    pub async fn create_card(&self, cmd: CreateCard) -> Result<CardIssued> {
        track("create_card", self.issue(cmd).await)
    }

    /// Binds a card to an active student who holds no other card.
    #[tracing::instrument(skip(self))]
    pub async fn assign_card(&self, cmd: AssignCard) -> Result<CardAssigned> {
        track("assign_card", self.assign(cmd).await)
    }

    #[tracing::instrument(skip(self))]
    pub async fn unassign_card(&self, card_id: CardId) -> Result<CardUnassigned> {
        track("unassign_card", self.unassign(card_id).await)
    }

    /// Moves a card to `status`, releasing its student first if needed.
    #[tracing::instrument(skip(self))]
    pub async fn change_card_status(&self, card_id: CardId, status: CardStatus) -> Result<CardRow> {
        track(
            "change_card_status",
            self.update(card_id, |card, now| card.change_status(status, now))
                .await,
        )
    }

    #[tracing::instrument(skip(self))]
    pub async fn report_lost(&self, card_id: CardId) -> Result<CardRow> {
        track(
            "report_card_lost",
            self.update(card_id, Card::report_lost).await,
        )
    }

    #[tracing::instrument(skip(self))]
    pub async fn report_stolen(&self, card_id: CardId) -> Result<CardRow> {
        track(
            "report_card_stolen",
            self.update(card_id, Card::report_stolen).await,
        )
    }

    #[tracing::instrument(skip(self))]
    pub async fn report_damaged(&self, card_id: CardId) -> Result<CardRow> {
        track(
            "report_card_damaged",
            self.update(card_id, Card::report_damaged).await,
        )
    }

    async fn issue(&self, cmd: CreateCard) -> Result<CardIssued> {
        let now = self.clock.now();
        if cmd.expires_at <= now {
            return Err(InvariantViolation::ExpiryNotInFuture {
                expires_at: cmd.expires_at,
            }
            .into());
        }

        let card_id = CardId::new();
        let card_number = CardNumber::generate();
        let mut card = Card::create(
            card_id,
            card_number.clone(),
            cmd.card_type,
            cmd.expires_at,
            now,
        );
        self.cards.save(&mut card).await?;

        tracing::info!(%card_id, card_type = %cmd.card_type, "card issued");
        Ok(CardIssued {
            card_id,
            card_number: card_number.as_str().to_string(),
            card_type: card.card_type(),
            issued_at: card.issued_at(),
            expires_at: card.expires_at(),
        })
    }

    async fn assign(&self, cmd: AssignCard) -> Result<CardAssigned> {
        let mut card = self.load(cmd.card_id).await?;
        let student = self
            .students
            .get_by_id(cmd.student_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Student", cmd.student_id))?;

        if !student.is_active() {
            return Err(InvariantViolation::InactiveStudent {
                status: student.status(),
            }
            .into());
        }

        if let Some(held) = self.cards.find_by_assigned_student(cmd.student_id).await? {
            return Err(InvariantViolation::StudentAlreadyHasCard {
                student_id: cmd.student_id,
                card_id: held.card_id().unwrap_or(cmd.card_id),
            }
            .into());
        }

        let now = self.clock.now();
        card.assign_to_student(cmd.student_id, now)?;
        self.cards.save(&mut card).await?;

        Ok(CardAssigned {
            card_id: cmd.card_id,
            student_id: cmd.student_id,
            assigned_at: now,
        })
    }

    async fn unassign(&self, card_id: CardId) -> Result<CardUnassigned> {
        let mut card = self.load(card_id).await?;
        let student_id = card.assigned_student_id().ok_or(CardError::NotAssigned)?;

        let now = self.clock.now();
        card.unassign(now)?;
        self.cards.save(&mut card).await?;

        Ok(CardUnassigned {
            card_id,
            masked_card_number: card
                .card_number()
                .map(CardNumber::masked)
                .unwrap_or_default(),
            student_id,
            unassigned_at: now,
        })
    }

    async fn update<F>(&self, card_id: CardId, operation: F) -> Result<CardRow>
    where
        F: FnOnce(&mut Card, DateTime<Utc>) -> std::result::Result<(), CardError>,
    {
        let mut card = self.load(card_id).await?;
        operation(&mut card, self.clock.now())?;
        self.cards.save(&mut card).await?;
        self.card(card_id).await
    }

    async fn load(&self, card_id: CardId) -> Result<Card> {
        self.cards
            .get_by_id(card_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Card", card_id))
    }
}

// Queries, served from the card read model
impl<S: EventStore> CardService<S> {
    pub async fn card(&self, card_id: CardId) -> Result<CardRow> {
        self.cards
            .view()
            .get(card_id)
            .await
            .ok_or_else(|| ApplicationError::not_found("Card", card_id))
    }

    pub async fn cards(&self) -> Vec<CardRow> {
        self.cards.view().all().await
    }

    pub async fn available_cards(&self) -> Vec<CardRow> {
        self.cards.view().available(self.clock.now()).await
    }

    pub async fn assigned_cards(&self) -> Vec<CardRow> {
        self.cards.view().assigned().await
    }

    pub async fn expiring_cards(&self, days: i64) -> Vec<CardRow> {
        self.cards
            .view()
            .expiring_within(self.clock.now(), days)
            .await
    }

    pub async fn card_for_student(&self, student_id: StudentId) -> Result<CardRow> {
        self.cards
            .view()
            .find_by_assigned_student(student_id)
            .await
            .ok_or_else(|| {
                ApplicationError::not_found("Card", format!("assigned to student {student_id}"))
            })
    }
}
