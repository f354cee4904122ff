//! Integration tests: aggregates → event store → ProjectionProcessor → card and student views.

use chrono::{DateTime, Duration, Utc};
use domain::{
    Aggregate, Card, CardId, CardNumber, CardStatus, CardType, DomainEvent, Email, PersonName,
    Student, StudentId, StudentNumber, StudentStatus,
};
use event_store::{EventStore, EventStoreError, InMemoryEventStore, Version};
use projections::{
    CardProjection, CardsView, ProjectionError, ProjectionProcessor, ReadModel, StudentProjection,
    StudentsView,
};

struct Harness {
    store: InMemoryEventStore,
    processor: ProjectionProcessor<InMemoryEventStore>,
    cards: CardsView,
    students: StudentsView,
}

/// Helper to set up the store, processor, and both views.
fn setup() -> Harness {
    let store = InMemoryEventStore::new();
    let cards = CardsView::new();
    let students = StudentsView::new();

    let mut processor = ProjectionProcessor::new(store.clone());
    processor.register(Box::new(CardProjection::new(cards.clone(), students.clone())));
    processor.register(Box::new(StudentProjection::new(students.clone(), cards.clone())));

    Harness {
        store,
        processor,
        cards,
        students,
    }
}

impl Harness {
    async fn save<A: Aggregate>(&self, aggregate: &mut A) {
        let expected = aggregate.changes().committed_version();
        let pending = aggregate
            .take_uncommitted()
            .iter()
            .map(|e| e.to_pending().unwrap())
            .collect();
        let records = self
            .store
            .append(aggregate.id().unwrap(), A::aggregate_type(), pending, expected)
            .await
            .unwrap();
        self.processor.publish(&records).await.unwrap();
    }
}

fn new_card(now: DateTime<Utc>) -> Card {
    Card::create(
        CardId::new(),
        CardNumber::parse("4000123412341234").unwrap(),
        CardType::Student,
        now + Duration::days(365),
        now,
    )
}

fn new_student(first: &str, last: &str, email: &str, number: &str, now: DateTime<Utc>) -> Student {
    Student::create(
        StudentId::new(),
        PersonName::parse("first name", first).unwrap(),
        PersonName::parse("last name", last).unwrap(),
        Email::parse(email).unwrap(),
        StudentNumber::parse(number).unwrap(),
        now,
    )
}

mod card_rows {
    use super::*;

    #[tokio::test]
    async fn created_card_is_active_and_unassigned() {
        let h = setup();
        let now = Utc::now();
        let mut card = new_card(now);
        h.save(&mut card).await;

        let row = h.cards.get(card.card_id().unwrap()).await.unwrap();
        assert_eq!(row.status, CardStatus::Active);
        assert!(!row.is_assigned());
        assert_eq!(row.masked_card_number, "****-****-****-1234");
        assert_eq!(row.issued_at, now);
        assert_eq!(row.expires_at, now + Duration::days(365));
        assert_eq!(h.cards.count(), 1);
    }

    #[tokio::test]
    async fn status_change_updates_status_and_timestamp() {
        let h = setup();
        let now = Utc::now();
        let mut card = new_card(now);
        h.save(&mut card).await;

        let later = now + Duration::hours(1);
        card.report_damaged(later).unwrap();
        h.save(&mut card).await;

        let row = h.cards.get(card.card_id().unwrap()).await.unwrap();
        assert_eq!(row.status, CardStatus::Damaged);
        assert_eq!(row.updated_at, Some(later));
    }
}

mod assignment {
    use super::*;

    #[tokio::test]
    async fn assignment_links_both_rows() {
        let h = setup();
        let now = Utc::now();
        let mut student = new_student("ada", "lovelace", "ada@example.edu", "AL1815", now);
        let mut card = new_card(now);
        h.save(&mut student).await;
        h.save(&mut card).await;

        let student_id = student.student_id().unwrap();
        let card_id = card.card_id().unwrap();
        card.assign_to_student(student_id, now).unwrap();
        h.save(&mut card).await;

        let card_row = h.cards.get(card_id).await.unwrap();
        assert_eq!(card_row.assigned_student_id, Some(student_id));
        assert_eq!(card_row.assigned_student_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(card_row.assigned_student_email.as_deref(), Some("ada@example.edu"));
        assert_eq!(card_row.assigned_at, Some(now));

        let student_row = h.students.get(student_id).await.unwrap();
        assert_eq!(student_row.assigned_card_id, Some(card_id));
        assert_eq!(
            student_row.assigned_card_number.as_deref(),
            Some("****-****-****-1234")
        );
        assert_eq!(
            h.cards
                .find_by_assigned_student(student_id)
                .await
                .map(|r| r.card_id),
            Some(card_id)
        );
    }

    #[tokio::test]
    async fn assignment_without_student_row_is_skipped() {
        let h = setup();
        let now = Utc::now();
        let mut card = new_card(now);
        h.save(&mut card).await;

        card.assign_to_student(StudentId::new(), now).unwrap();
        h.save(&mut card).await;

        let row = h.cards.get(card.card_id().unwrap()).await.unwrap();
        assert!(!row.is_assigned());
    }

    #[tokio::test]
    async fn unassignment_clears_both_rows() {
        let h = setup();
        let now = Utc::now();
        let mut student = new_student("alan", "turing", "alan@example.edu", "AT1912", now);
        let mut card = new_card(now);
        h.save(&mut student).await;
        h.save(&mut card).await;

        let student_id = student.student_id().unwrap();
        card.assign_to_student(student_id, now).unwrap();
        h.save(&mut card).await;
        card.unassign(now).unwrap();
        h.save(&mut card).await;

        assert!(!h.cards.get(card.card_id().unwrap()).await.unwrap().is_assigned());
        assert!(!h.students.get(student_id).await.unwrap().has_assigned_card());
    }

    #[tokio::test]
    async fn reporting_lost_releases_the_student() {
        let h = setup();
        let now = Utc::now();
        let mut student = new_student("grace", "hopper", "grace@example.edu", "GH1906", now);
        let mut card = new_card(now);
        h.save(&mut student).await;
        h.save(&mut card).await;

        let student_id = student.student_id().unwrap();
        card.assign_to_student(student_id, now).unwrap();
        h.save(&mut card).await;
        card.report_lost(now).unwrap();
        h.save(&mut card).await;

        let card_row = h.cards.get(card.card_id().unwrap()).await.unwrap();
        assert_eq!(card_row.status, CardStatus::Lost);
        assert!(!card_row.is_assigned());
        assert!(!h.students.get(student_id).await.unwrap().has_assigned_card());
    }
}

mod student_rows {
    use super::*;

    #[tokio::test]
    async fn created_student_is_indexed_by_natural_keys() {
        let h = setup();
        let now = Utc::now();
        let mut student = new_student("ada", "lovelace", "Ada@Example.edu", "al1815", now);
        h.save(&mut student).await;

        let row = h.students.find_by_email("ada@example.edu").await.unwrap();
        assert_eq!(row.full_name, "Ada Lovelace");
        assert_eq!(row.display_name(), "Ada Lovelace (AL1815)");
        assert!(h.students.find_by_student_number("AL1815").await.is_some());
    }

    #[tokio::test]
    async fn status_change_is_projected() {
        let h = setup();
        let now = Utc::now();
        let mut student = new_student("ada", "lovelace", "ada@example.edu", "AL1815", now);
        h.save(&mut student).await;

        student.change_status(StudentStatus::Graduated, now).unwrap();
        h.save(&mut student).await;

        let row = h.students.get(student.student_id().unwrap()).await.unwrap();
        assert_eq!(row.status, StudentStatus::Graduated);
        assert!(h.students.active().await.is_empty());
    }

    #[tokio::test]
    async fn profile_update_refreshes_the_assigned_card() {
        let h = setup();
        let now = Utc::now();
        let mut student = new_student("grace", "hopper", "grace@example.edu", "GH1906", now);
        let mut card = new_card(now);
        h.save(&mut student).await;
        h.save(&mut card).await;

        card.assign_to_student(student.student_id().unwrap(), now)
            .unwrap();
        h.save(&mut card).await;

        student
            .update_profile(
                PersonName::parse("first name", "grace").unwrap(),
                PersonName::parse("last name", "murray").unwrap(),
                Email::parse("gmurray@example.edu").unwrap(),
                now,
            )
            .unwrap();
        h.save(&mut student).await;

        let card_row = h.cards.get(card.card_id().unwrap()).await.unwrap();
        assert_eq!(card_row.assigned_student_name.as_deref(), Some("Grace Murray"));
        assert_eq!(
            card_row.assigned_student_email.as_deref(),
            Some("gmurray@example.edu")
        );
        assert!(h.students.find_by_email("grace@example.edu").await.is_none());
    }
}

mod replay {
    use super::*;

    #[tokio::test]
    async fn rebuild_reproduces_published_state() {
        let h = setup();
        let now = Utc::now();
        let mut student = new_student("ada", "lovelace", "ada@example.edu", "AL1815", now);
        let mut card = new_card(now);
        h.save(&mut student).await;
        h.save(&mut card).await;
        card.assign_to_student(student.student_id().unwrap(), now)
            .unwrap();
        h.save(&mut card).await;

        let before_card = h.cards.all().await;
        let before_students = h.students.all().await;

        h.processor.rebuild_all().await.unwrap();

        assert_eq!(h.cards.all().await, before_card);
        assert_eq!(h.students.all().await, before_students);
    }

    #[tokio::test]
    async fn catch_up_fills_fresh_views_from_the_log() {
        let h = setup();
        let now = Utc::now();
        let mut student = new_student("ada", "lovelace", "ada@example.edu", "AL1815", now);
        let mut card = new_card(now);
        h.save(&mut student).await;
        h.save(&mut card).await;

        let cards = CardsView::new();
        let students = StudentsView::new();
        let mut fresh = ProjectionProcessor::new(h.store.clone());
        fresh.register(Box::new(CardProjection::new(cards.clone(), students.clone())));
        fresh.register(Box::new(StudentProjection::new(students.clone(), cards.clone())));
        fresh.run_catch_up().await.unwrap();

        assert_eq!(cards.count(), 1);
        assert_eq!(students.count(), 1);
    }

    #[tokio::test]
    async fn malformed_card_number_is_a_decode_error() {
        let h = setup();
        let mut card = new_card(Utc::now());
        let mut pending: Vec<_> = card
            .take_uncommitted()
            .iter()
            .map(|e| e.to_pending().unwrap())
            .collect();
        pending[0].payload["card_number"] = serde_json::json!("40001234123412é");

        let records = h
            .store
            .append(card.id().unwrap(), Card::aggregate_type(), pending, Version::initial())
            .await
            .unwrap();

        let result = h.processor.publish(&records).await;
        assert!(matches!(
            result,
            Err(ProjectionError::EventStore(EventStoreError::CorruptEventRecord { .. }))
        ));
        assert_eq!(h.cards.count(), 0);
    }
}
