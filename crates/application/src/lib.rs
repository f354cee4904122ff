//! Application layer: repositories, unit of work, and command handlers.
//!
//! This crate provides:
//! - [`EventSourcedRepository`] to rebuild aggregates from history and save new events
//! - [`UnitOfWork`] to append a batch and then publish it to the projections
//! - [`CardService`] and [`StudentService`] command/query handlers
//! - [`EventLog`] for diagnostic browsing of the raw log
//! - [`Application`] to wire all of the above around one event store

pub mod card_service;
pub mod commands;
pub mod error;
pub mod event_log;
pub mod repository;
pub mod student_service;
pub mod unit_of_work;

use std::sync::Arc;

use common::Clock;
use event_store::EventStore;
use projections::{
    CardProjection, CardsView, ProjectionProcessor, StudentProjection, StudentsView,
};

pub use card_service::CardService;
pub use commands::{
    AssignCard, CardAssigned, CardIssued, CardUnassigned, CreateCard, CreateStudent,
    StudentEnrolled, UpdateStudentProfile,
};
pub use error::{ApplicationError, InvariantViolation, Result};
pub use event_log::EventLog;
pub use repository::{CardRepository, EventSourcedRepository, StudentRepository};
pub use student_service::StudentService;
pub use unit_of_work::UnitOfWork;

/// Every handler wired around one event store, sharing one set of read models.
pub struct Application<S: EventStore> {
    pub cards: CardService<S>,
    pub students: StudentService<S>,
    pub events: EventLog<S>,
    processor: Arc<ProjectionProcessor<S>>,
}

impl<S: EventStore + Clone> Application<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        let cards_view = CardsView::new();
        let students_view = StudentsView::new();

        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(Box::new(CardProjection::new(
            cards_view.clone(),
            students_view.clone(),
        )));
        processor.register(Box::new(StudentProjection::new(
            students_view.clone(),
            cards_view.clone(),
        )));
        let processor = Arc::new(processor);

        let unit_of_work = UnitOfWork::new(store.clone(), Arc::clone(&processor));
        let card_repository = CardRepository::new(unit_of_work.clone(), cards_view);
        let student_repository = StudentRepository::new(unit_of_work, students_view);

        Self {
            cards: CardService::new(
                card_repository,
                student_repository.clone(),
                Arc::clone(&clock),
            ),
            students: StudentService::new(student_repository, clock),
            events: EventLog::new(store),
            processor,
        }
    }
}

impl<S: EventStore> Application<S> {
    /// Feeds the read models every stored event they have not seen yet.
    pub async fn catch_up(&self) -> Result<()> {
        self.processor.run_catch_up().await?;
        Ok(())
    }

    /// Drops the read models and replays the whole log into them.
    pub async fn rebuild_read_models(&self) -> Result<()> {
        self.processor.rebuild_all().await?;
        Ok(())
    }
}

/// Counts a command and, if it was rejected, its failure.
pub(crate) fn track<T>(command: &'static str, result: Result<T>) -> Result<T> {
    metrics::counter!("commands_total", "command" => command).increment(1);
    if let Err(error) = &result {
        metrics::counter!("commands_failed_total", "command" => command).increment(1);
        tracing::warn!(command, %error, "command failed");
    }
    result
}
