//! Read models and projections for the query side.
//!
//! This crate provides:
//! - [`Projection`] trait for processing stored events into read models
//! - [`ReadModel`] trait for query access to denormalized data
//! - [`ProjectionProcessor`] for publishing new records and replaying the log
//! - Card and student views, plus the handlers that maintain them

pub mod error;
pub mod handlers;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use handlers::{CardProjection, StudentProjection};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{CardRow, CardsView, StudentRow, StudentsView};
