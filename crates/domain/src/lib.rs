//! Domain layer for the card registry.
//!
//! This crate provides:
//! - the `Aggregate` and `DomainEvent` traits plus the `ChangeTracker` every
//!   aggregate owns
//! - the Card aggregate (issue, assign, unassign, status changes)
//! - the Student aggregate (enroll, status changes, profile updates)
//! - value objects that validate their input on construction

pub mod aggregate;
pub mod card;
pub mod error;
pub mod student;

pub use aggregate::{Aggregate, ChangeTracker, DomainEvent};
pub use card::{
    Card, CardAssignment, CardError, CardEvent, CardId, CardNumber, CardStatus, CardType,
};
pub use error::ValidationError;
pub use student::{
    Email, PersonName, Student, StudentError, StudentEvent, StudentId, StudentNumber,
    StudentStatus,
};
