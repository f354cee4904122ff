//! Student aggregate and related types.

mod aggregate;
mod events;
mod value_objects;

pub use aggregate::Student;
pub use events::{StudentCreated, StudentEvent, StudentProfileUpdated, StudentStatusChanged};
pub use value_objects::{Email, PersonName, StudentId, StudentNumber, StudentStatus};

use thiserror::Error;

/// Business rules a student operation can break.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StudentError {
    #[error("Student has not been created")]
    NotCreated,
}
