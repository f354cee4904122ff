//! Card aggregate and related types.

mod aggregate;
mod events;
mod value_objects;

pub use aggregate::Card;
pub use events::{
    CardAssignedToStudent, CardCreated, CardEvent, CardStatusChanged, CardUnassignedFromStudent,
};
pub use value_objects::{CardAssignment, CardId, CardNumber, CardStatus, CardType};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Business rules a card operation can break.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    #[error("Card is already assigned to a student")]
    AlreadyAssigned,

    #[error("Cannot assign an inactive card (status: {status})")]
    InactiveCard { status: CardStatus },

    #[error("Cannot assign a card that expired at {expires_at}")]
    ExpiredCard { expires_at: DateTime<Utc> },

    #[error("Card is not assigned to any student")]
    NotAssigned,

    #[error("Card has not been created")]
    NotCreated,
}
