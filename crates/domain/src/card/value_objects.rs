//! Value objects for the card domain.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::AggregateId;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::student::StudentId;

/// Identity of a card stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(AggregateId);

impl CardId {
    pub fn new() -> Self {
        Self(AggregateId::new())
    }

    pub fn as_aggregate_id(self) -> AggregateId {
        self.0
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AggregateId> for CardId {
    fn from(id: AggregateId) -> Self {
        Self(id)
    }
}

impl From<CardId> for AggregateId {
    fn from(id: CardId) -> Self {
        id.0
    }
}

/// Sixteen decimal digits printed on the card.
///
/// Deserializing goes through [`CardNumber::parse`], so a stored payload
/// carrying anything else fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardNumber(String);

impl CardNumber {
    pub const LENGTH: usize = 16;

    /// Draws a fresh random number.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let digits = (0..Self::LENGTH)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        Self(digits)
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let digits: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        if digits.len() != Self::LENGTH || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::CardNumberFormat);
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form that only reveals the last four digits.
    pub fn masked(&self) -> String {
        let tail = &self.0[self.0.len().saturating_sub(4)..];
        format!("****-****-****-{tail}")
    }
}

impl TryFrom<String> for CardNumber {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<CardNumber> for String {
    fn from(number: CardNumber) -> Self {
        number.0
    }
}

impl std::fmt::Display for CardNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CardType {
    #[default]
    Student,
    Staff,
    Visitor,
    Temporary,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Student => "Student",
            CardType::Staff => "Staff",
            CardType::Visitor => "Visitor",
            CardType::Temporary => "Temporary",
        }
    }
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(CardType::Student),
            "staff" => Ok(CardType::Staff),
            "visitor" => Ok(CardType::Visitor),
            "temporary" => Ok(CardType::Temporary),
            _ => Err(ValidationError::UnknownVariant {
                kind: "card type",
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a card.
///
/// Only an `Active` card can be assigned. Any other status is reached
/// through an explicit status change, which releases a current assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CardStatus {
    #[default]
    Active,
    Inactive,
    Lost,
    Stolen,
    Expired,
    Damaged,
}

impl CardStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, CardStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "Active",
            CardStatus::Inactive => "Inactive",
            CardStatus::Lost => "Lost",
            CardStatus::Stolen => "Stolen",
            CardStatus::Expired => "Expired",
            CardStatus::Damaged => "Damaged",
        }
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(CardStatus::Active),
            "inactive" => Ok(CardStatus::Inactive),
            "lost" => Ok(CardStatus::Lost),
            "stolen" => Ok(CardStatus::Stolen),
            "expired" => Ok(CardStatus::Expired),
            "damaged" => Ok(CardStatus::Damaged),
            _ => Err(ValidationError::UnknownVariant {
                kind: "card status",
                value: s.to_string(),
            }),
        }
    }
}

/// The binding of a card to a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAssignment {
    pub student_id: StudentId,
    pub assigned_at: DateTime<Utc>,
    pub unassigned_at: Option<DateTime<Utc>>,
}

impl CardAssignment {
    pub fn new(student_id: StudentId, assigned_at: DateTime<Utc>) -> Self {
        Self {
            student_id,
            assigned_at,
            unassigned_at: None,
        }
    }

    pub fn is_current(&self) -> bool {
        self.unassigned_at.is_none()
    }
}
