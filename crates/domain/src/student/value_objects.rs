//! Value objects for the student domain.
//!
//! Constructors normalize their input and reject anything malformed, so a
//! value that exists is always valid.

use std::str::FromStr;

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identity of a student stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(AggregateId);

impl StudentId {
    pub fn new() -> Self {
        Self(AggregateId::new())
    }

    pub fn as_aggregate_id(self) -> AggregateId {
        self.0
    }
}

impl Default for StudentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AggregateId> for StudentId {
    fn from(id: AggregateId) -> Self {
        Self(id)
    }
}

impl From<StudentId> for AggregateId {
    fn from(id: StudentId) -> Self {
        id.0
    }
}

/// A first or last name.
///
/// Whitespace is collapsed and each word part is capitalized, so
/// `"  mary-jane   o'neil "` becomes `"Mary-Jane O'neil"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonName(String);

impl PersonName {
    pub const MIN_LENGTH: usize = 2;
    pub const MAX_LENGTH: usize = 50;

    pub fn parse(field: &'static str, raw: &str) -> Result<Self, ValidationError> {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return Err(ValidationError::Required { field });
        }

        let length = collapsed.chars().count();
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&length) {
            return Err(ValidationError::Length {
                field,
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }

        if !collapsed
            .chars()
            .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '.'))
        {
            return Err(ValidationError::Characters { field });
        }

        Ok(Self(title_case(&collapsed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PersonName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        at_word_start = matches!(c, ' ' | '-');
    }
    out
}

/// An email address, stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub const MAX_LENGTH: usize = 256;

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Required { field: "email" });
        }
        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(ValidationError::Length {
                field: "email",
                min: 3,
                max: Self::MAX_LENGTH,
            });
        }

        let invalid = || ValidationError::EmailFormat(trimmed.to_string());

        if trimmed.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') {
            return Err(invalid());
        }
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
            return Err(invalid());
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Institution-issued student number, stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentNumber(String);

impl StudentNumber {
    pub const MIN_LENGTH: usize = 5;
    pub const MAX_LENGTH: usize = 20;

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: "student number",
            });
        }
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&trimmed.len()) {
            return Err(ValidationError::Length {
                field: "student number",
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::Characters {
                field: "student number",
            });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StudentNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
    Graduated,
}

impl StudentStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, StudentStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "Active",
            StudentStatus::Inactive => "Inactive",
            StudentStatus::Suspended => "Suspended",
            StudentStatus::Graduated => "Graduated",
        }
    }
}

impl std::fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(StudentStatus::Active),
            "inactive" => Ok(StudentStatus::Inactive),
            "suspended" => Ok(StudentStatus::Suspended),
            "graduated" => Ok(StudentStatus::Graduated),
            _ => Err(ValidationError::UnknownVariant {
                kind: "student status",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_normalized() {
        let name = PersonName::parse("first name", "  mary-jane   o'neil ").unwrap();
        assert_eq!(name.as_str(), "Mary-Jane O'neil");

        let name = PersonName::parse("last name", "SMITH").unwrap();
        assert_eq!(name.as_str(), "Smith");
    }

    #[test]
    fn name_length_is_bounded() {
        assert_eq!(
            PersonName::parse("first name", "A"),
            Err(ValidationError::Length {
                field: "first name",
                min: 2,
                max: 50
            })
        );
        assert!(PersonName::parse("first name", &"a".repeat(51)).is_err());
        assert!(PersonName::parse("first name", &"a".repeat(50)).is_ok());
    }

    #[test]
    fn name_rejects_blank_and_digits() {
        assert_eq!(
            PersonName::parse("last name", "   "),
            Err(ValidationError::Required { field: "last name" })
        );
        assert_eq!(
            PersonName::parse("last name", "R2D2"),
            Err(ValidationError::Characters { field: "last name" })
        );
    }

    #[test]
    fn name_accepts_accented_letters() {
        assert_eq!(
            PersonName::parse("first name", "josé").unwrap().as_str(),
            "José"
        );
    }

    #[test]
    fn email_is_lowercased() {
        let email = Email::parse(" Ada.Lovelace@Example.ORG ").unwrap();
        assert_eq!(email.as_str(), "ada.lovelace@example.org");
    }

    #[test]
    fn email_shape_is_checked() {
        for bad in [
            "plainaddress",
            "@example.com",
            "user@",
            "user@localhost",
            "user@exa mple.com",
            "a@b@c.com",
            "user@example..com",
        ] {
            assert!(
                matches!(Email::parse(bad), Err(ValidationError::EmailFormat(_))),
                "{bad} should be rejected"
            );
        }
        assert!(matches!(
            Email::parse(""),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn email_length_is_bounded() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(ValidationError::Length { .. })
        ));
    }

    #[test]
    fn student_number_rules() {
        assert_eq!(StudentNumber::parse("s12345").unwrap().as_str(), "S12345");
        assert!(matches!(
            StudentNumber::parse("1234"),
            Err(ValidationError::Length { .. })
        ));
        assert!(matches!(
            StudentNumber::parse("S-12345"),
            Err(ValidationError::Characters { .. })
        ));
        assert!(StudentNumber::parse(&"9".repeat(21)).is_err());
    }

    #[test]
    fn student_status_parses() {
        assert_eq!(
            "graduated".parse::<StudentStatus>().unwrap(),
            StudentStatus::Graduated
        );
        assert!("expelled".parse::<StudentStatus>().is_err());
    }
}
