//! Student aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;

use crate::aggregate::{Aggregate, ChangeTracker};

use super::{
    Email, PersonName, StudentError, StudentEvent, StudentId, StudentNumber, StudentStatus,
    events::{StudentCreated, StudentProfileUpdated, StudentStatusChanged},
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Profile {
    first_name: PersonName,
    last_name: PersonName,
    email: Email,
    student_number: StudentNumber,
}

/// Student aggregate root.
#[derive(Debug, Clone, Default)]
pub struct Student {
    id: Option<StudentId>,
    profile: Option<Profile>,
    status: StudentStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    changes: ChangeTracker<StudentEvent>,
}

impl Student {
    pub const AGGREGATE_TYPE: &'static str = "Student";
}

impl Aggregate for Student {
    type Event = StudentEvent;

    fn aggregate_type() -> &'static str {
        Self::AGGREGATE_TYPE
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(StudentId::as_aggregate_id)
    }

    fn changes(&self) -> &ChangeTracker<StudentEvent> {
        &self.changes
    }

    fn changes_mut(&mut self) -> &mut ChangeTracker<StudentEvent> {
        &mut self.changes
    }

    fn apply(&mut self, event: &StudentEvent) {
        match event {
            StudentEvent::Created(data) => self.apply_created(data),
            StudentEvent::StatusChanged(data) => self.apply_status_changed(data),
            StudentEvent::ProfileUpdated(data) => self.apply_profile_updated(data),
        }
    }
}

// Query methods
impl Student {
    pub fn student_id(&self) -> Option<StudentId> {
        self.id
    }

    pub fn first_name(&self) -> Option<&PersonName> {
        self.profile.as_ref().map(|p| &p.first_name)
    }

    pub fn last_name(&self) -> Option<&PersonName> {
        self.profile.as_ref().map(|p| &p.last_name)
    }

    /// "First Last", empty for a blank aggregate.
    pub fn full_name(&self) -> String {
        self.profile
            .as_ref()
            .map(|p| format!("{} {}", p.first_name, p.last_name))
            .unwrap_or_default()
    }

    pub fn email(&self) -> Option<&Email> {
        self.profile.as_ref().map(|p| &p.email)
    }

    pub fn student_number(&self) -> Option<&StudentNumber> {
        self.profile.as_ref().map(|p| &p.student_number)
    }

    pub fn status(&self) -> StudentStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

// Command methods
impl Student {
    /// Enrolls a new student from already-validated values.
    pub fn create(
        student_id: StudentId,
        first_name: PersonName,
        last_name: PersonName,
        email: Email,
        student_number: StudentNumber,
        now: DateTime<Utc>,
    ) -> Self {
        let mut student = Student::default();
        student.apply_new(StudentEvent::created(
            student_id,
            first_name,
            last_name,
            email,
            student_number,
            now,
        ));
        student
    }

    /// Records a status transition. Setting the current status again raises nothing.
    pub fn change_status(
        &mut self,
        new_status: StudentStatus,
        now: DateTime<Utc>,
    ) -> Result<(), StudentError> {
        let student_id = self.id.ok_or(StudentError::NotCreated)?;
        if new_status == self.status {
            return Ok(());
        }

        self.apply_new(StudentEvent::status_changed(
            student_id,
            self.status,
            new_status,
            now,
        ));
        Ok(())
    }

    /// Replaces the name and email. Always raises one profile-updated event,
    /// even when the values are the same as before.
    pub fn update_profile(
        &mut self,
        first_name: PersonName,
        last_name: PersonName,
        email: Email,
        now: DateTime<Utc>,
    ) -> Result<(), StudentError> {
        let student_id = self.id.ok_or(StudentError::NotCreated)?;

        self.apply_new(StudentEvent::profile_updated(
            student_id, first_name, last_name, email, now,
        ));
        Ok(())
    }
}

// Event application
impl Student {
    fn apply_created(&mut self, data: &StudentCreated) {
        self.id = Some(data.student_id);
        self.profile = Some(Profile {
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            email: data.email.clone(),
            student_number: data.student_number.clone(),
        });
        self.status = StudentStatus::Active;
        self.created_at = data.occurred_on;
    }

    fn apply_status_changed(&mut self, data: &StudentStatusChanged) {
        self.status = data.new_status;
        self.updated_at = Some(data.occurred_on);
    }

    fn apply_profile_updated(&mut self, data: &StudentProfileUpdated) {
        if let Some(profile) = self.profile.as_mut() {
            profile.first_name = data.first_name.clone();
            profile.last_name = data.last_name.clone();
            profile.email = data.email.clone();
        }
        self.updated_at = Some(data.occurred_on);
    }
}

#[cfg(test)]
mod tests {
    use event_store::Version;

    use super::*;

    fn name(raw: &str) -> PersonName {
        PersonName::parse("name", raw).unwrap()
    }

    fn new_student() -> Student {
        Student::create(
            StudentId::new(),
            name("Grace"),
            name("Hopper"),
            Email::parse("grace@navy.mil").unwrap(),
            StudentNumber::parse("GH1906").unwrap(),
            Utc::now(),
        )
    }

    #[test]
    fn create_starts_active_at_version_one() {
        let student = new_student();
        assert_eq!(student.version(), Version::first());
        assert!(student.is_active());
        assert_eq!(student.full_name(), "Grace Hopper");
        assert_eq!(student.student_number().unwrap().as_str(), "GH1906");
    }

    #[test]
    fn status_change_records_both_sides() {
        let mut student = new_student();
        student.take_uncommitted();

        student
            .change_status(StudentStatus::Suspended, Utc::now())
            .unwrap();

        let raised = student.take_uncommitted();
        assert_eq!(raised.len(), 1);
        match &raised[0] {
            StudentEvent::StatusChanged(data) => {
                assert_eq!(data.previous_status, StudentStatus::Active);
                assert_eq!(data.new_status, StudentStatus::Suspended);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(!student.is_active());
    }

    #[test]
    fn unchanged_status_raises_nothing() {
        let mut student = new_student();
        student.take_uncommitted();

        student
            .change_status(StudentStatus::Active, Utc::now())
            .unwrap();
        assert!(!student.changes().has_uncommitted());
    }

    #[test]
    fn profile_update_replaces_names_and_email() {
        let mut student = new_student();
        student
            .update_profile(
                name("Grace"),
                name("Murray"),
                Email::parse("grace.murray@navy.mil").unwrap(),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(student.full_name(), "Grace Murray");
        assert_eq!(student.email().unwrap().as_str(), "grace.murray@navy.mil");
        assert_eq!(student.version(), Version::new(2));
    }

    #[test]
    fn identical_profile_update_still_raises_one_event() {
        let mut student = new_student();
        student.take_uncommitted();
        student
            .update_profile(
                name("grace"),
                name("HOPPER"),
                Email::parse("Grace@Navy.mil").unwrap(),
                Utc::now(),
            )
            .unwrap();

        let raised = student.take_uncommitted();
        assert_eq!(raised.len(), 1);
        assert!(matches!(raised[0], StudentEvent::ProfileUpdated(_)));
        assert_eq!(student.full_name(), "Grace Hopper");
        assert_eq!(student.version(), Version::new(2));
    }

    #[test]
    fn aggregate_id_matches_student_id() {
        let student = new_student();
        assert_eq!(
            student.id(),
            student.student_id().map(StudentId::as_aggregate_id)
        );
        assert!(student.id().is_some());
    }

    #[test]
    fn replay_matches_live_state() {
        let mut student = new_student();
        student
            .change_status(StudentStatus::Graduated, Utc::now())
            .unwrap();
        let history = student.take_uncommitted();

        let replayed = Student::from_history(history).unwrap();
        assert_eq!(replayed.student_id(), student.student_id());
        assert_eq!(replayed.status(), StudentStatus::Graduated);
        assert_eq!(replayed.version(), Version::new(2));
        assert_eq!(replayed.profile, student.profile);
    }

    #[test]
    fn blank_student_rejects_commands() {
        let mut student = Student::default();
        assert_eq!(
            student.change_status(StudentStatus::Inactive, Utc::now()),
            Err(StudentError::NotCreated)
        );
    }
}
