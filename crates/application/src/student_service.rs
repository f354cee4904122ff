//! Student command and query handlers.

use std::sync::Arc;

use common::Clock;
use domain::{Email, PersonName, Student, StudentId, StudentNumber, StudentStatus};
use event_store::EventStore;
use projections::StudentRow;

use crate::commands::{CreateStudent, StudentEnrolled, UpdateStudentProfile};
use crate::error::{ApplicationError, InvariantViolation};
use crate::repository::StudentRepository;
use crate::{Result, track};

/// Handles student commands against the event log and student queries
/// against the read model.
pub struct StudentService<S: EventStore> {
    students: StudentRepository<S>,
    clock: Arc<dyn Clock>,
}

impl<S: EventStore> StudentService<S> {
    pub fn new(students: StudentRepository<S>, clock: Arc<dyn Clock>) -> Self {
        Self { students, clock }
    }

    /// Enrolls a student. Email and student number must not belong to any
    /// other student known to the read model.
    #[tracing::instrument(skip(self))]
    pub async fn create_student(&self, cmd: CreateStudent) -> Result<StudentEnrolled> {
        track("create_student", self.enroll(cmd).await)
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_student_status(
        &self,
        student_id: StudentId,
        status: StudentStatus,
    ) -> Result<StudentRow> {
        track(
            "change_student_status",
            self.change_status(student_id, status).await,
        )
    }

    /// Replaces name and email. The new email must not belong to another student.
    #[tracing::instrument(skip(self))]
    pub async fn update_profile(&self, cmd: UpdateStudentProfile) -> Result<StudentRow> {
        track("update_student_profile", self.update(cmd).await)
    }

    async fn enroll(&self, cmd: CreateStudent) -> Result<StudentEnrolled> {
        let first_name = PersonName::parse("first name", &cmd.first_name)?;
        let last_name = PersonName::parse("last name", &cmd.last_name)?;
        let email = Email::parse(&cmd.email)?;
        let student_number = StudentNumber::parse(&cmd.student_number)?;

        if self.students.find_by_email(email.as_str()).await?.is_some() {
            return Err(InvariantViolation::DuplicateEmail(email.to_string()).into());
        }
        if self
            .students
            .find_by_student_number(student_number.as_str())
            .await?
            .is_some()
        {
            return Err(
                InvariantViolation::DuplicateStudentNumber(student_number.to_string()).into(),
            );
        }

        let student_id = StudentId::new();
        let mut student = Student::create(
            student_id,
            first_name,
            last_name,
            email.clone(),
            student_number.clone(),
            self.clock.now(),
        );
        self.students.save(&mut student).await?;

        tracing::info!(%student_id, %student_number, "student enrolled");
        Ok(StudentEnrolled {
            student_id,
            full_name: student.full_name(),
            email: email.to_string(),
            student_number: student_number.to_string(),
            status: student.status(),
            created_at: student.created_at(),
        })
    }

    async fn change_status(
        &self,
        student_id: StudentId,
        status: StudentStatus,
    ) -> Result<StudentRow> {
        let mut student = self.load(student_id).await?;
        student.change_status(status, self.clock.now())?;
        self.students.save(&mut student).await?;
        self.student(student_id).await
    }

    async fn update(&self, cmd: UpdateStudentProfile) -> Result<StudentRow> {
        let first_name = PersonName::parse("first name", &cmd.first_name)?;
        let last_name = PersonName::parse("last name", &cmd.last_name)?;
        let email = Email::parse(&cmd.email)?;

        let mut student = self.load(cmd.student_id).await?;

        if let Some(owner) = self.students.view().find_by_email(email.as_str()).await
            && owner.student_id != cmd.student_id
        {
            return Err(InvariantViolation::DuplicateEmail(email.to_string()).into());
        }

        student.update_profile(first_name, last_name, email, self.clock.now())?;
        self.students.save(&mut student).await?;
        self.student(cmd.student_id).await
    }

    async fn load(&self, student_id: StudentId) -> Result<Student> {
        self.students
            .get_by_id(student_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Student", student_id))
    }
}

// Queries, served from the student read model
impl<S: EventStore> StudentService<S> {
    pub async fn student(&self, student_id: StudentId) -> Result<StudentRow> {
        self.students
            .view()
            .get(student_id)
            .await
            .ok_or_else(|| ApplicationError::not_found("Student", student_id))
    }

    pub async fn students(&self) -> Vec<StudentRow> {
        self.students.view().all().await
    }

    pub async fn active_students(&self) -> Vec<StudentRow> {
        self.students.view().active().await
    }

    pub async fn search_students(&self, term: &str) -> Vec<StudentRow> {
        self.students.view().search(term).await
    }
}
