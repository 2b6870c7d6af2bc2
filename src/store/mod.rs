//! Entity persistence.
//!
//! [`Store`] is the seam between request handling and storage. [`PgStore`]
//! backs the server; [`MemoryStore`] keeps everything in process for
//! embedding and tests. Both enforce the same uniqueness constraints and
//! orderings.

use async_trait::async_trait;

use crate::models::{
    course::{Course, CourseDetail, NewCourse},
    enrollment::{EnrolledStudent, Enrollment, EnrollmentStatus, StudentEnrollment},
    module::{Module, NewModule},
    task::{NewTask, Task},
    user::{NewUser, User},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Name of the uniqueness constraint on (course_id, student_id).
pub const ENROLLMENT_UNIQUE: &str = "uq_enrollments_course_student";
/// Name of the uniqueness constraint on courses.course_code.
pub const COURSE_CODE_UNIQUE: &str = "courses_course_code_key";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A write collided with a uniqueness constraint (named).
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row that could not be mapped back into an entity.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity Store operations used by the enrollment and export flows.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with `UniqueViolation` on a duplicate e-mail.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Fails with `UniqueViolation` on a duplicate course code.
    async fn create_course(&self, course: NewCourse) -> StoreResult<Course>;

    async fn find_course(&self, id: i64) -> StoreResult<Option<Course>>;

    async fn find_course_detail(&self, id: i64) -> StoreResult<Option<CourseDetail>>;

    /// Number of modules plus enrollments referencing the course.
    async fn count_course_dependents(&self, course_id: i64) -> StoreResult<i64>;

    async fn count_instructor_courses(&self, instructor_id: i64) -> StoreResult<i64>;

    /// Distinct students with an enrollment, in any status, in a course
    /// owned by the instructor.
    async fn count_distinct_students(&self, instructor_id: i64) -> StoreResult<i64>;

    /// Returns false if the course did not exist.
    async fn delete_course(&self, id: i64) -> StoreResult<bool>;

    async fn create_module(&self, module: NewModule) -> StoreResult<Module>;

    async fn find_module(&self, id: i64) -> StoreResult<Option<Module>>;

    /// Ascending `module_order`, creation time as tie-break.
    async fn list_course_modules(&self, course_id: i64) -> StoreResult<Vec<Module>>;

    /// Inserts the task and bumps the module's `total_tasks` together.
    async fn create_task(&self, task: NewTask) -> StoreResult<Task>;

    /// Creation order.
    async fn list_module_tasks(&self, module_id: i64) -> StoreResult<Vec<Task>>;

    async fn find_enrollment(&self, id: i64) -> StoreResult<Option<Enrollment>>;

    async fn find_enrollment_for(
        &self,
        course_id: i64,
        student_id: i64,
    ) -> StoreResult<Option<Enrollment>>;

    /// Fails with `UniqueViolation` if the pair already has a record.
    async fn insert_enrollment(
        &self,
        course_id: i64,
        student_id: i64,
        status: EnrollmentStatus,
    ) -> StoreResult<Enrollment>;

    /// Compare-and-set: moves the record to `to` only while its status is
    /// one of `from`. Returns `None` when the record is missing or its status
    /// no longer matches.
    async fn transition_enrollment(
        &self,
        id: i64,
        from: &[EnrollmentStatus],
        to: EnrollmentStatus,
    ) -> StoreResult<Option<Enrollment>>;

    /// Roster in enrollment creation order.
    async fn list_course_enrollments(&self, course_id: i64) -> StoreResult<Vec<EnrolledStudent>>;

    /// Newest first.
    async fn list_student_enrollments(
        &self,
        student_id: i64,
    ) -> StoreResult<Vec<StudentEnrollment>>;
}
