// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, types::Json};

use super::{Store, StoreError, StoreResult};
use crate::models::{
    course::{Course, CourseDetail, NewCourse},
    enrollment::{EnrolledCourse, EnrolledStudent, Enrollment, EnrollmentStatus, StudentEnrollment},
    module::{Module, NewModule},
    task::{NewTask, Task},
    user::{NewUser, User},
};

const USER_COLUMNS: &str = "id, name, email, role, enrollment_number, created_at";

const COURSE_COLUMNS: &str = "id, course_code, course_name, description, subject, instructor_id, \
     course_test_questions, is_active, created_at, updated_at";

const MODULE_COLUMNS: &str = "id, course_id, module_name, description, module_order, \
     tasks_per_module, module_test_questions, total_tasks, total_test_questions, is_active, \
     files, created_by, created_at, updated_at";

const TASK_COLUMNS: &str = "id, module_id, task_name, description, problem_statement, constraints, \
     expected_output, sample_input, sample_output, difficulty, points, time_limit, language, \
     test_cases_count, test_cases, created_at, updated_at";

const ENROLLMENT_COLUMNS: &str =
    "id, course_id, student_id, status, enrollment_date, created_at, updated_at";

/// Translates driver errors, singling out uniqueness violations so callers
/// can report them as conflicts.
fn map_db_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::UniqueViolation(db.constraint().unwrap_or("unique").to_string())
        }
        other => StoreError::Database(other),
    }
}

/// Flat join row for a student's enrollments.
#[derive(FromRow)]
struct StudentEnrollmentRow {
    id: i64,
    #[sqlx(try_from = "String")]
    status: EnrollmentStatus,
    enrollment_date: chrono::DateTime<chrono::Utc>,
    created_at: chrono::DateTime<chrono::Utc>,
    course_id: i64,
    course_code: String,
    course_name: String,
    description: Option<String>,
    subject: String,
    is_active: bool,
    instructor_id: i64,
    instructor_name: String,
}

impl From<StudentEnrollmentRow> for StudentEnrollment {
    fn from(row: StudentEnrollmentRow) -> Self {
        StudentEnrollment {
            id: row.id,
            status: row.status,
            enrollment_date: row.enrollment_date,
            created_at: row.created_at,
            course: EnrolledCourse {
                id: row.course_id,
                course_code: row.course_code,
                course_name: row.course_name,
                description: row.description,
                subject: row.subject,
                is_active: row.is_active,
                instructor_id: row.instructor_id,
                instructor_name: row.instructor_name,
            },
        }
    }
}

/// PostgreSQL-backed store. Queries are checked at runtime so the crate
/// builds without a reachable database.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (name, email, role, enrollment_number) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(user.email.trim().to_lowercase())
            .bind(user.role.as_str())
            .bind(&user.enrollment_number)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_course(&self, course: NewCourse) -> StoreResult<Course> {
        let sql = format!(
            r#"
            INSERT INTO courses
            (course_code, course_name, description, subject, instructor_id, course_test_questions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COURSE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Course>(&sql)
            .bind(&course.course_code)
            .bind(&course.course_name)
            .bind(&course.description)
            .bind(&course.subject)
            .bind(course.instructor_id)
            .bind(course.course_test_questions)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn find_course(&self, id: i64) -> StoreResult<Option<Course>> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1");
        Ok(sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_course_detail(&self, id: i64) -> StoreResult<Option<CourseDetail>> {
        let detail = sqlx::query_as::<_, CourseDetail>(
            r#"
            SELECT
                c.id, c.course_code, c.course_name, c.description, c.subject,
                c.instructor_id, c.course_test_questions, c.is_active,
                c.created_at, c.updated_at,
                u.name AS instructor_name
            FROM courses c
            JOIN users u ON u.id = c.instructor_id
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(detail)
    }

    async fn count_course_dependents(&self, course_id: i64) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM modules WHERE course_id = $1)
                + (SELECT COUNT(*) FROM enrollments WHERE course_id = $1)
            "#,
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_instructor_courses(&self, instructor_id: i64) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM courses WHERE instructor_id = $1",
        )
        .bind(instructor_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_distinct_students(&self, instructor_id: i64) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT e.student_id)
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE c.instructor_id = $1
            "#,
        )
        .bind(instructor_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn delete_course(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_module(&self, module: NewModule) -> StoreResult<Module> {
        let sql = format!(
            r#"
            INSERT INTO modules
            (course_id, module_name, description, module_order,
             tasks_per_module, module_test_questions, files, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {MODULE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Module>(&sql)
            .bind(module.course_id)
            .bind(&module.module_name)
            .bind(&module.description)
            .bind(module.module_order)
            .bind(module.tasks_per_module)
            .bind(module.module_test_questions)
            .bind(Json(&module.files))
            .bind(module.created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn find_module(&self, id: i64) -> StoreResult<Option<Module>> {
        let sql = format!("SELECT {MODULE_COLUMNS} FROM modules WHERE id = $1");
        Ok(sqlx::query_as::<_, Module>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_course_modules(&self, course_id: i64) -> StoreResult<Vec<Module>> {
        let sql = format!(
            "SELECT {MODULE_COLUMNS} FROM modules WHERE course_id = $1 \
             ORDER BY module_order ASC, created_at ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, Module>(&sql)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO tasks
            (module_id, task_name, description, problem_statement, constraints,
             expected_output, sample_input, sample_output, difficulty, points,
             time_limit, language, test_cases_count, test_cases)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {TASK_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Task>(&sql)
            .bind(task.module_id)
            .bind(&task.task_name)
            .bind(&task.description)
            .bind(&task.problem_statement)
            .bind(&task.constraints)
            .bind(&task.expected_output)
            .bind(&task.sample_input)
            .bind(&task.sample_output)
            .bind(task.difficulty.as_str())
            .bind(task.points)
            .bind(task.time_limit)
            .bind(&task.language)
            .bind(task.test_cases.len() as i32)
            .bind(Json(&task.test_cases))
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

        sqlx::query(
            "UPDATE modules SET total_tasks = total_tasks + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(task.module_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn list_module_tasks(&self, module_id: i64) -> StoreResult<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE module_id = $1 ORDER BY id ASC");
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(module_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_enrollment(&self, id: i64) -> StoreResult<Option<Enrollment>> {
        let sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1");
        Ok(sqlx::query_as::<_, Enrollment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_enrollment_for(
        &self,
        course_id: i64,
        student_id: i64,
    ) -> StoreResult<Option<Enrollment>> {
        let sql = format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE course_id = $1 AND student_id = $2"
        );
        Ok(sqlx::query_as::<_, Enrollment>(&sql)
            .bind(course_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_enrollment(
        &self,
        course_id: i64,
        student_id: i64,
        status: EnrollmentStatus,
    ) -> StoreResult<Enrollment> {
        let sql = format!(
            "INSERT INTO enrollments (course_id, student_id, status) VALUES ($1, $2, $3) \
             RETURNING {ENROLLMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Enrollment>(&sql)
            .bind(course_id)
            .bind(student_id)
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn transition_enrollment(
        &self,
        id: i64,
        from: &[EnrollmentStatus],
        to: EnrollmentStatus,
    ) -> StoreResult<Option<Enrollment>> {
        let from: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!(
            "UPDATE enrollments SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = ANY($3) RETURNING {ENROLLMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Enrollment>(&sql)
            .bind(id)
            .bind(to.as_str())
            .bind(from)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_course_enrollments(&self, course_id: i64) -> StoreResult<Vec<EnrolledStudent>> {
        let roster = sqlx::query_as::<_, EnrolledStudent>(
            r#"
            SELECT
                u.id AS student_id, e.id AS enrollment_id,
                u.name, u.email, u.enrollment_number,
                e.status, e.created_at AS enrolled_at
            FROM enrollments e
            JOIN users u ON u.id = e.student_id
            WHERE e.course_id = $1
            ORDER BY e.created_at ASC, e.id ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roster)
    }

    async fn list_student_enrollments(
        &self,
        student_id: i64,
    ) -> StoreResult<Vec<StudentEnrollment>> {
        let rows = sqlx::query_as::<_, StudentEnrollmentRow>(
            r#"
            SELECT
                e.id, e.status, e.enrollment_date, e.created_at,
                c.id AS course_id, c.course_code, c.course_name, c.description,
                c.subject, c.is_active, c.instructor_id,
                u.name AS instructor_name
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            JOIN users u ON u.id = c.instructor_id
            WHERE e.student_id = $1
            ORDER BY e.created_at DESC, e.id DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StudentEnrollment::from).collect())
    }
}
