// src/store/memory.rs

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

use super::{COURSE_CODE_UNIQUE, ENROLLMENT_UNIQUE, Store, StoreError, StoreResult};
use crate::models::{
    course::{Course, CourseDetail, NewCourse},
    enrollment::{EnrolledCourse, EnrolledStudent, Enrollment, EnrollmentStatus, StudentEnrollment},
    module::{Module, NewModule},
    task::{NewTask, Task},
    user::{NewUser, User},
};

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    courses: BTreeMap<i64, Course>,
    modules: BTreeMap<i64, Module>,
    tasks: BTreeMap<i64, Task>,
    enrollments: BTreeMap<i64, Enrollment>,
}

impl Tables {
    /// Ids are shared across tables and strictly increasing, so id order is
    /// creation order.
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn user_name(&self, id: i64) -> StoreResult<&str> {
        self.users
            .get(&id)
            .map(|u| u.name.as_str())
            .ok_or_else(|| StoreError::Corrupt(format!("user {} referenced but missing", id)))
    }
}

/// In-process store with the same constraints as the PostgreSQL schema.
/// Every method takes the lock once, so each call is atomic on its own,
/// while a find followed by an insert is not.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        let email = user.email.trim().to_lowercase();
        if t.users.values().any(|u| u.email == email) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }

        let id = t.next_id();
        let created = User {
            id,
            name: user.name,
            email,
            role: user.role,
            enrollment_number: user.enrollment_number,
            created_at: Utc::now(),
        };
        t.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_course(&self, course: NewCourse) -> StoreResult<Course> {
        let mut t = self.tables.write().await;
        if t.courses.values().any(|c| c.course_code == course.course_code) {
            return Err(StoreError::UniqueViolation(COURSE_CODE_UNIQUE.to_string()));
        }

        let id = t.next_id();
        let now = Utc::now();
        let created = Course {
            id,
            course_code: course.course_code,
            course_name: course.course_name,
            description: course.description,
            subject: course.subject,
            instructor_id: course.instructor_id,
            course_test_questions: course.course_test_questions,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.courses.insert(id, created.clone());
        Ok(created)
    }

    async fn find_course(&self, id: i64) -> StoreResult<Option<Course>> {
        Ok(self.tables.read().await.courses.get(&id).cloned())
    }

    async fn find_course_detail(&self, id: i64) -> StoreResult<Option<CourseDetail>> {
        let t = self.tables.read().await;
        let Some(course) = t.courses.get(&id) else {
            return Ok(None);
        };
        let instructor_name = t.user_name(course.instructor_id)?.to_string();
        Ok(Some(CourseDetail {
            course: course.clone(),
            instructor_name,
        }))
    }

    async fn count_course_dependents(&self, course_id: i64) -> StoreResult<i64> {
        let t = self.tables.read().await;
        let modules = t.modules.values().filter(|m| m.course_id == course_id).count();
        let enrollments = t
            .enrollments
            .values()
            .filter(|e| e.course_id == course_id)
            .count();
        Ok((modules + enrollments) as i64)
    }

    async fn count_instructor_courses(&self, instructor_id: i64) -> StoreResult<i64> {
        let t = self.tables.read().await;
        Ok(t.courses
            .values()
            .filter(|c| c.instructor_id == instructor_id)
            .count() as i64)
    }

    async fn count_distinct_students(&self, instructor_id: i64) -> StoreResult<i64> {
        let t = self.tables.read().await;
        let students: HashSet<i64> = t
            .enrollments
            .values()
            .filter(|e| {
                t.courses
                    .get(&e.course_id)
                    .is_some_and(|c| c.instructor_id == instructor_id)
            })
            .map(|e| e.student_id)
            .collect();
        Ok(students.len() as i64)
    }

    async fn delete_course(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.courses.remove(&id).is_some())
    }

    async fn create_module(&self, module: NewModule) -> StoreResult<Module> {
        let mut t = self.tables.write().await;
        let id = t.next_id();
        let now = Utc::now();
        let created = Module {
            id,
            course_id: module.course_id,
            module_name: module.module_name,
            description: module.description,
            module_order: module.module_order,
            tasks_per_module: module.tasks_per_module,
            module_test_questions: module.module_test_questions,
            total_tasks: 0,
            total_test_questions: 0,
            is_active: true,
            files: Json(module.files),
            created_by: module.created_by,
            created_at: now,
            updated_at: now,
        };
        t.modules.insert(id, created.clone());
        Ok(created)
    }

    async fn find_module(&self, id: i64) -> StoreResult<Option<Module>> {
        Ok(self.tables.read().await.modules.get(&id).cloned())
    }

    async fn list_course_modules(&self, course_id: i64) -> StoreResult<Vec<Module>> {
        let t = self.tables.read().await;
        let mut modules: Vec<Module> = t
            .modules
            .values()
            .filter(|m| m.course_id == course_id)
            .cloned()
            .collect();
        modules.sort_by(|a, b| {
            a.module_order
                .cmp(&b.module_order)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(modules)
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let mut t = self.tables.write().await;
        let id = t.next_id();
        let now = Utc::now();

        let module = t.modules.get_mut(&task.module_id).ok_or_else(|| {
            StoreError::Corrupt(format!("task references missing module {}", task.module_id))
        })?;
        module.total_tasks += 1;
        module.updated_at = now;

        let created = Task {
            id,
            module_id: task.module_id,
            task_name: task.task_name,
            description: task.description,
            problem_statement: task.problem_statement,
            constraints: task.constraints,
            expected_output: task.expected_output,
            sample_input: task.sample_input,
            sample_output: task.sample_output,
            difficulty: task.difficulty,
            points: task.points,
            time_limit: task.time_limit,
            language: task.language,
            test_cases_count: task.test_cases.len() as i32,
            test_cases: Json(task.test_cases),
            created_at: now,
            updated_at: now,
        };
        t.tasks.insert(id, created.clone());
        Ok(created)
    }

    async fn list_module_tasks(&self, module_id: i64) -> StoreResult<Vec<Task>> {
        let t = self.tables.read().await;
        Ok(t.tasks
            .values()
            .filter(|task| task.module_id == module_id)
            .cloned()
            .collect())
    }

    async fn find_enrollment(&self, id: i64) -> StoreResult<Option<Enrollment>> {
        Ok(self.tables.read().await.enrollments.get(&id).cloned())
    }

    async fn find_enrollment_for(
        &self,
        course_id: i64,
        student_id: i64,
    ) -> StoreResult<Option<Enrollment>> {
        let t = self.tables.read().await;
        Ok(t.enrollments
            .values()
            .find(|e| e.course_id == course_id && e.student_id == student_id)
            .cloned())
    }

    async fn insert_enrollment(
        &self,
        course_id: i64,
        student_id: i64,
        status: EnrollmentStatus,
    ) -> StoreResult<Enrollment> {
        let mut t = self.tables.write().await;
        if t.enrollments
            .values()
            .any(|e| e.course_id == course_id && e.student_id == student_id)
        {
            return Err(StoreError::UniqueViolation(ENROLLMENT_UNIQUE.to_string()));
        }

        let id = t.next_id();
        let now = Utc::now();
        let created = Enrollment {
            id,
            course_id,
            student_id,
            status,
            enrollment_date: now,
            created_at: now,
            updated_at: now,
        };
        t.enrollments.insert(id, created.clone());
        Ok(created)
    }

    async fn transition_enrollment(
        &self,
        id: i64,
        from: &[EnrollmentStatus],
        to: EnrollmentStatus,
    ) -> StoreResult<Option<Enrollment>> {
        let mut t = self.tables.write().await;
        let Some(enrollment) = t.enrollments.get_mut(&id) else {
            return Ok(None);
        };
        if !from.contains(&enrollment.status) {
            return Ok(None);
        }

        enrollment.status = to;
        enrollment.updated_at = Utc::now();
        Ok(Some(enrollment.clone()))
    }

    async fn list_course_enrollments(&self, course_id: i64) -> StoreResult<Vec<EnrolledStudent>> {
        let t = self.tables.read().await;
        t.enrollments
            .values()
            .filter(|e| e.course_id == course_id)
            .map(|e| -> StoreResult<EnrolledStudent> {
                let student = t.users.get(&e.student_id).ok_or_else(|| {
                    StoreError::Corrupt(format!("enrollment {} has no student", e.id))
                })?;
                Ok(EnrolledStudent {
                    student_id: student.id,
                    enrollment_id: e.id,
                    name: student.name.clone(),
                    email: student.email.clone(),
                    enrollment_number: student.enrollment_number.clone(),
                    status: e.status,
                    enrolled_at: e.created_at,
                })
            })
            .collect()
    }

    async fn list_student_enrollments(
        &self,
        student_id: i64,
    ) -> StoreResult<Vec<StudentEnrollment>> {
        let t = self.tables.read().await;
        let mut list = Vec::new();
        // Reverse id order is newest first.
        for e in t.enrollments.values().rev().filter(|e| e.student_id == student_id) {
            let course = t.courses.get(&e.course_id).ok_or_else(|| {
                StoreError::Corrupt(format!("enrollment {} has no course", e.id))
            })?;
            list.push(StudentEnrollment {
                id: e.id,
                status: e.status,
                enrollment_date: e.enrollment_date,
                created_at: e.created_at,
                course: EnrolledCourse {
                    id: course.id,
                    course_code: course.course_code.clone(),
                    course_name: course.course_name.clone(),
                    description: course.description.clone(),
                    subject: course.subject.clone(),
                    is_active: course.is_active,
                    instructor_id: course.instructor_id,
                    instructor_name: t.user_name(course.instructor_id)?.to_string(),
                },
            });
        }
        Ok(list)
    }
}
