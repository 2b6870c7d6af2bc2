// src/models/task.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EASY" => Ok(Difficulty::Easy),
            "MEDIUM" => Ok(Difficulty::Medium),
            "HARD" => Ok(Difficulty::Hard),
            _ => Err(ParseEnumError {
                kind: "difficulty",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A single judged input/output pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub is_sample: bool,
    /// Display/export position. Always populated on insert.
    pub order_index: i32,
}

/// Represents the 'tasks' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: i64,
    pub module_id: i64,
    pub task_name: String,
    pub description: Option<String>,
    pub problem_statement: String,
    pub constraints: Option<String>,
    pub expected_output: Option<String>,
    pub sample_input: Option<String>,
    pub sample_output: Option<String>,
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    pub points: i32,
    /// Minutes.
    pub time_limit: i32,
    pub language: String,
    pub test_cases_count: i32,
    #[schema(value_type = Vec<TestCase>)]
    pub test_cases: Json<Vec<TestCase>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Test case as submitted; `order_index` falls back to list position.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TestCaseInput {
    #[validate(length(max = 100000))]
    pub input: String,
    #[validate(length(max = 100000))]
    pub expected_output: String,
    #[serde(default)]
    pub is_sample: bool,
    pub order_index: Option<i32>,
}

/// DTO for creating a task. Every accepted field is named here; unknown
/// fields are rejected rather than passed through.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateTaskRequest {
    pub module_id: i64,
    #[validate(length(min = 1, max = 200, message = "Task name must be between 1 and 200 characters."))]
    pub task_name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20000, message = "Problem statement is required."))]
    pub problem_statement: String,
    #[validate(length(max = 5000))]
    pub constraints: Option<String>,
    pub expected_output: Option<String>,
    pub sample_input: Option<String>,
    pub sample_output: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 0, max = 1000))]
    pub points: Option<i32>,
    #[validate(range(min = 1, max = 1440))]
    pub time_limit: Option<i32>,
    #[validate(length(min = 1, max = 50))]
    pub language: Option<String>,
    #[validate(nested)]
    #[serde(default)]
    pub test_cases: Vec<TestCaseInput>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub module_id: i64,
    pub task_name: String,
    pub description: Option<String>,
    pub problem_statement: String,
    pub constraints: Option<String>,
    pub expected_output: Option<String>,
    pub sample_input: Option<String>,
    pub sample_output: Option<String>,
    pub difficulty: Difficulty,
    pub points: i32,
    pub time_limit: i32,
    pub language: String,
    pub test_cases: Vec<TestCase>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(req: CreateTaskRequest) -> Self {
        let test_cases = req
            .test_cases
            .into_iter()
            .enumerate()
            .map(|(position, tc)| TestCase {
                input: tc.input,
                expected_output: tc.expected_output,
                is_sample: tc.is_sample,
                order_index: tc.order_index.unwrap_or(position as i32),
            })
            .collect();

        Self {
            module_id: req.module_id,
            task_name: req.task_name.trim().to_string(),
            description: req.description,
            problem_statement: req.problem_statement,
            constraints: req.constraints,
            expected_output: req.expected_output,
            sample_input: req.sample_input,
            sample_output: req.sample_output,
            difficulty: req.difficulty.unwrap_or_default(),
            points: req.points.unwrap_or(10),
            time_limit: req.time_limit.unwrap_or(30),
            language: req.language.unwrap_or_else(|| "Python".to_string()),
            test_cases,
        }
    }
}

/// Query string for listing a module's tasks.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListParams {
    /// Required; absent is a 400 rather than a rejection.
    pub module_id: Option<i64>,
}
