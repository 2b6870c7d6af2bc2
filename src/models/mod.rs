// src/models/mod.rs

pub mod course;
pub mod enrollment;
pub mod module;
pub mod task;
pub mod user;

/// Raised when a stored or submitted enum label is not one of the known values.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}
