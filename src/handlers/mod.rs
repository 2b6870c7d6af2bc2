// src/handlers/mod.rs

pub mod course;
pub mod enrollment;
pub mod module;
pub mod task;
