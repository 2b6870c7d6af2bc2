// src/services/mod.rs

pub mod enrollment;
pub mod export;
