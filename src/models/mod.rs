// src/models/mod.rs

pub mod asset;
pub mod stats;

// Re-exported so handlers can use crate::models::StructName
pub use asset::*;
pub use stats::*;
