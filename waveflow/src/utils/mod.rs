//! Utility helpers for identifiers and duration serialization.

pub mod durations;
mod ids;

pub use ids::{generate_execution_id, generate_id};
