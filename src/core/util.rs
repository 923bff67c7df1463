//! Validation and diagnostic helpers.

pub mod graph_validation;

pub use graph_validation::*;
