//! Score aggregation.
//!
//! # Responsibility
//! - Blend teacher and student ratings into personal, group and final scores.
//! - Keep the blend rule configurable without changing its default output.
//!
//! # Invariants
//! - Aggregation is pure: no I/O, no errors, no shared state.
//! - Output rows follow the input individuals order; group summaries are
//!   sorted by group name.
//! - Default configuration reproduces the historical scoring rule exactly.

pub mod aggregator;
pub mod config;

pub use aggregator::{aggregate, GroupScore, IndividualScore, ScoreReport};
pub use config::{RoleInference, ScoringConfig, ScoringConfigError, ZeroPolicy};
