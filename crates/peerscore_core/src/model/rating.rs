//! Rating record model.
//!
//! # Invariants
//! - A `(rater, target)` pair identifies a rating; writes are upserts.
//! - `timestamp` is Unix epoch milliseconds assigned by storage on write.

use super::individual::validate_username;
use super::ValidationError;
use serde::{Deserialize, Serialize};

/// One score submitted by `rater` for `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub rater: String,
    pub target: String,
    pub score: f64,
    /// Epoch milliseconds of the latest upsert.
    pub timestamp: i64,
}

impl RatingRecord {
    /// Creates a record with a zero timestamp; storage sets the real value.
    pub fn new(rater: impl Into<String>, target: impl Into<String>, score: f64) -> Self {
        Self {
            rater: rater.into(),
            target: target.into(),
            score,
            timestamp: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_rating(&self.rater, &self.target, self.score)
    }
}

/// Checks rater/target identity and the raw score value.
///
/// Role-dependent upper bounds are enforced by the rating service.
pub fn validate_rating(rater: &str, target: &str, score: f64) -> Result<(), ValidationError> {
    validate_username(rater)?;
    validate_username(target)?;
    if rater == target {
        return Err(ValidationError::SelfRating(rater.to_string()));
    }
    if !score.is_finite() || score < 0.0 {
        return Err(ValidationError::InvalidScore(score));
    }
    Ok(())
}
