//! Tunables for the score aggregator.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How a rater is assigned to the teacher or student pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleInference {
    /// Case-insensitive substring match of the rater username against
    /// `teacher_pattern` / `student_pattern`. Compatible with historical data.
    #[default]
    NamePattern,
    /// Look the rater up in the individuals list and use its declared roles.
    /// A rater holding the Student role is always pooled as a student.
    DeclaredRoles,
}

/// How an exact zero component is treated when blending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroPolicy {
    /// A component equal to 0 counts as "no rating" (historical behavior).
    #[default]
    TruthyZero,
    /// Components are present whenever at least one rating exists.
    ExplicitPresence,
}

/// Aggregation settings. `Default` is the historical rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub teacher_pattern: String,
    pub student_pattern: String,
    /// Upper bound of the scale teachers rate on.
    pub teacher_scale_max: f64,
    /// Upper bound of the scale students rate on.
    pub student_scale_max: f64,
    /// Scale both components are normalized to before blending.
    pub target_scale_max: f64,
    /// Weight of the personal score in the final score; the group score
    /// receives `1 - personal_weight`.
    pub personal_weight: f64,
    pub role_inference: RoleInference,
    pub zero_policy: ZeroPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            teacher_pattern: "teacher".to_string(),
            student_pattern: "student".to_string(),
            teacher_scale_max: 15.0,
            student_scale_max: 10.0,
            target_scale_max: 10.0,
            personal_weight: 0.5,
            role_inference: RoleInference::NamePattern,
            zero_policy: ZeroPolicy::TruthyZero,
        }
    }
}

/// Invalid aggregation settings.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringConfigError {
    BlankPattern(&'static str),
    NonPositiveScale { field: &'static str, value: f64 },
    WeightOutOfRange(f64),
}

impl Display for ScoringConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankPattern(field) => write!(f, "scoring.{field} must not be blank"),
            Self::NonPositiveScale { field, value } => {
                write!(f, "scoring.{field} must be a positive number, got {value}")
            }
            Self::WeightOutOfRange(value) => {
                write!(f, "scoring.personal_weight must be within 0..=1, got {value}")
            }
        }
    }
}

impl Error for ScoringConfigError {}

impl ScoringConfig {
    /// Validates patterns, scales and weights.
    pub fn validate(&self) -> Result<(), ScoringConfigError> {
        if self.role_inference == RoleInference::NamePattern {
            if self.teacher_pattern.trim().is_empty() {
                return Err(ScoringConfigError::BlankPattern("teacher_pattern"));
            }
            if self.student_pattern.trim().is_empty() {
                return Err(ScoringConfigError::BlankPattern("student_pattern"));
            }
        }

        for (field, value) in [
            ("teacher_scale_max", self.teacher_scale_max),
            ("student_scale_max", self.student_scale_max),
            ("target_scale_max", self.target_scale_max),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScoringConfigError::NonPositiveScale { field, value });
            }
        }

        if !(0.0..=1.0).contains(&self.personal_weight) {
            return Err(ScoringConfigError::WeightOutOfRange(self.personal_weight));
        }

        Ok(())
    }

    /// Weight applied to the group score.
    pub fn group_weight(&self) -> f64 {
        1.0 - self.personal_weight
    }
}
