//! Domain model for peer evaluation.
//!
//! # Responsibility
//! - Define canonical records for individuals, groups and ratings.
//! - Own the validation rules every write path must honor.
//!
//! # Invariants
//! - Individuals are identified by a stable, unique username.
//! - Group membership is derived from `Individual::group`, never stored
//!   as a separate relation.
//! - At most one active rating exists per `(rater, target)` pair.

pub mod group;
pub mod individual;
pub mod rating;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum accepted length for usernames and group names.
pub const MAX_IDENTIFIER_CHARS: usize = 64;

/// Validation failures raised before any persistence write.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Identifier is blank after trim.
    BlankIdentifier(&'static str),
    /// Identifier exceeds [`MAX_IDENTIFIER_CHARS`].
    IdentifierTooLong { field: &'static str, len: usize },
    /// Username contains characters outside `[A-Za-z0-9_.-]`.
    InvalidUsername(String),
    /// Display name is blank after trim.
    BlankDisplayName,
    /// Role string names an unknown role.
    UnknownRole(String),
    /// Score is NaN, infinite or negative.
    InvalidScore(f64),
    /// Rater and target are the same individual.
    SelfRating(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankIdentifier(field) => write!(f, "{field} must not be blank"),
            Self::IdentifierTooLong { field, len } => write!(
                f,
                "{field} is {len} characters long; maximum is {MAX_IDENTIFIER_CHARS}"
            ),
            Self::InvalidUsername(value) => write!(
                f,
                "invalid username `{value}`; allowed characters are letters, digits, `_`, `.` and `-`"
            ),
            Self::BlankDisplayName => write!(f, "display name must not be blank"),
            Self::UnknownRole(value) => {
                write!(f, "unknown role `{value}`; expected Student|Teacher|Admin")
            }
            Self::InvalidScore(value) => {
                write!(f, "score must be a finite non-negative number, got {value}")
            }
            Self::SelfRating(username) => write!(f, "`{username}` cannot rate themselves"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn validate_identifier(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankIdentifier(field));
    }
    let len = trimmed.chars().count();
    if len > MAX_IDENTIFIER_CHARS {
        return Err(ValidationError::IdentifierTooLong { field, len });
    }
    Ok(())
}
