//! Group model.
//!
//! A group is only a registered name; its members are every individual whose
//! `group` attribute equals that name.

use super::{validate_identifier, ValidationError};
use serde::{Deserialize, Serialize};

/// Group name assigned to individuals that belong to no group.
pub const UNDEFINED_GROUP: &str = "Undefined";

/// Registered group entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Validates the group name before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_group_name(&self.name)
    }
}

/// Checks a group name against identifier rules.
pub fn validate_group_name(name: &str) -> Result<(), ValidationError> {
    validate_identifier("group name", name)
}

/// Returns whether `name` is the placeholder for "no group".
pub fn is_undefined_group(name: &str) -> bool {
    name == UNDEFINED_GROUP
}
