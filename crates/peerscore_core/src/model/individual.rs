//! Individual (account) domain model.
//!
//! # Responsibility
//! - Define the canonical person record used by ratings and aggregation.
//! - Parse and render the comma-joined role representation used in storage
//!   and bulk transfer files.
//!
//! # Invariants
//! - `username` is stable and unique across all individuals.
//! - `group` is either a registered group name or [`UNDEFINED_GROUP`].
//! - An individual may hold several roles at once.

use super::group::{validate_group_name, UNDEFINED_GROUP};
use super::{validate_identifier, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid username regex"));

/// Role an individual can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Rates students of other groups and is rated.
    Student,
    /// Rates every student on the teacher scale.
    Teacher,
    /// Manages accounts and groups.
    Admin,
}

impl Role {
    /// Stable name used in storage and transfer files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Teacher => "Teacher",
            Self::Admin => "Admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "admin" => Ok(Self::Admin),
            _ => Err(ValidationError::UnknownRole(value.trim().to_string())),
        }
    }
}

/// Ordered set of roles held by one individual.
///
/// Serialized as a comma-joined string, e.g. `"Student,Teacher"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: Role) -> Self {
        self.0.insert(role);
        self
    }

    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// Parses a comma-joined role list. Blank entries are skipped.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let mut roles = Self::new();
        for part in value.split(',') {
            if part.trim().is_empty() {
                continue;
            }
            roles.insert(part.parse()?);
        }
        Ok(roles)
    }
}

impl Display for RoleSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let joined = self.iter().map(Role::as_str).collect::<Vec<_>>().join(",");
        f.write_str(&joined)
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<RoleSet> for String {
    fn from(value: RoleSet) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for RoleSet {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Canonical record for a person taking part in peer evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    /// Stable login identifier.
    pub username: String,
    /// Human-readable name shown in results.
    pub display_name: String,
    /// Group name, or [`UNDEFINED_GROUP`].
    pub group: String,
    pub roles: RoleSet,
}

impl Individual {
    /// Creates an individual record without validating it.
    pub fn new(
        username: impl Into<String>,
        display_name: impl Into<String>,
        group: impl Into<String>,
        roles: RoleSet,
    ) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
            group: group.into(),
            roles,
        }
    }

    /// Creates an individual that belongs to no group.
    pub fn ungrouped(
        username: impl Into<String>,
        display_name: impl Into<String>,
        roles: RoleSet,
    ) -> Self {
        Self::new(username, display_name, UNDEFINED_GROUP, roles)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_student(&self) -> bool {
        self.has_role(Role::Student)
    }

    pub fn is_teacher(&self) -> bool {
        self.has_role(Role::Teacher)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Validates identity and naming rules before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_username(&self.username)?;
        if self.display_name.trim().is_empty() {
            return Err(ValidationError::BlankDisplayName);
        }
        validate_group_name(&self.group)?;
        Ok(())
    }
}

/// Checks a username against identifier and character rules.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    validate_identifier("username", username)?;
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::InvalidUsername(username.to_string()));
    }
    Ok(())
}
