//! Account and group administration use-cases.
//!
//! # Responsibility
//! - Register individuals, verify logins and manage passwords.
//! - Maintain the group registry.
//!
//! # Invariants
//! - Passwords are hashed before they reach the repository and never logged.
//! - Login failures do not reveal whether the username exists.
//! - A student always belongs to a registered group.

use crate::credentials::PasswordDigest;
use crate::model::group::{is_undefined_group, validate_group_name, Group, UNDEFINED_GROUP};
use crate::model::individual::{Individual, Role, RoleSet};
use crate::model::ValidationError;
use crate::repo::group_repo::GroupRepository;
use crate::repo::individual_repo::IndividualRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from account and group use-cases.
#[derive(Debug)]
pub enum AccountError {
    Validation(ValidationError),
    UsernameTaken(String),
    GroupTaken(String),
    GroupNotFound(String),
    /// Student registration without a group.
    GroupRequired,
    UserNotFound(String),
    /// Unknown username or wrong password.
    InvalidCredentials,
    EmptyPassword,
    /// New password and its confirmation differ.
    PasswordMismatch,
    Repo(RepoError),
}

impl Display for AccountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UsernameTaken(username) => write!(f, "username already exists: {username}"),
            Self::GroupTaken(group) => write!(f, "group already exists: {group}"),
            Self::GroupNotFound(group) => write!(f, "group not found: {group}"),
            Self::GroupRequired => write!(f, "students must be assigned to a registered group"),
            Self::UserNotFound(username) => write!(f, "user not found: {username}"),
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
            Self::PasswordMismatch => write!(f, "new password and confirmation do not match"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AccountError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for AccountError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Input for [`AccountService::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub username: String,
    pub display_name: String,
    pub roles: RoleSet,
    /// `None` means [`UNDEFINED_GROUP`]; students must provide one.
    pub group: Option<String>,
    pub password: String,
}

/// Use-case service for accounts and groups.
pub struct AccountService<I: IndividualRepository, G: GroupRepository> {
    individuals: I,
    groups: G,
}

impl<I: IndividualRepository, G: GroupRepository> AccountService<I, G> {
    pub fn new(individuals: I, groups: G) -> Self {
        Self {
            individuals,
            groups,
        }
    }

    /// Creates a new account.
    ///
    /// # Contract
    /// - A group other than [`UNDEFINED_GROUP`] must already be registered.
    /// - Students cannot register without a group.
    pub fn register(&self, request: &RegistrationRequest) -> Result<Individual, AccountError> {
        if request.password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }

        let group = request
            .group
            .as_deref()
            .map(str::trim)
            .unwrap_or(UNDEFINED_GROUP);
        if is_undefined_group(group) {
            if request.roles.contains(Role::Student) {
                return Err(AccountError::GroupRequired);
            }
        } else if !self.groups.group_exists(group)? {
            return Err(AccountError::GroupNotFound(group.to_string()));
        }

        let individual = Individual::new(
            request.username.trim(),
            request.display_name.trim(),
            group,
            request.roles.clone(),
        );
        let digest = PasswordDigest::derive(&request.password);

        match self.individuals.create_individual(&individual, &digest) {
            Ok(()) => {
                info!(
                    "event=user_register module=account status=ok roles={} group={}",
                    individual.roles, individual.group
                );
                Ok(individual)
            }
            Err(RepoError::AlreadyExists { key, .. }) => {
                warn!("event=user_register module=account status=error error_code=username_taken");
                Err(AccountError::UsernameTaken(key))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Verifies a login and returns the matching individual.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Individual, AccountError> {
        let username = username.trim();
        let verified = self
            .individuals
            .get_credentials(username)?
            .is_some_and(|stored| stored.digest.verify(password));
        if !verified {
            warn!("event=login module=account status=error error_code=invalid_credentials");
            return Err(AccountError::InvalidCredentials);
        }

        let individual = self
            .individuals
            .get_individual(username)?
            .ok_or(AccountError::InvalidCredentials)?;
        info!("event=login module=account status=ok roles={}", individual.roles);
        Ok(individual)
    }

    /// Changes a password after re-verifying the current one.
    pub fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), AccountError> {
        self.authenticate(username, old_password)?;
        if new_password != confirmation {
            return Err(AccountError::PasswordMismatch);
        }
        self.reset_password(username, new_password)
    }

    /// Sets a new password without checking the old one (administrator path).
    pub fn reset_password(&self, username: &str, new_password: &str) -> Result<(), AccountError> {
        if new_password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }

        let digest = PasswordDigest::derive(new_password);
        match self.individuals.update_password(username.trim(), &digest) {
            Ok(()) => {
                info!("event=password_update module=account status=ok");
                Ok(())
            }
            Err(RepoError::NotFound { key, .. }) => Err(AccountError::UserNotFound(key)),
            Err(err) => Err(err.into()),
        }
    }

    pub fn get_individual(&self, username: &str) -> Result<Option<Individual>, AccountError> {
        Ok(self.individuals.get_individual(username.trim())?)
    }

    pub fn list_individuals(&self) -> Result<Vec<Individual>, AccountError> {
        Ok(self.individuals.list_individuals()?)
    }

    pub fn create_group(&self, name: &str) -> Result<Group, AccountError> {
        let name = name.trim();
        validate_group_name(name)?;
        let group = Group::new(name);
        match self.groups.create_group(&group) {
            Ok(()) => {
                info!("event=group_create module=account status=ok group={name}");
                Ok(group)
            }
            Err(RepoError::AlreadyExists { key, .. }) => Err(AccountError::GroupTaken(key)),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes a group from the registry. Members keep their group attribute.
    pub fn delete_group(&self, name: &str) -> Result<(), AccountError> {
        match self.groups.delete_group(name.trim()) {
            Ok(()) => {
                info!("event=group_delete module=account status=ok group={}", name.trim());
                Ok(())
            }
            Err(RepoError::NotFound { key, .. }) => Err(AccountError::GroupNotFound(key)),
            Err(err) => Err(err.into()),
        }
    }

    pub fn list_groups(&self) -> Result<Vec<Group>, AccountError> {
        Ok(self.groups.list_groups()?)
    }
}
