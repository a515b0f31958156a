//! Default data for a fresh installation.
//!
//! Seeding is idempotent: existing groups and accounts are left untouched.

use crate::credentials::PasswordDigest;
use crate::model::group::Group;
use crate::model::individual::{Individual, Role, RoleSet};
use crate::repo::group_repo::GroupRepository;
use crate::repo::individual_repo::IndividualRepository;
use crate::repo::{RepoError, RepoResult};
use log::info;

/// Groups created by [`seed_defaults`].
pub const DEFAULT_GROUPS: [&str; 3] = ["Group 1", "Group 2", "Group 3"];
/// Number of seeded student accounts.
pub const DEFAULT_STUDENT_COUNT: usize = 15;

/// Counts of records created by one seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub groups_created: usize,
    pub individuals_created: usize,
}

/// Creates the default groups, `student1..15` (five per group, in order),
/// `admin1` and `teacher1`, all with `initial_password`.
pub fn seed_defaults<I, G>(
    individuals: &I,
    groups: &G,
    initial_password: &str,
) -> RepoResult<SeedSummary>
where
    I: IndividualRepository,
    G: GroupRepository,
{
    let mut summary = SeedSummary::default();

    for name in DEFAULT_GROUPS {
        match groups.create_group(&Group::new(name)) {
            Ok(()) => summary.groups_created += 1,
            Err(RepoError::AlreadyExists { .. }) => {}
            Err(err) => return Err(err),
        }
    }

    let per_group = DEFAULT_STUDENT_COUNT / DEFAULT_GROUPS.len();
    let mut accounts: Vec<Individual> = (1..=DEFAULT_STUDENT_COUNT)
        .map(|index| {
            Individual::new(
                format!("student{index}"),
                format!("Student {index}"),
                DEFAULT_GROUPS[(index - 1) / per_group],
                RoleSet::new().with(Role::Student),
            )
        })
        .collect();
    accounts.push(Individual::ungrouped(
        "admin1",
        "Admin 1",
        RoleSet::new().with(Role::Admin),
    ));
    accounts.push(Individual::ungrouped(
        "teacher1",
        "Teacher 1",
        RoleSet::new().with(Role::Teacher),
    ));

    for individual in &accounts {
        let digest = PasswordDigest::derive(initial_password);
        match individuals.create_individual(individual, &digest) {
            Ok(()) => summary.individuals_created += 1,
            Err(RepoError::AlreadyExists { .. }) => {}
            Err(err) => return Err(err),
        }
    }

    info!(
        "event=seed module=seed status=ok groups_created={} individuals_created={}",
        summary.groups_created, summary.individuals_created
    );
    Ok(summary)
}
