//! Teacher/student score blending.
//!
//! Personal score per target:
//! - teacher component: mean teacher score normalized from the teacher scale
//!   to the target scale;
//! - student component: mean student score normalized the same way;
//! - both present: their mean; one present: that one; none: `0`.
//!
//! Group score is the mean personal score of the group's members, and the
//! final score blends personal and group scores by `personal_weight`.

use super::config::{RoleInference, ScoringConfig, ZeroPolicy};
use crate::model::individual::Individual;
use crate::model::rating::RatingRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Aggregated result for one individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualScore {
    pub username: String,
    pub display_name: String,
    pub group: String,
    /// Normalized mean of teacher ratings, if any were received.
    pub teacher_component: Option<f64>,
    /// Normalized mean of student ratings, if any were received.
    pub student_component: Option<f64>,
    pub personal_score: f64,
    pub group_score: f64,
    pub final_score: f64,
}

/// Aggregated result for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupScore {
    pub group: String,
    pub member_count: usize,
    pub group_score: f64,
}

/// Full aggregation output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// One row per input individual, in input order.
    pub individuals: Vec<IndividualScore>,
    /// One row per distinct group among the individuals, sorted by name.
    pub groups: Vec<GroupScore>,
}

impl ScoreReport {
    /// Looks up one individual's row by username.
    pub fn individual(&self, username: &str) -> Option<&IndividualScore> {
        self.individuals.iter().find(|row| row.username == username)
    }

    /// Returns the group score, or `0` for a group with no members.
    pub fn group_score(&self, group: &str) -> f64 {
        self.groups
            .iter()
            .find(|row| row.group == group)
            .map_or(0.0, |row| row.group_score)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Components {
    teacher: Option<f64>,
    student: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pool {
    Teacher,
    Student,
}

/// Aggregates ratings into per-individual and per-group scores.
///
/// Never fails: ratings from raters that fall into neither pool are ignored,
/// and ratings whose target is not a known individual are tolerated.
pub fn aggregate(
    ratings: &[RatingRecord],
    individuals: &[Individual],
    config: &ScoringConfig,
) -> ScoreReport {
    let components = collect_components(ratings, individuals, config);

    let personal: HashMap<&str, f64> = components
        .iter()
        .map(|(target, parts)| (*target, personal_score(*parts, config.zero_policy)))
        .collect();

    let mut group_means: BTreeMap<&str, Mean> = BTreeMap::new();
    for individual in individuals {
        let score = personal
            .get(individual.username.as_str())
            .copied()
            .unwrap_or(0.0);
        group_means
            .entry(individual.group.as_str())
            .or_default()
            .push(score);
    }

    let groups: Vec<GroupScore> = group_means
        .iter()
        .map(|(group, mean)| GroupScore {
            group: (*group).to_string(),
            member_count: mean.count as usize,
            group_score: mean.value().unwrap_or(0.0),
        })
        .collect();

    let rows = individuals
        .iter()
        .map(|individual| {
            let parts = components
                .get(individual.username.as_str())
                .copied()
                .unwrap_or_default();
            let personal_score = personal
                .get(individual.username.as_str())
                .copied()
                .unwrap_or(0.0);
            let group_score = group_means
                .get(individual.group.as_str())
                .and_then(|mean| mean.value())
                .unwrap_or(0.0);

            IndividualScore {
                username: individual.username.clone(),
                display_name: individual.display_name.clone(),
                group: individual.group.clone(),
                teacher_component: parts.teacher,
                student_component: parts.student,
                personal_score,
                group_score,
                final_score: personal_score * config.personal_weight
                    + group_score * config.group_weight(),
            }
        })
        .collect();

    ScoreReport {
        individuals: rows,
        groups,
    }
}

fn collect_components<'a>(
    ratings: &'a [RatingRecord],
    individuals: &[Individual],
    config: &ScoringConfig,
) -> BTreeMap<&'a str, Components> {
    let declared: HashMap<&str, &Individual> = individuals
        .iter()
        .map(|individual| (individual.username.as_str(), individual))
        .collect();
    let teacher_pattern = config.teacher_pattern.to_lowercase();
    let student_pattern = config.student_pattern.to_lowercase();

    let mut teacher: BTreeMap<&str, Mean> = BTreeMap::new();
    let mut student: BTreeMap<&str, Mean> = BTreeMap::new();

    for rating in ratings {
        let pools = match config.role_inference {
            RoleInference::NamePattern => {
                let rater = rating.rater.to_lowercase();
                [
                    rater.contains(&teacher_pattern).then_some(Pool::Teacher),
                    rater.contains(&student_pattern).then_some(Pool::Student),
                ]
            }
            RoleInference::DeclaredRoles => match declared.get(rating.rater.as_str()) {
                Some(rater) if rater.is_student() => [None, Some(Pool::Student)],
                Some(rater) if rater.is_teacher() => [Some(Pool::Teacher), None],
                _ => [None, None],
            },
        };

        for pool in pools.into_iter().flatten() {
            let means = match pool {
                Pool::Teacher => &mut teacher,
                Pool::Student => &mut student,
            };
            means
                .entry(rating.target.as_str())
                .or_default()
                .push(rating.score);
        }
    }

    let mut components: BTreeMap<&str, Components> = BTreeMap::new();
    for (target, mean) in teacher {
        components.entry(target).or_default().teacher = mean
            .value()
            .map(|value| normalize(value, config.teacher_scale_max, config.target_scale_max));
    }
    for (target, mean) in student {
        components.entry(target).or_default().student = mean
            .value()
            .map(|value| normalize(value, config.student_scale_max, config.target_scale_max));
    }
    components
}

// Multiply first so 9 * 10 / 15 == 6 exactly.
fn normalize(value: f64, from_max: f64, to_max: f64) -> f64 {
    value * to_max / from_max
}

fn personal_score(parts: Components, policy: ZeroPolicy) -> f64 {
    let (teacher, student) = match policy {
        // A component of exactly 0 is indistinguishable from a missing one.
        ZeroPolicy::TruthyZero => (
            parts.teacher.filter(|value| *value != 0.0),
            parts.student.filter(|value| *value != 0.0),
        ),
        ZeroPolicy::ExplicitPresence => (parts.teacher, parts.student),
    };

    match (teacher, student) {
        (Some(teacher), Some(student)) => (teacher + student) / 2.0,
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => 0.0,
    }
}
