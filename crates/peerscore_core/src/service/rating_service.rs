//! Rating submission use-case.
//!
//! # Responsibility
//! - Decide who a rater may score and on which scale.
//! - Persist a complete submission atomically.
//!
//! # Invariants
//! - Students rate students outside their own group on the student scale.
//! - Teachers who are not students rate every student on the teacher scale.
//! - Every score lies in `1..=scale_max`; a submission is all-or-nothing.

use crate::model::individual::Individual;
use crate::repo::individual_repo::IndividualRepository;
use crate::repo::rating_repo::RatingRepository;
use crate::repo::RepoError;
use crate::scoring::ScoringConfig;
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Lowest accepted score on any scale.
pub const MIN_SCORE: f64 = 1.0;

/// Errors from rating use-cases.
#[derive(Debug)]
pub enum RatingError {
    RaterNotFound(String),
    /// Rater holds neither the Student nor the Teacher role.
    NotARater(String),
    EmptySubmission,
    IneligibleTarget {
        rater: String,
        target: String,
    },
    ScoreOutOfRange {
        target: String,
        score: f64,
        max: f64,
    },
    Repo(RepoError),
}

impl Display for RatingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RaterNotFound(rater) => write!(f, "rater not found: {rater}"),
            Self::NotARater(rater) => {
                write!(f, "`{rater}` holds neither the Student nor the Teacher role")
            }
            Self::EmptySubmission => write!(f, "submission contains no scores"),
            Self::IneligibleTarget { rater, target } => {
                write!(f, "`{rater}` is not allowed to rate `{target}`")
            }
            Self::ScoreOutOfRange { target, score, max } => write!(
                f,
                "score {score} for `{target}` is outside the allowed range {MIN_SCORE}..={max}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RatingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RatingError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Upper bounds of the two rating scales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingScales {
    pub student_max: f64,
    pub teacher_max: f64,
}

impl From<&ScoringConfig> for RatingScales {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            student_max: config.student_scale_max,
            teacher_max: config.teacher_scale_max,
        }
    }
}

impl Default for RatingScales {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

/// Use-case service for submitting ratings.
pub struct RatingService<I: IndividualRepository, R: RatingRepository> {
    individuals: I,
    ratings: R,
    scales: RatingScales,
}

impl<I: IndividualRepository, R: RatingRepository> RatingService<I, R> {
    pub fn new(individuals: I, ratings: R, scales: RatingScales) -> Self {
        Self {
            individuals,
            ratings,
            scales,
        }
    }

    /// Returns the scale maximum that applies to `rater`.
    pub fn scale_max_for(&self, rater: &Individual) -> Result<f64, RatingError> {
        if rater.is_student() {
            Ok(self.scales.student_max)
        } else if rater.is_teacher() {
            Ok(self.scales.teacher_max)
        } else {
            Err(RatingError::NotARater(rater.username.clone()))
        }
    }

    /// Lists the individuals `rater` may score.
    pub fn eligible_targets(&self, rater: &str) -> Result<Vec<Individual>, RatingError> {
        let rater = self.load_rater(rater)?;
        self.targets_for(&rater)
    }

    /// Validates and stores a whole submission; returns the number saved.
    pub fn submit(&self, rater: &str, scores: &[(String, f64)]) -> Result<usize, RatingError> {
        if scores.is_empty() {
            return Err(RatingError::EmptySubmission);
        }

        let rater = self.load_rater(rater)?;
        let max = self.scale_max_for(&rater)?;
        let eligible: HashSet<String> = self
            .targets_for(&rater)?
            .into_iter()
            .map(|individual| individual.username)
            .collect();

        for (target, score) in scores {
            if !eligible.contains(target) {
                warn!(
                    "event=rating_submit module=rating status=error error_code=ineligible_target"
                );
                return Err(RatingError::IneligibleTarget {
                    rater: rater.username.clone(),
                    target: target.clone(),
                });
            }
            if !score.is_finite() || *score < MIN_SCORE || *score > max {
                return Err(RatingError::ScoreOutOfRange {
                    target: target.clone(),
                    score: *score,
                    max,
                });
            }
        }

        let saved = self.ratings.save_ratings(&rater.username, scores)?;
        info!("event=rating_submit module=rating status=ok count={saved}");
        Ok(saved)
    }

    fn load_rater(&self, username: &str) -> Result<Individual, RatingError> {
        self.individuals
            .get_individual(username.trim())?
            .ok_or_else(|| RatingError::RaterNotFound(username.trim().to_string()))
    }

    fn targets_for(&self, rater: &Individual) -> Result<Vec<Individual>, RatingError> {
        let targets = if rater.is_student() {
            self.individuals.list_students_excluding_group(&rater.group)?
        } else if rater.is_teacher() {
            self.individuals
                .list_individuals()?
                .into_iter()
                .filter(Individual::is_student)
                .collect()
        } else {
            return Err(RatingError::NotARater(rater.username.clone()));
        };

        Ok(targets
            .into_iter()
            .filter(|target| target.username != rater.username)
            .collect())
    }
}
