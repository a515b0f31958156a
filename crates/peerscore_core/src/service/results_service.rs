//! Results use-case: feeds stored data into the aggregator.

use crate::model::rating::RatingRecord;
use crate::repo::individual_repo::IndividualRepository;
use crate::repo::rating_repo::{RatingRepository, TrendPoint};
use crate::repo::RepoResult;
use crate::scoring::{aggregate, ScoreReport, ScoringConfig};
use log::info;
use std::time::Instant;

/// Read-side service for aggregated and per-target views.
pub struct ResultsService<I: IndividualRepository, R: RatingRepository> {
    individuals: I,
    ratings: R,
    config: ScoringConfig,
}

impl<I: IndividualRepository, R: RatingRepository> ResultsService<I, R> {
    pub fn new(individuals: I, ratings: R, config: ScoringConfig) -> Self {
        Self {
            individuals,
            ratings,
            config,
        }
    }

    /// Loads all ratings and individuals and aggregates them.
    pub fn compute(&self) -> RepoResult<ScoreReport> {
        let started_at = Instant::now();
        let ratings = self.ratings.list_ratings()?;
        let individuals = self.individuals.list_individuals()?;
        let report = aggregate(&ratings, &individuals, &self.config);
        info!(
            "event=results_compute module=results status=ok ratings={} individuals={} groups={} duration_ms={}",
            ratings.len(),
            individuals.len(),
            report.groups.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Ratings received by `target`, highest first.
    pub fn rating_details(&self, target: &str) -> RepoResult<Vec<RatingRecord>> {
        self.ratings.list_ratings_for_target(target.trim())
    }

    /// Per-day mean scores per target.
    pub fn daily_trend(&self) -> RepoResult<Vec<TrendPoint>> {
        self.ratings.daily_trend()
    }
}
