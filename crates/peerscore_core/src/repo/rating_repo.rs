//! Rating repository.
//!
//! # Responsibility
//! - Upsert ratings keyed by `(rater, target)`.
//! - Provide the read models used by aggregation and rating views.
//!
//! # Invariants
//! - At most one row exists per `(rater, target)`; a new write replaces the
//!   score and refreshes `timestamp`, unless the caller supplies one.
//! - `save_ratings` writes a whole submission in one transaction.

use super::RepoResult;
use crate::model::rating::{validate_rating, RatingRecord};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

const RATING_SELECT_SQL: &str = "SELECT
    rater,
    target,
    score,
    timestamp
FROM scores";

const UPSERT_SQL: &str = "INSERT INTO scores (rater, target, score, timestamp)
    VALUES (?1, ?2, ?3, COALESCE(?4, strftime('%s', 'now') * 1000))
    ON CONFLICT (rater, target) DO UPDATE SET
        score = excluded.score,
        timestamp = excluded.timestamp;";

/// Mean score one target received on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// `YYYY-MM-DD`.
    pub day: String,
    pub target: String,
    pub mean_score: f64,
    pub rating_count: u32,
}

/// Repository interface for rating persistence.
pub trait RatingRepository {
    fn upsert_rating(&self, rater: &str, target: &str, score: f64) -> RepoResult<()> {
        self.upsert_rating_at(rater, target, score, None)
    }
    /// Upserts with an explicit epoch-ms `timestamp`; `None` means now.
    fn upsert_rating_at(
        &self,
        rater: &str,
        target: &str,
        score: f64,
        timestamp: Option<i64>,
    ) -> RepoResult<()>;
    /// Upserts every `(target, score)` for `rater` atomically.
    fn save_ratings(&self, rater: &str, scores: &[(String, f64)]) -> RepoResult<usize>;
    /// All ratings ordered by `(rater, target)`.
    fn list_ratings(&self) -> RepoResult<Vec<RatingRecord>>;
    /// Ratings received by `target`, highest score first.
    fn list_ratings_for_target(&self, target: &str) -> RepoResult<Vec<RatingRecord>>;
    /// Per-day, per-target mean scores ordered by `(day, target)`.
    fn daily_trend(&self) -> RepoResult<Vec<TrendPoint>>;
}

/// SQLite-backed rating repository.
pub struct SqliteRatingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRatingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RatingRepository for SqliteRatingRepository<'_> {
    fn upsert_rating_at(
        &self,
        rater: &str,
        target: &str,
        score: f64,
        timestamp: Option<i64>,
    ) -> RepoResult<()> {
        validate_rating(rater, target, score)?;
        self.conn
            .execute(UPSERT_SQL, params![rater, target, score, timestamp])?;
        Ok(())
    }

    fn save_ratings(&self, rater: &str, scores: &[(String, f64)]) -> RepoResult<usize> {
        for (target, score) in scores {
            validate_rating(rater, target, *score)?;
        }

        // Must not be called inside an outer transaction.
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for (target, score) in scores {
                stmt.execute(params![rater, target, score, None::<i64>])?;
            }
        }
        tx.commit()?;
        Ok(scores.len())
    }

    fn list_ratings(&self) -> RepoResult<Vec<RatingRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RATING_SELECT_SQL} ORDER BY rater ASC, target ASC;"))?;
        let ratings = stmt
            .query_map([], parse_rating_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ratings)
    }

    fn list_ratings_for_target(&self, target: &str) -> RepoResult<Vec<RatingRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RATING_SELECT_SQL}
             WHERE target = ?1
             ORDER BY score DESC, rater ASC;"
        ))?;
        let ratings = stmt
            .query_map([target], parse_rating_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ratings)
    }

    fn daily_trend(&self) -> RepoResult<Vec<TrendPoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                date(timestamp / 1000, 'unixepoch') AS day,
                target,
                AVG(score) AS mean_score,
                COUNT(*) AS rating_count
             FROM scores
             GROUP BY day, target
             ORDER BY day ASC, target ASC;",
        )?;
        let points = stmt
            .query_map([], |row| {
                Ok(TrendPoint {
                    day: row.get("day")?,
                    target: row.get("target")?,
                    mean_score: row.get("mean_score")?,
                    rating_count: row.get("rating_count")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(points)
    }
}

fn parse_rating_row(row: &Row<'_>) -> rusqlite::Result<RatingRecord> {
    Ok(RatingRecord {
        rater: row.get("rater")?,
        target: row.get("target")?,
        score: row.get("score")?,
        timestamp: row.get("timestamp")?,
    })
}
