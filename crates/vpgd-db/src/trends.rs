//! Database operations for the `trend_snapshots` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `trend_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendSnapshotRow {
    pub id: i64,
    pub trend_key: String,
    pub kind: String,
    pub label: String,
    pub week_number: i32,
    pub year: i32,
    pub signal_count: i64,
    pub avg_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewTrendSnapshot<'a> {
    pub trend_key: &'a str,
    pub kind: &'a str,
    pub label: &'a str,
    pub week_number: i32,
    pub year: i32,
    pub signal_count: i64,
    pub avg_score: f64,
}

/// Upsert one weekly snapshot. Returns the internal ID.
///
/// Conflicts on `(trend_key, week_number, year)` overwrite the count and
/// average, so re-running a week's aggregation converges on the same rows.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn upsert_weekly_snapshot(
    pool: &PgPool,
    snapshot: &NewTrendSnapshot<'_>,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO trend_snapshots \
           (trend_key, kind, label, week_number, year, signal_count, avg_score) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (trend_key, week_number, year) DO UPDATE SET \
           label = EXCLUDED.label, \
           signal_count = EXCLUDED.signal_count, \
           avg_score = EXCLUDED.avg_score, \
           updated_at = NOW() \
         RETURNING id",
    )
    .bind(snapshot.trend_key)
    .bind(snapshot.kind)
    .bind(snapshot.label)
    .bind(snapshot.week_number)
    .bind(snapshot.year)
    .bind(snapshot.signal_count)
    .bind(snapshot.avg_score)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns up to `weeks` snapshots for one trend key, oldest week first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_trend_history(
    pool: &PgPool,
    trend_key: &str,
    weeks: i64,
) -> Result<Vec<TrendSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, TrendSnapshotRow>(
        "SELECT id, trend_key, kind, label, week_number, year, signal_count, \
                avg_score, created_at, updated_at \
         FROM ( \
             SELECT * FROM trend_snapshots \
             WHERE trend_key = $1 \
             ORDER BY year DESC, week_number DESC \
             LIMIT $2 \
         ) recent \
         ORDER BY year ASC, week_number ASC",
    )
    .bind(trend_key)
    .bind(weeks)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns up to `weeks` snapshots for one trend key at or before the given
/// `(week_number, year)`, oldest week first.
///
/// Reports for past weeks use this instead of [`get_trend_history`] so that
/// later snapshots cannot crowd the relevant weeks out of the limit.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_trend_history_through(
    pool: &PgPool,
    trend_key: &str,
    week_number: i32,
    year: i32,
    weeks: i64,
) -> Result<Vec<TrendSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, TrendSnapshotRow>(
        "SELECT id, trend_key, kind, label, week_number, year, signal_count, \
                avg_score, created_at, updated_at \
         FROM ( \
             SELECT * FROM trend_snapshots \
             WHERE trend_key = $1 AND (year, week_number) <= ($2, $3) \
             ORDER BY year DESC, week_number DESC \
             LIMIT $4 \
         ) recent \
         ORDER BY year ASC, week_number ASC",
    )
    .bind(trend_key)
    .bind(year)
    .bind(week_number)
    .bind(weeks)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the earliest `(week_number, year)` recorded for a trend key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn first_snapshot_week(
    pool: &PgPool,
    trend_key: &str,
) -> Result<Option<(i32, i32)>, DbError> {
    Ok(sqlx::query_as::<_, (i32, i32)>(
        "SELECT week_number, year FROM trend_snapshots \
         WHERE trend_key = $1 \
         ORDER BY year ASC, week_number ASC \
         LIMIT 1",
    )
    .bind(trend_key)
    .fetch_optional(pool)
    .await?)
}

/// Returns the most recent `(week_number, year)` with any snapshot, if one
/// exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_snapshot_week(pool: &PgPool) -> Result<Option<(i32, i32)>, DbError> {
    Ok(sqlx::query_as::<_, (i32, i32)>(
        "SELECT week_number, year FROM trend_snapshots \
         ORDER BY year DESC, week_number DESC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?)
}

/// Returns every snapshot for one `(week_number, year)`, ordered by key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_snapshots_for_week(
    pool: &PgPool,
    week_number: i32,
    year: i32,
) -> Result<Vec<TrendSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, TrendSnapshotRow>(
        "SELECT id, trend_key, kind, label, week_number, year, signal_count, \
                avg_score, created_at, updated_at \
         FROM trend_snapshots \
         WHERE week_number = $1 AND year = $2 \
         ORDER BY trend_key ASC",
    )
    .bind(week_number)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
