//! Database operations for the `signals` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vpgd_core::SignalStatus;

use crate::DbError;

/// A row from the `signals` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SignalRow {
    pub id: i64,
    pub public_id: Uuid,
    pub external_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub source_id: String,
    pub source_name: String,
    pub source_tier: i16,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewSignal<'a> {
    pub external_id: &'a str,
    pub title: &'a str,
    pub summary: Option<&'a str>,
    pub source_id: &'a str,
    pub source_name: &'a str,
    pub source_tier: i16,
    pub url: &'a str,
    pub published_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
}

/// Upsert a signal. Returns the internal ID.
///
/// Dedup key: `external_id`. A conflict refreshes the mutable text fields but
/// never touches `status`, so a re-collected article cannot regress a signal
/// already moving through the pipeline.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn upsert_signal(pool: &PgPool, signal: &NewSignal<'_>) -> Result<i64, DbError> {
    let public_id = Uuid::new_v4();

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO signals \
           (public_id, external_id, title, summary, source_id, source_name, \
            source_tier, url, published_at, collected_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (external_id) DO UPDATE SET \
           title = EXCLUDED.title, \
           summary = COALESCE(EXCLUDED.summary, signals.summary), \
           url = EXCLUDED.url, \
           updated_at = NOW() \
         RETURNING id",
    )
    .bind(public_id)
    .bind(signal.external_id)
    .bind(signal.title)
    .bind(signal.summary)
    .bind(signal.source_id)
    .bind(signal.source_name)
    .bind(signal.source_tier)
    .bind(signal.url)
    .bind(signal.published_at)
    .bind(signal.collected_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Fetches a single signal by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_signal(pool: &PgPool, id: i64) -> Result<SignalRow, DbError> {
    let row = sqlx::query_as::<_, SignalRow>(
        "SELECT id, public_id, external_id, title, summary, source_id, source_name, \
                source_tier, url, published_at, collected_at, status, created_at, updated_at \
         FROM signals \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Fetches a single signal by its `external_id` dedup key.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_signal_by_external_id(
    pool: &PgPool,
    external_id: &str,
) -> Result<SignalRow, DbError> {
    let row = sqlx::query_as::<_, SignalRow>(
        "SELECT id, public_id, external_id, title, summary, source_id, source_name, \
                source_tier, url, published_at, collected_at, status, created_at, updated_at \
         FROM signals \
         WHERE external_id = $1",
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns all signals currently in `status`, oldest collected first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_signals_by_status(
    pool: &PgPool,
    status: SignalStatus,
) -> Result<Vec<SignalRow>, DbError> {
    let rows = sqlx::query_as::<_, SignalRow>(
        "SELECT id, public_id, external_id, title, summary, source_id, source_name, \
                source_tier, url, published_at, collected_at, status, created_at, updated_at \
         FROM signals \
         WHERE status = $1 \
         ORDER BY collected_at ASC, id ASC",
    )
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns every signal collected at or after `since`, regardless of status.
///
/// This is the candidate pool for corroboration matching.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_signals(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> Result<Vec<SignalRow>, DbError> {
    let rows = sqlx::query_as::<_, SignalRow>(
        "SELECT id, public_id, external_id, title, summary, source_id, source_name, \
                source_tier, url, published_at, collected_at, status, created_at, updated_at \
         FROM signals \
         WHERE collected_at >= $1 \
         ORDER BY collected_at ASC, id ASC",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Advances a signal from `expected` to the next status in the lifecycle.
///
/// The update is a compare-and-set on `status`, so a signal that already
/// moved (or never reached `expected`) fails with a typed error instead of
/// being silently regressed or double-advanced.
///
/// # Errors
///
/// Returns [`DbError::InvalidSignalTransition`] if the signal is not in
/// `expected`, or [`DbError::Sqlx`] if the update fails.
pub async fn advance_signal_status(
    pool: &PgPool,
    id: i64,
    expected: SignalStatus,
) -> Result<SignalStatus, DbError> {
    let Some(next) = expected.next() else {
        return Err(DbError::InvalidSignalTransition {
            id,
            expected_status: expected.as_str(),
        });
    };

    let result = sqlx::query(
        "UPDATE signals \
         SET status = $1, updated_at = NOW() \
         WHERE id = $2 AND status = $3",
    )
    .bind(next.as_str())
    .bind(id)
    .bind(expected.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSignalTransition {
            id,
            expected_status: expected.as_str(),
        });
    }

    Ok(next)
}
