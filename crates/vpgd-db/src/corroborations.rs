//! Database operations for the `signal_corroborations` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `signal_corroborations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CorroborationRow {
    pub id: i64,
    pub signal_id: i64,
    pub corroborating_url: String,
    pub corroborating_source: String,
    pub title: String,
    pub similarity_score: f64,
    pub published_at: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
}

pub struct NewCorroboration<'a> {
    pub signal_id: i64,
    pub corroborating_url: &'a str,
    pub corroborating_source: &'a str,
    pub title: &'a str,
    pub similarity_score: f64,
    pub published_at: Option<DateTime<Utc>>,
}

/// Upsert a corroboration record. Returns the internal ID.
///
/// Dedup key: (`signal_id`, `corroborating_url`), so a retried validation run
/// refreshes the similarity score in place instead of duplicating the match.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn upsert_corroboration(
    pool: &PgPool,
    record: &NewCorroboration<'_>,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO signal_corroborations \
           (signal_id, corroborating_url, corroborating_source, title, \
            similarity_score, published_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (signal_id, corroborating_url) DO UPDATE SET \
           similarity_score = EXCLUDED.similarity_score, \
           title = EXCLUDED.title \
         RETURNING id",
    )
    .bind(record.signal_id)
    .bind(record.corroborating_url)
    .bind(record.corroborating_source)
    .bind(record.title)
    .bind(record.similarity_score)
    .bind(record.published_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns all corroborations for a signal, strongest similarity first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_corroborations(
    pool: &PgPool,
    signal_id: i64,
) -> Result<Vec<CorroborationRow>, DbError> {
    let rows = sqlx::query_as::<_, CorroborationRow>(
        "SELECT id, signal_id, corroborating_url, corroborating_source, title, \
                similarity_score, published_at, discovered_at \
         FROM signal_corroborations \
         WHERE signal_id = $1 \
         ORDER BY similarity_score DESC, published_at ASC NULLS LAST, id ASC",
    )
    .bind(signal_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Counts distinct corroborating publishers for a signal, excluding the
/// signal's own publisher (case-insensitive).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn distinct_corroborating_sources(
    pool: &PgPool,
    signal_id: i64,
    primary_source: &str,
) -> Result<i64, DbError> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(DISTINCT LOWER(corroborating_source)) \
         FROM signal_corroborations \
         WHERE signal_id = $1 AND LOWER(corroborating_source) <> LOWER($2)",
    )
    .bind(signal_id)
    .bind(primary_source)
    .fetch_one(pool)
    .await?)
}
