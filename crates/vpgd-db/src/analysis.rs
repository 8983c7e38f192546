//! Database operations for `signal_analysis` and `signal_business_units`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `signal_analysis` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisRow {
    pub id: i64,
    pub signal_id: i64,
    pub signal_type: String,
    pub revenue_impact: f64,
    pub time_sensitivity: f64,
    pub strategic_alignment: f64,
    pub competitive_pressure: f64,
    pub composite_score: f64,
    pub validation_level: String,
    pub source_count: i32,
    pub needs_review: bool,
    pub narrative: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewAnalysis<'a> {
    pub signal_id: i64,
    pub signal_type: &'a str,
    pub revenue_impact: f64,
    pub time_sensitivity: f64,
    pub strategic_alignment: f64,
    pub competitive_pressure: f64,
    pub composite_score: f64,
    pub validation_level: &'a str,
    pub source_count: i32,
    pub needs_review: bool,
    pub narrative: Option<&'a serde_json::Value>,
}

/// A scored signal joined with its business-unit associations, as consumed
/// by the weekly trend aggregator.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoredFactRow {
    pub signal_id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub signal_type: String,
    pub composite_score: f64,
    pub bu_ids: Vec<String>,
}

/// Upsert the analysis for a signal. Returns the internal ID.
///
/// Analysis is 1:1 with the signal; a conflict on `signal_id` overwrites the
/// previous scoring in full, so a rescored signal carries exactly one record.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn upsert_analysis(pool: &PgPool, analysis: &NewAnalysis<'_>) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO signal_analysis \
           (signal_id, signal_type, revenue_impact, time_sensitivity, \
            strategic_alignment, competitive_pressure, composite_score, \
            validation_level, source_count, needs_review, narrative) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (signal_id) DO UPDATE SET \
           signal_type = EXCLUDED.signal_type, \
           revenue_impact = EXCLUDED.revenue_impact, \
           time_sensitivity = EXCLUDED.time_sensitivity, \
           strategic_alignment = EXCLUDED.strategic_alignment, \
           competitive_pressure = EXCLUDED.competitive_pressure, \
           composite_score = EXCLUDED.composite_score, \
           validation_level = EXCLUDED.validation_level, \
           source_count = EXCLUDED.source_count, \
           needs_review = EXCLUDED.needs_review, \
           narrative = EXCLUDED.narrative, \
           updated_at = NOW() \
         RETURNING id",
    )
    .bind(analysis.signal_id)
    .bind(analysis.signal_type)
    .bind(analysis.revenue_impact)
    .bind(analysis.time_sensitivity)
    .bind(analysis.strategic_alignment)
    .bind(analysis.competitive_pressure)
    .bind(analysis.composite_score)
    .bind(analysis.validation_level)
    .bind(analysis.source_count)
    .bind(analysis.needs_review)
    .bind(analysis.narrative)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Fetches the analysis for a signal.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the signal has no analysis, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_analysis(pool: &PgPool, signal_id: i64) -> Result<AnalysisRow, DbError> {
    let row = sqlx::query_as::<_, AnalysisRow>(
        "SELECT id, signal_id, signal_type, revenue_impact, time_sensitivity, \
                strategic_alignment, competitive_pressure, composite_score, \
                validation_level, source_count, needs_review, narrative, \
                created_at, updated_at \
         FROM signal_analysis \
         WHERE signal_id = $1",
    )
    .bind(signal_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Flags an existing analysis for manual review.
///
/// Missing analysis is not an error; a signal can be flagged before its
/// intake arrives, in which case there is nothing to mark yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_analysis_needs_review(pool: &PgPool, signal_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE signal_analysis \
         SET needs_review = TRUE, updated_at = NOW() \
         WHERE signal_id = $1",
    )
    .bind(signal_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Upsert one business-unit association for a signal.
///
/// Conflicts on `(signal_id, bu_id)` refresh `relevance` in place.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn upsert_business_unit_association(
    pool: &PgPool,
    signal_id: i64,
    bu_id: &str,
    relevance: f64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO signal_business_units (signal_id, bu_id, relevance) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (signal_id, bu_id) DO UPDATE SET \
           relevance = EXCLUDED.relevance",
    )
    .bind(signal_id)
    .bind(bu_id)
    .bind(relevance)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns every scored signal collected during the given ISO week, joined
/// with its business-unit ids (empty array for orphans).
///
/// Signals in `scored` or later statuses all contribute; a re-aggregation of
/// a past week therefore sees the same input set as the original run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scored_facts_for_week(
    pool: &PgPool,
    iso_week: i32,
    year: i32,
) -> Result<Vec<ScoredFactRow>, DbError> {
    let rows = sqlx::query_as::<_, ScoredFactRow>(
        "SELECT s.id AS signal_id, s.title, s.summary, a.signal_type, a.composite_score, \
                COALESCE(ARRAY_AGG(sbu.bu_id ORDER BY sbu.bu_id) \
                         FILTER (WHERE sbu.bu_id IS NOT NULL), '{}') AS bu_ids \
         FROM signals s \
         JOIN signal_analysis a ON a.signal_id = s.id \
         LEFT JOIN signal_business_units sbu ON sbu.signal_id = s.id \
         WHERE s.status IN ('scored', 'published', 'archived') \
           AND EXTRACT(WEEK FROM s.collected_at)::INT = $1 \
           AND EXTRACT(ISOYEAR FROM s.collected_at)::INT = $2 \
         GROUP BY s.id, s.title, s.summary, a.signal_type, a.composite_score \
         ORDER BY s.id",
    )
    .bind(iso_week)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
