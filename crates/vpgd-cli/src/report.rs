//! Read-side command handlers: trend report, trend history, and per-signal
//! validation results, printed as JSON.

use serde_json::json;
use sqlx::PgPool;
use vpgd_core::AppConfig;
use vpgd_db::{DbError, TrendSnapshotRow};
use vpgd_trends::{
    classify_momentum, is_persistent_for_kind, TrendKey, TrendKind, WeekOf, WeeklySnapshot,
};

fn snapshot_from_row(row: &TrendSnapshotRow) -> Option<WeeklySnapshot> {
    let kind = TrendKind::parse(&row.kind)?;
    let iso_week = u32::try_from(row.week_number).ok()?;
    Some(WeeklySnapshot {
        key: TrendKey {
            kind,
            key: row.trend_key.clone(),
            label: row.label.clone(),
        },
        week: WeekOf {
            iso_week,
            year: row.year,
        },
        signal_count: row.signal_count,
        avg_score: row.avg_score,
    })
}

fn week_label(week: WeekOf) -> String {
    format!("{}-W{:02}", week.year, week.iso_week)
}

/// Print the weekly trend report for the requested week, or the latest week
/// with data when none is given. Keys with no snapshot that week are simply
/// absent from the output.
///
/// # Errors
///
/// Returns an error if the thresholds file cannot be loaded or a query fails.
pub(crate) async fn run_trends_report(
    pool: &PgPool,
    config: &AppConfig,
    week: Option<u32>,
    year: Option<i32>,
) -> anyhow::Result<()> {
    let thresholds = vpgd_core::load_thresholds(&config.thresholds_path)?;

    let (week_number, year) = match (week, year) {
        (Some(week), Some(year)) => (i32::try_from(week)?, year),
        _ => match vpgd_db::latest_snapshot_week(pool).await? {
            Some(latest) => latest,
            None => {
                println!("no trend data yet");
                return Ok(());
            }
        },
    };

    let rows = vpgd_db::list_snapshots_for_week(pool, week_number, year).await?;
    let mut entries = Vec::with_capacity(rows.len());

    for row in &rows {
        let Some(current) = snapshot_from_row(row) else {
            tracing::warn!(trend_key = %row.trend_key, kind = %row.kind, "unreadable snapshot row");
            continue;
        };

        let history_rows = vpgd_db::get_trend_history_through(
            pool,
            &row.trend_key,
            week_number,
            year,
            thresholds.momentum.history_weeks + 1,
        )
        .await?;
        let all: Vec<WeeklySnapshot> = history_rows.iter().filter_map(snapshot_from_row).collect();
        let prior: Vec<WeeklySnapshot> = all
            .iter()
            .filter(|s| matches!(s.week.weeks_until(current.week), Some(d) if d > 0))
            .cloned()
            .collect();

        let momentum = classify_momentum(&current, &prior, &thresholds.momentum);
        let first_seen = match vpgd_db::first_snapshot_week(pool, &row.trend_key).await? {
            Some((first_week, first_year)) => match u32::try_from(first_week) {
                Ok(iso_week) => WeekOf {
                    iso_week,
                    year: first_year,
                },
                Err(_) => current.week,
            },
            None => current.week,
        };
        let persistent = is_persistent_for_kind(
            current.key.kind,
            &all,
            current.week,
            &thresholds.persistence,
        );

        entries.push(json!({
            "key": current.key.key,
            "type": current.key.kind.as_str(),
            "label": current.key.label,
            "count": current.signal_count,
            "avg_score": current.avg_score,
            "momentum": momentum.momentum.as_str(),
            "change_pct": momentum.change_pct,
            "first_seen": week_label(first_seen),
            "persistent": persistent,
        }));
    }

    let report = json!({
        "week": format!("{year}-W{week_number:02}"),
        "trends": entries,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print up to `weeks` snapshots for one trend key, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn run_trend_history(
    pool: &PgPool,
    key: &str,
    weeks: i64,
) -> anyhow::Result<()> {
    let rows = vpgd_db::get_trend_history(pool, key, weeks).await?;
    let entries: Vec<_> = rows
        .iter()
        .map(|row| {
            json!({
                "week": format!("{}-W{:02}", row.year, row.week_number),
                "signal_count": row.signal_count,
                "avg_score": row.avg_score,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json!({
        "key": key,
        "history": entries,
    }))?);
    Ok(())
}

/// Print the validation result for one signal: level, source count,
/// corroborations, and scoring when present.
///
/// # Errors
///
/// Returns an error if the signal does not exist or a query fails.
pub(crate) async fn run_signal_validation(pool: &PgPool, id: i64) -> anyhow::Result<()> {
    let signal = vpgd_db::get_signal(pool, id).await?;
    let analysis = match vpgd_db::get_analysis(pool, id).await {
        Ok(analysis) => Some(analysis),
        Err(DbError::NotFound) => None,
        Err(e) => return Err(e.into()),
    };
    let corroborations = vpgd_db::list_corroborations(pool, id).await?;

    let result = json!({
        "signal_id": signal.id,
        "external_id": signal.external_id,
        "title": signal.title,
        "status": signal.status,
        "validation_level": analysis.as_ref().map(|a| a.validation_level.clone()),
        "source_count": analysis.as_ref().map(|a| a.source_count),
        "composite_score": analysis.as_ref().map(|a| a.composite_score),
        "dimension_scores": analysis.as_ref().map(|a| json!({
            "revenue_impact": a.revenue_impact,
            "time_sensitivity": a.time_sensitivity,
            "strategic_alignment": a.strategic_alignment,
            "competitive_pressure": a.competitive_pressure,
        })),
        "needs_review": analysis.as_ref().map(|a| a.needs_review),
        "corroborations": corroborations.iter().map(|c| json!({
            "url": c.corroborating_url,
            "source": c.corroborating_source,
            "title": c.title,
            "similarity": c.similarity_score,
            "published_at": c.published_at,
        })).collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
