//! Pipeline command handler: validate -> score -> trends.
//!
//! Called from `main` after the database pool and config are established.
//! Per-signal failures are logged and skipped rather than propagated so a
//! single bad signal does not abort the full run; only structurally invalid
//! weights refuse a run up front.

use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use sqlx::PgPool;
use vpgd_core::{
    AppConfig, CorroborationThresholds, EngineThresholds, SignalStatus, SignalType, UnitsFile,
};
use vpgd_db::{DbError, NewAnalysis, NewCorroboration, NewTrendSnapshot, SignalRow};
use vpgd_engine::{
    classify, classify_signal_type, composite_score, default_dimensions, distinct_source_count,
    find_corroboration, flags_manual_review, match_business_units, validate_weights,
    DimensionScores, KeywordOverlap, SignalDoc,
};
use vpgd_trends::{aggregate, ScoredSignalFact, WeekOf};

/// Run the full pipeline once: validate new signals, score validated ones,
/// then refresh this week's trend snapshots.
///
/// When `dry_run` is `true` the function prints what would be processed and
/// returns without touching the database.
///
/// # Errors
///
/// Returns an error if the config files cannot be loaded, the weights are
/// structurally invalid, or the pipeline run bookkeeping fails. Per-signal
/// failures are logged and skipped, not propagated.
pub(crate) async fn run_pipeline(
    pool: &PgPool,
    config: &AppConfig,
    dry_run: bool,
) -> anyhow::Result<()> {
    let units = vpgd_core::load_units(&config.units_path)?;
    let thresholds = vpgd_core::load_thresholds(&config.thresholds_path)?;

    validate_weights(&thresholds.weights)
        .map_err(|e| anyhow::anyhow!("refusing run, invalid weight config: {e}"))?;

    if dry_run {
        let new = vpgd_db::list_signals_by_status(pool, SignalStatus::New)
            .await?
            .len();
        let validated = vpgd_db::list_signals_by_status(pool, SignalStatus::Validated)
            .await?
            .len();
        println!("dry-run: would validate {new} signals and score {validated}");
        return Ok(());
    }

    let run = vpgd_db::create_pipeline_run(pool, "cli").await?;
    vpgd_db::start_pipeline_run(pool, run.id).await?;

    let outcome = async {
        let validated =
            stage_validate(pool, &thresholds, config.corroboration_max_concurrent).await?;
        let scored = stage_score(pool, &units, &thresholds).await?;
        let snapshots = stage_trends(pool, &units).await?;
        Ok::<_, anyhow::Error>((validated, scored, snapshots))
    }
    .await;

    match outcome {
        Ok((validated, scored, snapshots)) => {
            vpgd_db::complete_pipeline_run(pool, run.id, validated, scored).await?;
            println!(
                "validated {validated} signals, scored {scored}, wrote {snapshots} trend snapshots"
            );
            Ok(())
        }
        Err(e) => {
            vpgd_db::fail_pipeline_run(pool, run.id, &e.to_string()).await?;
            Err(e)
        }
    }
}

fn doc_from_row(row: &SignalRow) -> SignalDoc {
    SignalDoc {
        external_id: row.external_id.clone(),
        title: row.title.clone(),
        summary: row.summary.clone(),
        source_name: row.source_name.clone(),
        url: row.url.clone(),
        published_at: row.published_at,
        collected_at: row.collected_at,
    }
}

/// Corroborate and classify every signal in `new`, advancing each to
/// `validated`. Signals run concurrently with bounded parallelism.
async fn stage_validate(
    pool: &PgPool,
    thresholds: &EngineThresholds,
    max_concurrent: usize,
) -> anyhow::Result<i32> {
    let pending = vpgd_db::list_signals_by_status(pool, SignalStatus::New).await?;
    if pending.is_empty() {
        return Ok(0);
    }

    let since = Utc::now() - Duration::days(thresholds.corroboration.lookback_days);
    let recent = vpgd_db::list_recent_signals(pool, since).await?;
    if recent.len() <= 1 {
        tracing::warn!("corroboration pool is empty; signals will classify as unverified");
    }
    let docs: Vec<SignalDoc> = recent.iter().map(doc_from_row).collect();
    let matcher = KeywordOverlap;

    let results: Vec<(i64, anyhow::Result<()>)> = stream::iter(pending.iter())
        .map(|row| {
            let docs = &docs;
            let matcher = &matcher;
            let cfg = &thresholds.corroboration;
            async move { (row.id, validate_one(pool, row, docs, matcher, cfg).await) }
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let mut validated: i32 = 0;
    for (signal_id, result) in results {
        match result {
            Ok(()) => validated = validated.saturating_add(1),
            Err(e) => tracing::warn!(signal_id, error = %e, "skipping signal, validation failed"),
        }
    }
    Ok(validated)
}

async fn validate_one(
    pool: &PgPool,
    row: &SignalRow,
    docs: &[SignalDoc],
    matcher: &KeywordOverlap,
    cfg: &CorroborationThresholds,
) -> anyhow::Result<()> {
    let candidate = doc_from_row(row);
    let corroborations = match find_corroboration(&candidate, docs, matcher, cfg) {
        Ok(matches) => matches,
        Err(e) => {
            // Treated as zero corroborations this run; the signal is still
            // classified and advances, and a later rescore can upgrade it.
            tracing::warn!(signal_id = row.id, error = %e, "similarity backend failed");
            Vec::new()
        }
    };

    for corroboration in &corroborations {
        vpgd_db::upsert_corroboration(
            pool,
            &NewCorroboration {
                signal_id: row.id,
                corroborating_url: &corroboration.url,
                corroborating_source: &corroboration.source_name,
                title: &corroboration.title,
                similarity_score: corroboration.similarity,
                published_at: Some(corroboration.published_at),
            },
        )
        .await?;

        if flags_manual_review(&row.title, &corroboration.title, corroboration.similarity, cfg) {
            tracing::warn!(
                signal_id = row.id,
                url = %corroboration.url,
                "corroborating source disagrees in direction, flagging for review"
            );
            vpgd_db::mark_analysis_needs_review(pool, row.id).await?;
        }
    }

    let sources = distinct_source_count(&row.source_name, &corroborations);
    let level = classify(sources);
    tracing::info!(signal_id = row.id, sources, level = %level, "signal validated");

    vpgd_db::advance_signal_status(pool, row.id, SignalStatus::New).await?;
    Ok(())
}

/// Score every signal in `validated`, advancing each to `scored`.
///
/// Dimension inputs come from the persisted analysis intake when one exists;
/// otherwise the keyword heuristics supply a signal type, business-unit
/// matches, and moderate default dimensions. The direction-conflict check is
/// re-run over the persisted corroborations here because a conflict found at
/// validation time predates the analysis row. A signal whose stored dimensions
/// fail validation is held at `validated` and flagged for review.
async fn stage_score(
    pool: &PgPool,
    units: &UnitsFile,
    thresholds: &EngineThresholds,
) -> anyhow::Result<i32> {
    let pending = vpgd_db::list_signals_by_status(pool, SignalStatus::Validated).await?;
    let active = units.active_units();
    let mut scored: i32 = 0;

    for row in &pending {
        let text = match &row.summary {
            Some(summary) => format!("{} {summary}", row.title),
            None => row.title.clone(),
        };

        let existing = match vpgd_db::get_analysis(pool, row.id).await {
            Ok(analysis) => Some(analysis),
            Err(DbError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        let matches = match_business_units(&text, &active);

        let (signal_type, dims, needs_review) = match &existing {
            Some(analysis) => {
                let signal_type = SignalType::parse(&analysis.signal_type)
                    .unwrap_or_else(|| classify_signal_type(&text));
                let dims = DimensionScores {
                    revenue_impact: analysis.revenue_impact,
                    time_sensitivity: analysis.time_sensitivity,
                    strategic_alignment: analysis.strategic_alignment,
                    competitive_pressure: analysis.competitive_pressure,
                };
                (signal_type, dims, analysis.needs_review)
            }
            None => {
                let signal_type = classify_signal_type(&text);
                let top_relevance = matches.first().map(|m| m.relevance);
                (signal_type, default_dimensions(signal_type, top_relevance), false)
            }
        };

        let corroborations = vpgd_db::list_corroborations(pool, row.id).await?;
        let conflicted = corroborations.iter().any(|c| {
            flags_manual_review(
                &row.title,
                &c.title,
                c.similarity_score,
                &thresholds.corroboration,
            )
        });
        let needs_review = needs_review || conflicted;

        let composite = match composite_score(dims, &thresholds.weights) {
            Ok(composite) => composite,
            Err(e) => {
                tracing::warn!(
                    signal_id = row.id,
                    error = %e,
                    "holding signal at validated for review"
                );
                vpgd_db::mark_analysis_needs_review(pool, row.id).await?;
                continue;
            }
        };

        let corroborating = vpgd_db::distinct_corroborating_sources(pool, row.id, &row.source_name)
            .await?;
        let sources = usize::try_from(corroborating).unwrap_or(0) + 1;
        let level = classify(sources);

        vpgd_db::upsert_analysis(
            pool,
            &NewAnalysis {
                signal_id: row.id,
                signal_type: signal_type.as_str(),
                revenue_impact: dims.revenue_impact,
                time_sensitivity: dims.time_sensitivity,
                strategic_alignment: dims.strategic_alignment,
                competitive_pressure: dims.competitive_pressure,
                composite_score: composite,
                validation_level: level.as_str(),
                source_count: i32::try_from(sources).unwrap_or(i32::MAX),
                needs_review,
                narrative: existing.as_ref().and_then(|a| a.narrative.as_ref()),
            },
        )
        .await?;

        for bu_match in &matches {
            vpgd_db::upsert_business_unit_association(
                pool,
                row.id,
                &bu_match.bu_id,
                bu_match.relevance,
            )
            .await?;
        }

        vpgd_db::advance_signal_status(pool, row.id, SignalStatus::Validated).await?;
        tracing::info!(signal_id = row.id, composite, level = %level, "signal scored");
        scored = scored.saturating_add(1);
    }

    Ok(scored)
}

/// Recompute this ISO week's snapshots from every scored signal collected in
/// it and upsert the results. Returns the number of snapshots written.
async fn stage_trends(pool: &PgPool, units: &UnitsFile) -> anyhow::Result<usize> {
    let week = WeekOf::from_date(Utc::now().date_naive());
    let rows =
        vpgd_db::list_scored_facts_for_week(pool, i32::try_from(week.iso_week)?, week.year).await?;

    let mut facts = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(signal_type) = SignalType::parse(&row.signal_type) else {
            tracing::warn!(
                signal_id = row.signal_id,
                signal_type = %row.signal_type,
                "unknown signal type, excluding from aggregation"
            );
            continue;
        };
        facts.push(ScoredSignalFact {
            signal_id: row.signal_id,
            title: row.title,
            summary: row.summary,
            signal_type,
            composite: row.composite_score,
            bu_ids: row.bu_ids,
        });
    }

    let snapshots = aggregate(&facts, units, week);
    for snapshot in &snapshots {
        vpgd_db::upsert_weekly_snapshot(
            pool,
            &NewTrendSnapshot {
                trend_key: &snapshot.key.key,
                kind: snapshot.key.kind.as_str(),
                label: &snapshot.key.label,
                week_number: i32::try_from(snapshot.week.iso_week)?,
                year: snapshot.week.year,
                signal_count: snapshot.signal_count,
                avg_score: snapshot.avg_score,
            },
        )
        .await?;
    }

    Ok(snapshots.len())
}
