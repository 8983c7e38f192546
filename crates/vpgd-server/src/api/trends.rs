use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use vpgd_db::TrendSnapshotRow;
use vpgd_trends::{
    classify_momentum, is_persistent_for_kind, TrendKey, TrendKind, WeekOf, WeeklySnapshot,
};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_weeks, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct TrendReportData {
    pub week: Option<String>,
    pub trends: Vec<TrendReportItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct TrendReportItem {
    pub key: String,
    pub kind: String,
    pub label: String,
    pub count: i64,
    pub avg_score: f64,
    pub momentum: String,
    pub change_pct: Option<i64>,
    pub first_seen: String,
    pub persistent: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct TrendHistoryItem {
    pub week: String,
    pub signal_count: i64,
    pub avg_score: f64,
}

#[derive(Debug, Deserialize)]
pub(super) struct TrendReportQuery {
    pub week: Option<i32>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TrendHistoryQuery {
    pub key: String,
    pub weeks: Option<i64>,
}

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

/// Weekly trend report: every key with a snapshot in the requested week
/// (default: the latest week with data), each with momentum derived from the
/// key's trailing history. Keys without data that week are simply absent.
pub(super) async fn get_trend_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TrendReportQuery>,
) -> Result<Json<ApiResponse<TrendReportData>>, ApiError> {
    let resolved = match (query.week, query.year) {
        (Some(week), Some(year)) => Some((week, year)),
        _ => vpgd_db::latest_snapshot_week(&state.pool)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?,
    };

    let Some((week_number, year)) = resolved else {
        return Ok(Json(ApiResponse {
            data: TrendReportData {
                week: None,
                trends: Vec::new(),
            },
            meta: ResponseMeta::new(req_id.0),
        }));
    };

    let rows = vpgd_db::list_snapshots_for_week(&state.pool, week_number, year)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut trends = Vec::with_capacity(rows.len());
    for row in &rows {
        let Some(current) = snapshot_from_row(row) else {
            tracing::warn!(trend_key = %row.trend_key, kind = %row.kind, "unreadable snapshot row");
            continue;
        };

        let history_rows = vpgd_db::get_trend_history_through(
            &state.pool,
            &row.trend_key,
            week_number,
            year,
            state.thresholds.momentum.history_weeks + 1,
        )
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

        let all: Vec<WeeklySnapshot> = history_rows.iter().filter_map(snapshot_from_row).collect();
        let prior: Vec<WeeklySnapshot> = all
            .iter()
            .filter(|s| matches!(s.week.weeks_until(current.week), Some(d) if d > 0))
            .cloned()
            .collect();

        let momentum = classify_momentum(&current, &prior, &state.thresholds.momentum);
        let first_seen = match vpgd_db::first_snapshot_week(&state.pool, &row.trend_key)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        {
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
            &state.thresholds.persistence,
        );

        trends.push(TrendReportItem {
            key: current.key.key,
            kind: current.key.kind.as_str().to_string(),
            label: current.key.label,
            count: current.signal_count,
            avg_score: current.avg_score,
            momentum: momentum.momentum.as_str().to_string(),
            change_pct: momentum.change_pct,
            first_seen: week_label(first_seen),
            persistent,
        });
    }

    Ok(Json(ApiResponse {
        data: TrendReportData {
            week: Some(format!("{year}-W{week_number:02}")),
            trends,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Snapshot history for one trend key, oldest week first.
pub(super) async fn get_trend_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TrendHistoryQuery>,
) -> Result<Json<ApiResponse<Vec<TrendHistoryItem>>>, ApiError> {
    let rows = vpgd_db::get_trend_history(&state.pool, &query.key, normalize_weeks(query.weeks))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| TrendHistoryItem {
            week: format!("{}-W{:02}", row.year, row.week_number),
            signal_count: row.signal_count,
            avg_score: row.avg_score,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
