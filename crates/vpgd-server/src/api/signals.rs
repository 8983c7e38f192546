use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SignalValidationData {
    pub signal_id: i64,
    pub external_id: String,
    pub title: String,
    pub status: String,
    pub validation_level: Option<String>,
    pub source_count: Option<i32>,
    pub composite_score: Option<f64>,
    pub dimension_scores: Option<DimensionScoresBody>,
    pub needs_review: Option<bool>,
    pub corroborations: Vec<CorroborationItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct DimensionScoresBody {
    pub revenue_impact: f64,
    pub time_sensitivity: f64,
    pub strategic_alignment: f64,
    pub competitive_pressure: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct CorroborationItem {
    pub url: String,
    pub source: String,
    pub title: String,
    pub similarity: f64,
    pub published_at: Option<DateTime<Utc>>,
}

/// Per-signal validation result: level, source count, corroborations, and
/// scoring. The scoring fields are null until the signal has been scored.
pub(super) async fn get_signal_validation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SignalValidationData>>, ApiError> {
    let signal = vpgd_db::get_signal(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let analysis = match vpgd_db::get_analysis(&state.pool, id).await {
        Ok(analysis) => Some(analysis),
        Err(vpgd_db::DbError::NotFound) => None,
        Err(e) => return Err(map_db_error(req_id.0.clone(), &e)),
    };

    let corroborations = vpgd_db::list_corroborations(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .into_iter()
        .map(|row| CorroborationItem {
            url: row.corroborating_url,
            source: row.corroborating_source,
            title: row.title,
            similarity: row.similarity_score,
            published_at: row.published_at,
        })
        .collect();

    let data = SignalValidationData {
        signal_id: signal.id,
        external_id: signal.external_id,
        title: signal.title,
        status: signal.status,
        validation_level: analysis.as_ref().map(|a| a.validation_level.clone()),
        source_count: analysis.as_ref().map(|a| a.source_count),
        composite_score: analysis.as_ref().map(|a| a.composite_score),
        dimension_scores: analysis.as_ref().map(|a| DimensionScoresBody {
            revenue_impact: a.revenue_impact,
            time_sensitivity: a.time_sensitivity,
            strategic_alignment: a.strategic_alignment,
            competitive_pressure: a.competitive_pressure,
        }),
        needs_review: analysis.as_ref().map(|a| a.needs_review),
        corroborations,
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
