mod signals;
mod trends;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use vpgd_core::EngineThresholds;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub thresholds: Arc<EngineThresholds>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_weeks(weeks: Option<i64>) -> i64 {
    weeks.unwrap_or(12).clamp(1, 104)
}

pub(super) fn map_db_error(request_id: String, error: &vpgd_db::DbError) -> ApiError {
    match error {
        vpgd_db::DbError::NotFound => ApiError::new(request_id, "not_found", "record not found"),
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/signals/{id}/validation",
            get(signals::get_signal_validation),
        )
        .route("/api/v1/trends/report", get(trends::get_trend_report))
        .route("/api/v1/trends/history", get(trends::get_trend_history))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match vpgd_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::signals::{CorroborationItem, DimensionScoresBody, SignalValidationData};
    use super::trends::{TrendHistoryItem, TrendReportItem};
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use vpgd_db::NewTrendSnapshot;

    fn test_state(pool: sqlx::PgPool) -> AppState {
        AppState {
            pool,
            thresholds: Arc::new(EngineThresholds::default()),
        }
    }

    #[test]
    fn trend_report_item_is_serializable() {
        // Proves the type compiles and serde works, no DB needed.
        let item = TrendReportItem {
            key: "competitor:kistler".to_string(),
            kind: "competitor".to_string(),
            label: "Kistler".to_string(),
            count: 4,
            avg_score: 6.5,
            momentum: "spike".to_string(),
            change_pct: Some(300),
            first_seen: "2025-W10".to_string(),
            persistent: true,
        };
        let json = serde_json::to_string(&item).expect("serialize");
        assert!(json.contains("\"key\":\"competitor:kistler\""));
        assert!(json.contains("\"change_pct\":300"));
    }

    #[test]
    fn trend_history_item_is_serializable() {
        let item = TrendHistoryItem {
            week: "2025-W12".to_string(),
            signal_count: 3,
            avg_score: 7.1,
        };
        let json = serde_json::to_string(&item).expect("serialize");
        assert!(json.contains("\"week\":\"2025-W12\""));
    }

    #[test]
    fn signal_validation_data_serializes_nulls_before_scoring() {
        let data = SignalValidationData {
            signal_id: 7,
            external_id: "ext-7".to_string(),
            title: "headline".to_string(),
            status: "validated".to_string(),
            validation_level: None,
            source_count: None,
            composite_score: None,
            dimension_scores: None::<DimensionScoresBody>,
            needs_review: None,
            corroborations: vec![CorroborationItem {
                url: "https://other.example.com/story".to_string(),
                source: "Industry Daily".to_string(),
                title: "echo".to_string(),
                similarity: 0.7,
                published_at: None,
            }],
        };
        let json = serde_json::to_string(&data).expect("serialize");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert!(parsed["composite_score"].is_null());
        assert_eq!(parsed["corroborations"][0]["source"], "Industry Daily");
    }

    #[test]
    fn normalize_weeks_applies_defaults_and_bounds() {
        assert_eq!(normalize_weeks(None), 12);
        assert_eq!(normalize_weeks(Some(0)), 1);
        assert_eq!(normalize_weeks(Some(1_000)), 104);
        assert_eq!(normalize_weeks(Some(8)), 8);
    }

    #[test]
    fn api_error_not_found_maps_to_404() {
        let response = ApiError::new("req-1", "not_found", "record not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // -------------------------------------------------------------------------
    // Route integration tests (with DB)
    // -------------------------------------------------------------------------

    async fn seed_snapshot(pool: &sqlx::PgPool, week: i32, year: i32, count: i64) {
        vpgd_db::upsert_weekly_snapshot(
            pool,
            &NewTrendSnapshot {
                trend_key: "competitor:kistler",
                kind: "competitor",
                label: "Kistler",
                week_number: week,
                year,
                signal_count: count,
                avg_score: 6.0,
            },
        )
        .await
        .expect("seed snapshot");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_returns_ok(pool: sqlx::PgPool) {
        let app = build_app(test_state(pool), AuthState::open(), RateLimitState::per_minute(120));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["status"].as_str(), Some("ok"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn signal_validation_returns_404_for_unknown_id(pool: sqlx::PgPool) {
        let app = build_app(test_state(pool), AuthState::open(), RateLimitState::per_minute(120));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/signals/424242/validation")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn trend_report_classifies_momentum_from_history(pool: sqlx::PgPool) {
        // Three consecutive weeks ending at week 12: counts 1, 1, 4.
        seed_snapshot(&pool, 10, 2025, 1).await;
        seed_snapshot(&pool, 11, 2025, 1).await;
        seed_snapshot(&pool, 12, 2025, 4).await;

        let app = build_app(test_state(pool), AuthState::open(), RateLimitState::per_minute(120));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/trends/report")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["week"].as_str(), Some("2025-W12"));
        let trend = json["data"]["trends"]
            .as_array()
            .expect("trends array")
            .iter()
            .find(|t| t["key"] == "competitor:kistler")
            .expect("kistler trend present");
        assert_eq!(trend["momentum"].as_str(), Some("spike"));
        assert_eq!(trend["change_pct"].as_i64(), Some(300));
        assert_eq!(trend["first_seen"].as_str(), Some("2025-W10"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn past_week_report_uses_history_at_that_week(pool: sqlx::PgPool) {
        // 15 weeks of data. The most recent 13 snapshots alone would not
        // include week 1, so a report for week 2 must bound its history
        // at the requested week to see the jump from 1 to 4.
        seed_snapshot(&pool, 1, 2025, 1).await;
        seed_snapshot(&pool, 2, 2025, 4).await;
        for week in 3..=15 {
            seed_snapshot(&pool, week, 2025, 2).await;
        }

        let app = build_app(test_state(pool), AuthState::open(), RateLimitState::per_minute(120));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/trends/report?week=2&year=2025")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["week"].as_str(), Some("2025-W02"));
        let trend = json["data"]["trends"]
            .as_array()
            .expect("trends array")
            .iter()
            .find(|t| t["key"] == "competitor:kistler")
            .expect("kistler trend present");
        assert_eq!(trend["count"].as_i64(), Some(4));
        assert_eq!(trend["momentum"].as_str(), Some("spike"));
        assert_eq!(trend["change_pct"].as_i64(), Some(300));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn first_seen_reaches_past_the_history_window(pool: sqlx::PgPool) {
        // More weeks than the 12-week momentum window; first_seen must
        // still resolve to the key's earliest snapshot.
        for week in 1..=15 {
            seed_snapshot(&pool, week, 2025, 2).await;
        }

        let app = build_app(test_state(pool), AuthState::open(), RateLimitState::per_minute(120));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/trends/report")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["week"].as_str(), Some("2025-W15"));
        let trend = json["data"]["trends"]
            .as_array()
            .expect("trends array")
            .iter()
            .find(|t| t["key"] == "competitor:kistler")
            .expect("kistler trend present");
        assert_eq!(trend["first_seen"].as_str(), Some("2025-W01"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn trend_report_is_empty_without_data(pool: sqlx::PgPool) {
        let app = build_app(test_state(pool), AuthState::open(), RateLimitState::per_minute(120));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/trends/report")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert!(json["data"]["week"].is_null());
        assert_eq!(json["data"]["trends"].as_array().map(Vec::len), Some(0));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn trend_history_is_oldest_first(pool: sqlx::PgPool) {
        seed_snapshot(&pool, 11, 2025, 2).await;
        seed_snapshot(&pool, 12, 2025, 5).await;

        let app = build_app(test_state(pool), AuthState::open(), RateLimitState::per_minute(120));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/trends/history?key=competitor:kistler&weeks=12")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let history = json["data"].as_array().expect("data array");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["week"].as_str(), Some("2025-W11"));
        assert_eq!(history[1]["week"].as_str(), Some("2025-W12"));
    }
}
