//! Request middleware for the read API: request IDs, bearer-token auth,
//! and a shared fixed-window request budget. Auth and limit settings come
//! from [`AppConfig`] rather than ad-hoc env reads.

use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::Mutex;
use uuid::Uuid;
use vpgd_core::{AppConfig, Environment};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID carried through handlers as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer tokens accepted on protected routes.
///
/// An empty token set serves the API open. [`AuthState::from_config`] only
/// permits that in development; everywhere else startup fails instead of
/// silently serving unauthenticated traffic.
#[derive(Debug, Clone)]
pub struct AuthState {
    tokens: Arc<HashSet<String>>,
}

impl AuthState {
    #[must_use]
    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            tokens: Arc::new(keys.into_iter().collect()),
        }
    }

    /// Auth disabled. Development startup and route tests use this.
    #[must_use]
    pub fn open() -> Self {
        Self {
            tokens: Arc::new(HashSet::new()),
        }
    }

    /// Builds auth from `AppConfig::api_keys` (the `VPGD_API_KEYS` env var).
    ///
    /// # Errors
    ///
    /// Fails when no key is configured outside development.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let state = Self::from_keys(config.api_keys.iter().cloned());
        if state.is_open() {
            if config.env != Environment::Development {
                anyhow::bail!(
                    "VPGD_API_KEYS must hold at least one bearer token outside development"
                );
            }
            tracing::warn!("no API keys configured; serving without bearer auth");
        }
        Ok(state)
    }

    fn is_open(&self) -> bool {
        self.tokens.is_empty()
    }

    fn accepts(&self, header: Option<&HeaderValue>) -> bool {
        bearer_token(header).is_some_and(|token| self.tokens.contains(token))
    }
}

struct BudgetWindow {
    opened_at: Instant,
    used: u32,
}

/// Fixed-window request budget shared by every protected route.
#[derive(Clone)]
pub struct RateLimitState {
    budget: u32,
    window: Duration,
    state: Arc<Mutex<BudgetWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(budget: u32, window: Duration) -> Self {
        Self {
            budget,
            window,
            state: Arc::new(Mutex::new(BudgetWindow {
                opened_at: Instant::now(),
                used: 0,
            })),
        }
    }

    #[must_use]
    pub fn per_minute(budget: u32) -> Self {
        Self::new(budget, Duration::from_secs(60))
    }

    /// Builds the limiter from `AppConfig::rate_limit_per_minute`.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::per_minute(config.rate_limit_per_minute)
    }

    async fn try_admit(&self) -> bool {
        let mut window = self.state.lock().await;
        if window.opened_at.elapsed() >= self.window {
            window.opened_at = Instant::now();
            window.used = 0;
        }
        if window.used >= self.budget {
            return false;
        }
        window.used += 1;
        true
    }
}

/// Reuses an incoming `x-request-id` header or generates a `UUIDv4`, exposes
/// it to handlers via [`RequestId`], and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// Rejects requests without a configured bearer token, unless auth is open.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if auth.is_open() || auth.accepts(req.headers().get(AUTHORIZATION)) {
        return next.run(req).await;
    }
    reject(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        "missing or invalid bearer token",
    )
}

/// Rejects requests once the shared window budget is spent.
pub async fn enforce_rate_limit(
    State(limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    if limit.try_admit().await {
        return next.run(req).await;
    }
    reject(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
        "request budget exhausted, retry later",
    )
}

fn bearer_token(header: Option<&HeaderValue>) -> Option<&str> {
    header
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    let body = serde_json::json!({ "error": { "code": code, "message": message } });
    (status, Json(body)).into_response()
}
