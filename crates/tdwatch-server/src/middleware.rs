use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header, header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const MAX_REQUEST_ID_LEN: usize = 128;

/// Request ID stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer-token settings for the read API.
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<Vec<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from `TDWATCH_API_KEYS` (comma-separated bearer tokens).
    ///
    /// Missing keys disable auth in development and fail startup elsewhere.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let keys = parse_keys(&std::env::var("TDWATCH_API_KEYS").unwrap_or_default());
        if !keys.is_empty() {
            return Ok(Self::with_keys(keys));
        }
        if !is_development {
            anyhow::bail!(
                "TDWATCH_API_KEYS is required outside development; \
                 provide comma-separated bearer tokens"
            );
        }
        tracing::warn!("TDWATCH_API_KEYS not set; bearer auth disabled in development environment");
        Ok(Self {
            api_keys: Arc::new(Vec::new()),
            enabled: false,
        })
    }

    /// Auth enabled with exactly these keys.
    #[must_use]
    pub fn with_keys(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            api_keys: Arc::new(keys.into_iter().collect()),
            enabled: true,
        }
    }

    fn allows(&self, token: &str) -> bool {
        // Every key is compared so timing does not reveal which one matched.
        self.api_keys.iter().fold(false, |matched, key| {
            matched | bool::from(key.as_bytes().ct_eq(token.as_bytes()))
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter, one window per client key.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    clients: Arc<Mutex<HashMap<String, RateLimitWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count one request for `client`. `Err` carries the seconds until the
    /// client's window resets.
    async fn check(&self, client: &str) -> Result<(), u64> {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        clients.retain(|_, w| now.duration_since(w.started_at) < self.window);

        let window = clients.entry(client.to_string()).or_insert(RateLimitWindow {
            started_at: now,
            count: 0,
        });
        if window.count >= self.max_requests {
            let remaining = self
                .window
                .saturating_sub(now.duration_since(window.started_at));
            return Err(remaining.as_secs().max(1));
        }
        window.count += 1;
        Ok(())
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Use the caller's `x-request-id` when it is short and printable, otherwise
/// a new `UUIDv4`. Stored as [`RequestId`] and echoed on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => {
            tracing::debug!(
                path = %req.uri().path(),
                "rejected request without a valid bearer token"
            );
            ApiError::new(
                request_id_of(&req),
                "unauthorized",
                "missing or invalid bearer token",
            )
            .into_response()
        }
    }
}

/// Limits each bearer token (or anonymous callers as one client) to
/// `max_requests` per window.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let client = extract_bearer_token(req.headers().get(AUTHORIZATION))
        .unwrap_or("anonymous")
        .to_string();

    match rate_limit.check(&client).await {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            let mut res =
                ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
                    .into_response();
            res.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            res
        }
    }
}

fn parse_keys(raw: &str) -> Vec<String> {
    let mut keys: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
