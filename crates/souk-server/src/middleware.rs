use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Admin API key settings used by middleware.
///
/// Without a salt, configured keys are the bearer tokens themselves. With a
/// salt, each configured key is the lowercase hex SHA-256 of `salt + token`,
/// so plaintext tokens never sit in the environment.
#[derive(Clone)]
pub struct AuthState {
    keys: Arc<Vec<Vec<u8>>>,
    salt: Option<Arc<str>>,
    pub enabled: bool,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("keys", &self.keys.len())
            .field("salted", &self.salt.is_some())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl AuthState {
    /// Builds auth config from `SOUK_API_KEYS` (comma-separated).
    ///
    /// # Errors
    ///
    /// See [`AuthState::from_keys`].
    pub fn from_env(salt: Option<&str>, is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var("SOUK_API_KEYS").unwrap_or_default();
        Self::from_keys(&raw, salt, is_development)
    }

    /// In development, an empty key list disables auth for local iteration.
    /// Elsewhere it fails startup.
    ///
    /// # Errors
    ///
    /// Returns an error when no keys are configured outside development.
    pub fn from_keys(raw: &str, salt: Option<&str>, is_development: bool) -> anyhow::Result<Self> {
        let keys: Vec<Vec<u8>> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|k| {
                if salt.is_some() {
                    k.to_ascii_lowercase().into_bytes()
                } else {
                    k.as_bytes().to_vec()
                }
            })
            .collect();

        if keys.is_empty() {
            if is_development {
                tracing::warn!(
                    "SOUK_API_KEYS not set; bearer auth disabled in development environment"
                );
                return Ok(Self {
                    keys: Arc::new(Vec::new()),
                    salt: None,
                    enabled: false,
                });
            }

            anyhow::bail!(
                "SOUK_API_KEYS is required outside development; \
                 provide comma-separated bearer tokens"
            );
        }

        Ok(Self {
            keys: Arc::new(keys),
            salt: salt.map(Arc::from),
            enabled: true,
        })
    }

    fn allows(&self, token: &str) -> bool {
        let presented = match &self.salt {
            Some(salt) => salted_digest_hex(salt, token).into_bytes(),
            None => token.as_bytes().to_vec(),
        };
        // Compare against every key so timing does not reveal which matched.
        self.keys
            .iter()
            .fold(subtle::Choice::from(0), |acc, key| {
                acc | key.as_slice().ct_eq(presented.as_slice())
            })
            .into()
    }
}

/// Lowercase hex SHA-256 of `salt + token`.
#[must_use]
pub fn salted_digest_hex(salt: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(token.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Request counter for the current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    used: usize,
}

impl Window {
    fn fresh() -> Self {
        Self {
            opened: Instant::now(),
            used: 0,
        }
    }
}

/// Fixed-window limiter shared by every admin request.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    budget: usize,
    period: Duration,
    current: Arc<Mutex<Window>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(budget: usize, period: Duration) -> Self {
        Self {
            budget,
            period,
            current: Arc::new(Mutex::new(Window::fresh())),
        }
    }

    #[must_use]
    pub fn per_minute(budget: usize) -> Self {
        Self::new(budget, Duration::from_secs(60))
    }

    /// Counts one request, or returns `false` when the window is spent.
    async fn admit(&self) -> bool {
        let mut window = self.current.lock().await;
        if window.opened.elapsed() >= self.period {
            *window = Window::fresh();
        }
        if window.used >= self.budget {
            return false;
        }
        window.used += 1;
        true
    }
}

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied request id that is propagated as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Tags each request with an id, reusing a sane caller-supplied
/// `x-request-id` and minting a UUID otherwise. The id is echoed on the
/// response and stored as a [`RequestId`] extension for handlers.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let supplied = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_owned);
    let id = supplied.unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(req).await;
    match HeaderValue::from_str(&id) {
        Ok(value) => {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        Err(_) => tracing::debug!(request_id = %id, "request id is not a valid header value"),
    }
    response
}

/// Rejects admin requests without an accepted bearer token.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    if bearer_token(req.headers().get(AUTHORIZATION)).is_some_and(|token| auth.allows(token)) {
        return next.run(req).await;
    }

    tracing::warn!(path = %req.uri().path(), "admin request refused: bad or missing bearer token");
    ApiError::new(
        request_id_of(&req),
        "unauthorized",
        "missing or invalid bearer token",
    )
    .into_response()
}

/// Answers `429` once the current window's budget is spent.
pub async fn enforce_rate_limit(
    State(limiter): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.admit().await {
        next.run(req).await
    } else {
        tracing::warn!(path = %req.uri().path(), "admin rate limit reached");
        ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded").into_response()
    }
}

/// Token from an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively.
fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    let (scheme, token) = value?.to_str().ok()?.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
