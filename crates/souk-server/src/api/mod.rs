mod admin;
mod storefront;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use souk_db::{ConstraintViolation, DbError};

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
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
    /// Structured detail, e.g. every attribute validation issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
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

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
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
                details: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub(super) fn validation(request_id: &str, message: impl Into<String>) -> Self {
        Self::new(request_id, "validation_error", message)
    }

    pub(super) fn not_found(request_id: &str, message: impl Into<String>) -> Self {
        Self::new(request_id, "not_found", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Translate a database error into the API error vocabulary. Unexpected
/// failures are logged here, once.
pub(super) fn map_db_error(request_id: &str, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound => ApiError::not_found(request_id, "resource not found"),
        DbError::Conflict { .. } => ApiError::new(request_id, "conflict", error.to_string()),
        _ => match error.constraint_violation() {
            Some(ConstraintViolation::Unique) => ApiError::new(
                request_id,
                "conflict",
                "a record with the same unique key already exists",
            ),
            Some(ConstraintViolation::ForeignKey) => ApiError::validation(
                request_id,
                "referenced record does not exist or is still in use",
            ),
            Some(ConstraintViolation::Check) => {
                ApiError::validation(request_id, "value violates a data constraint")
            }
            None => {
                tracing::error!(error = %error, request_id, "database query failed");
                ApiError::new(request_id, "internal_error", "database query failed")
            }
        },
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health))
        .route(
            "/api/v1/public/products/{slug}/offers",
            get(storefront::product_offers),
        )
        .route(
            "/api/v1/public/products/{slug}/buy-box",
            get(storefront::product_buy_box),
        )
        .route(
            "/api/v1/public/products/{slug}/attributes",
            get(storefront::product_attributes),
        )
        .route(
            "/api/v1/public/categories/{id}/attributes",
            get(storefront::category_attributes),
        )
        .route(
            "/api/v1/public/store-settings",
            get(storefront::store_settings),
        )
}

fn admin_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/admin/products", post(admin::products::create_product))
        .route(
            "/api/v1/admin/products/{id}",
            patch(admin::products::update_product).delete(admin::trash::delete_product),
        )
        .route(
            "/api/v1/admin/products/{id}/attribute-values",
            put(admin::products::replace_attribute_values),
        )
        .route(
            "/api/v1/admin/products/{id}/variants",
            post(admin::products::create_variant),
        )
        .route("/api/v1/admin/offers", post(admin::offers::create_offer))
        .route(
            "/api/v1/admin/offers/{id}",
            patch(admin::offers::update_offer).delete(admin::trash::delete_offer),
        )
        .route(
            "/api/v1/admin/offers/{id}/status",
            put(admin::offers::moderate_offer),
        )
        .route(
            "/api/v1/admin/categories",
            post(admin::catalog::create_category),
        )
        .route(
            "/api/v1/admin/attribute-sets",
            post(admin::catalog::create_attribute_set),
        )
        .route("/api/v1/admin/trash/{entity}", get(admin::trash::list_trash))
        .route(
            "/api/v1/admin/trash/{entity}/{id}",
            delete(admin::trash::hard_delete),
        )
        .route(
            "/api/v1/admin/trash/{entity}/{id}/restore",
            post(admin::trash::restore),
        )
        .route("/api/v1/admin/{entity}/{id}", delete(admin::trash::soft_delete))
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
    Router::new()
        .merge(public_router())
        .merge(admin_router(auth, rate_limit))
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
    let (status, data) = match souk_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            HealthData {
                status: "ok",
                database: "ok",
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, "database unreachable from health route");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthData {
                    status: "degraded",
                    database: "unavailable",
                },
            )
        }
    };
    (status, Json(ApiResponse::new(data, req_id.0)))
}

#[cfg(test)]
mod tests;
