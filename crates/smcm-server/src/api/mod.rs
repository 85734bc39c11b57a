mod analyze;
mod blobs;
mod brands;
mod media;
mod templates;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use smcm_core::FieldError;
use smcm_db::{Pagination, SortField, SortOrder};
use smcm_storage::BlobStore;
use smcm_vision::VisionClient;

use crate::middleware::{extract_principal, request_id, Principal, RequestId};

/// Uploads above this size are rejected before the handler runs.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub blobs: BlobStore,
    pub vision: Option<Arc<VisionClient>>,
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
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
                details: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    /// A 422 with per-field failures in `details`.
    pub fn validation(request_id: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            error: ErrorBody {
                code: "validation_error".to_string(),
                message: "request validation failed".to_string(),
                details: Some(details),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthenticated" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" => StatusCode::BAD_REQUEST,
            "validation_error" => StatusCode::UNPROCESSABLE_ENTITY,
            "conflict" => StatusCode::CONFLICT,
            "method_not_allowed" => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Enveloped extractors
// ---------------------------------------------------------------------------
// Axum's built-in rejections answer with plain-text bodies; clients of this
// API always receive the JSON error envelope, so every extractor that can
// reject is wrapped to convert its failure into an `ApiError`.

fn request_id_from(extensions: &axum::http::Extensions) -> String {
    extensions
        .get::<RequestId>()
        .map_or_else(|| "unknown".to_string(), |r| r.0.clone())
}

/// JSON body extractor and response wrapper; malformed bodies become an
/// enveloped `bad_request`.
pub(super) struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = request_id_from(req.extensions());
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(
                request_id,
                "bad_request",
                rejection.body_text(),
            )),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> axum::response::Response {
        axum::Json(self.0).into_response()
    }
}

/// Query-string extractor; undeserializable parameters become an enveloped
/// `bad_request`.
pub(super) struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = request_id_from(&parts.extensions);
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(
                request_id,
                "bad_request",
                rejection.body_text(),
            )),
        }
    }
}

/// Path-segment extractor; an unparsable id becomes an enveloped
/// `bad_request` rather than axum's plain-text 400.
pub(super) struct Path<T>(pub T);

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: serde::de::DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = request_id_from(&parts.extensions);
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(
                request_id,
                "bad_request",
                rejection.body_text(),
            )),
        }
    }
}

/// Resolve the caller's user id or fail with a 401.
pub(super) fn require_user(principal: &Principal, request_id: &str) -> Result<String, ApiError> {
    principal.user_id().map(ToOwned::to_owned).ok_or_else(|| {
        ApiError::new(
            request_id,
            "unauthenticated",
            "a valid identity header is required",
        )
    })
}

/// Load a brand and check the caller owns it.
///
/// A missing brand is a 404; a brand owned by someone else is a 403. A
/// lookup that cannot complete also denies access rather than guessing.
pub(super) async fn resolve_owned_brand(
    pool: &PgPool,
    brand_id: Uuid,
    user_id: &str,
    request_id: &str,
) -> Result<smcm_db::BrandRow, ApiError> {
    let looked_up = match smcm_db::get_brand(pool, brand_id).await {
        Ok(row) => row,
        Err(e) => {
            tracing::error!(error = %e, %brand_id, "brand ownership lookup failed");
            return Err(ApiError::new(request_id, "forbidden", "brand access denied"));
        }
    };
    let Some(brand) = looked_up else {
        return Err(ApiError::new(
            request_id,
            "not_found",
            format!("brand '{brand_id}' not found"),
        ));
    };
    if brand.user_id != user_id {
        return Err(ApiError::new(
            request_id,
            "forbidden",
            "caller does not own this brand",
        ));
    }
    Ok(brand)
}

pub(super) fn map_db_error(request_id: String, error: &smcm_db::DbError) -> ApiError {
    if matches!(error, smcm_db::DbError::NotFound) {
        return ApiError::new(request_id, "not_found", "record not found");
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Query parameters shared by the media and template list endpoints.
#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub brand_id: Uuid,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Turn raw list-query values into clamped pagination, rejecting unknown
/// sort keys instead of silently defaulting them.
pub(super) fn parse_pagination(query: &ListQuery, request_id: &str) -> Result<Pagination, ApiError> {
    let mut errors = Vec::new();

    let sort_field = match query.sort_by.as_deref() {
        None => SortField::default(),
        Some(raw) => SortField::parse(raw).unwrap_or_else(|| {
            errors.push(FieldError::new(
                "sort_by",
                format!("unknown sort field '{raw}'"),
            ));
            SortField::default()
        }),
    };
    let sort_order = match query.sort_order.as_deref() {
        None => SortOrder::default(),
        Some(raw) => SortOrder::parse(raw).unwrap_or_else(|| {
            errors.push(FieldError::new(
                "sort_order",
                format!("must be 'asc' or 'desc', got '{raw}'"),
            ));
            SortOrder::default()
        }),
    };

    if errors.is_empty() {
        Ok(Pagination::new(
            query.limit,
            query.offset,
            sort_field,
            sort_order,
        ))
    } else {
        Err(ApiError::validation(request_id, errors))
    }
}

/// Deserializer for PATCH fields where an absent key (outer `None`) must be
/// told apart from an explicit `null` (`Some(None)`). Pair with
/// `#[serde(default)]` so absent keys stay `None`.
pub(super) fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("x-client-principal"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/blobs/{*key}", get(blobs::serve_blob))
        .route(
            "/api/v1/brands",
            get(brands::list_brands).post(brands::create_brand),
        )
        .route(
            "/api/v1/brands/{id}",
            get(brands::get_brand)
                .patch(brands::update_brand)
                .delete(brands::deactivate_brand),
        )
        .route(
            "/api/v1/media",
            get(media::list_media).post(media::upload_media),
        )
        .route(
            "/api/v1/media/{id}",
            get(media::get_media)
                .patch(media::update_media)
                .delete(media::delete_media),
        )
        .route(
            "/api/v1/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/api/v1/templates/{id}",
            get(templates::get_template)
                .patch(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/api/v1/analyze", post(analyze::analyze_image))
        .method_not_allowed_fallback(method_not_allowed)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(axum::middleware::from_fn(extract_principal)),
        )
        .with_state(state)
}

/// Known route, unregistered method. Axum's default here is an empty body;
/// clients expect the error envelope on every non-2xx response.
async fn method_not_allowed(Extension(req_id): Extension<RequestId>) -> ApiError {
    ApiError::new(
        req_id.0,
        "method_not_allowed",
        "method not allowed for this route",
    )
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match smcm_db::health_check(&state.pool).await {
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
