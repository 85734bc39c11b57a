//! Brand CRUD handlers. Every route is scoped to the authenticated caller;
//! reads and writes against someone else's brand fail the ownership guard.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use smcm_core::brands::{validate_name, SocialAccounts};
use smcm_db::BrandRow;

use crate::api::{
    double_option, map_db_error, require_user, resolve_owned_brand, ApiError, ApiResponse,
    AppState, Json, Path, ResponseMeta,
};
use crate::middleware::{Principal, RequestId};

#[derive(Debug, Serialize)]
pub(super) struct BrandItem {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub social_accounts: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BrandRow> for BrandItem {
    fn from(row: BrandRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            social_accounts: row.social_accounts,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateBrandRequest {
    #[serde(alias = "brandName")]
    pub name: String,
    pub description: Option<String>,
    pub social_accounts: Option<SocialAccounts>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct UpdateBrandRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    /// Replaces the stored account map wholesale when supplied.
    pub social_accounts: Option<SocialAccounts>,
}

pub(super) async fn create_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateBrandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;

    let errors = validate_name("name", &body.name);
    if !errors.is_empty() {
        return Err(ApiError::validation(req_id.0, errors));
    }

    let accounts = match &body.social_accounts {
        Some(a) => serde_json::to_value(a)
            .map_err(|e| encode_failure(&req_id.0, "social_accounts", &e))?,
        None => serde_json::json!({}),
    };

    let row = smcm_db::create_brand(
        &state.pool,
        &user_id,
        body.name.trim(),
        body.description.as_deref(),
        &accounts,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: BrandItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn list_brands(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;

    let rows = smcm_db::list_brands_for_user(&state.pool, &user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(BrandItem::from).collect::<Vec<_>>(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;
    let brand = resolve_owned_brand(&state.pool, id, &user_id, &req_id.0).await?;

    Ok(Json(ApiResponse {
        data: BrandItem::from(brand),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn update_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBrandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;
    resolve_owned_brand(&state.pool, id, &user_id, &req_id.0).await?;

    if let Some(name) = &body.name {
        let errors = validate_name("name", name);
        if !errors.is_empty() {
            return Err(ApiError::validation(req_id.0, errors));
        }
    }

    let accounts = match &body.social_accounts {
        Some(a) => Some(
            serde_json::to_value(a)
                .map_err(|e| encode_failure(&req_id.0, "social_accounts", &e))?,
        ),
        None => None,
    };

    let row = smcm_db::update_brand(
        &state.pool,
        id,
        body.name.as_deref().map(str::trim),
        body.description.as_ref().map(|d| d.as_deref()),
        accounts.as_ref(),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: BrandItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn deactivate_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;
    resolve_owned_brand(&state.pool, id, &user_id, &req_id.0).await?;

    smcm_db::deactivate_brand(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deactivated": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn encode_failure(request_id: &str, field: &str, error: &serde_json::Error) -> ApiError {
    tracing::error!(error = %error, field, "request field failed to re-encode");
    ApiError::new(request_id, "internal_error", "request could not be processed")
}

#[cfg(test)]
mod tests {
    use crate::api::testutil::{body_json, principal_header, test_app};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::PgPool;
    use tower::ServiceExt;

    fn post_brand(user: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/brands")
            .header("content-type", "application/json")
            .header("x-client-principal", principal_header(user))
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_brand_returns_201_with_fresh_ids(pool: PgPool) {
        let (app, _dir) = test_app(pool);

        let first = app
            .clone()
            .oneshot(post_brand("u1", r#"{"name":"Acme Soda"}"#))
            .await
            .expect("response");
        assert_eq!(first.status(), StatusCode::CREATED);
        let first = body_json(first).await;
        assert_eq!(first["data"]["name"], "Acme Soda");
        assert_eq!(first["data"]["user_id"], "u1");

        let second = app
            .oneshot(post_brand("u1", r#"{"brandName":"Acme Water"}"#))
            .await
            .expect("response");
        assert_eq!(second.status(), StatusCode::CREATED);
        let second = body_json(second).await;
        assert_ne!(first["data"]["id"], second["data"]["id"]);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_brand_with_blank_name_is_422(pool: PgPool) {
        let (app, _dir) = test_app(pool);
        let response = app
            .oneshot(post_brand("u1", r#"{"name":"   "}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["details"][0]["field"], "name");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_brands_only_returns_the_callers(pool: PgPool) {
        smcm_db::create_brand(&pool, "u1", "Mine", None, &serde_json::json!({}))
            .await
            .expect("seed");
        smcm_db::create_brand(&pool, "u2", "Theirs", None, &serde_json::json!({}))
            .await
            .expect("seed");

        let (app, _dir) = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands")
                    .header("x-client-principal", principal_header("u1"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let names: Vec<&str> = json["data"]
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|b| b["name"].as_str())
            .collect();
        assert_eq!(names, vec!["Mine"]);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn patch_clears_description_with_explicit_null(pool: PgPool) {
        let brand = smcm_db::create_brand(
            &pool,
            "u1",
            "Acme",
            Some("old words"),
            &serde_json::json!({}),
        )
        .await
        .expect("seed");

        let (app, _dir) = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/v1/brands/{}", brand.id))
                    .header("content-type", "application/json")
                    .header("x-client-principal", principal_header("u1"))
                    .body(Body::from(r#"{"description":null}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["data"]["description"].is_null());
        assert_eq!(json["data"]["name"], "Acme");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn deactivated_brand_disappears_from_reads(pool: PgPool) {
        let brand = smcm_db::create_brand(&pool, "u1", "Acme", None, &serde_json::json!({}))
            .await
            .expect("seed");

        let (app, _dir) = test_app(pool);
        let delete = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/brands/{}", brand.id))
                    .header("x-client-principal", principal_header("u1"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(delete.status(), StatusCode::OK);

        let get = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/brands/{}", brand.id))
                    .header("x-client-principal", principal_header("u1"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(get.status(), StatusCode::NOT_FOUND);
    }
}
