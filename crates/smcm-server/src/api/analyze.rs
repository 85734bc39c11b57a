//! Pass-through endpoint for on-demand image analysis.
//!
//! The caller sends base64 image bytes; the upstream result is returned in
//! normalized form without being persisted. Attaching an analysis to a media
//! row is a separate PATCH.

use axum::{extract::State, response::IntoResponse, Extension};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use smcm_core::FieldError;
use smcm_vision::VisionError;

use crate::api::{require_user, ApiError, ApiResponse, AppState, Json, ResponseMeta};
use crate::middleware::{Principal, RequestId};

#[derive(Debug, Deserialize)]
pub(super) struct AnalyzeRequest {
    pub image_base64: String,
}

pub(super) async fn analyze_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_user(&principal, &req_id.0)?;

    let Some(vision) = state.vision.as_ref() else {
        tracing::warn!("analyze requested but no vision endpoint is configured");
        return Err(ApiError::new(
            req_id.0,
            "upstream_error",
            "image analysis is not configured",
        ));
    };

    let image = BASE64.decode(body.image_base64.trim()).map_err(|_| {
        ApiError::validation(
            req_id.0.clone(),
            vec![FieldError::new("image_base64", "must be valid base64")],
        )
    })?;
    if image.is_empty() {
        return Err(ApiError::validation(
            req_id.0,
            vec![FieldError::new("image_base64", "must be non-empty")],
        ));
    }

    let analysis = vision.analyze_image(image).await.map_err(|e| match &e {
        VisionError::UpstreamStatus { status, .. } => {
            tracing::warn!(upstream_status = status, "image analysis rejected upstream");
            ApiError::new(
                req_id.0.clone(),
                "upstream_error",
                format!("image analysis failed with upstream status {status}"),
            )
        }
        other => {
            tracing::error!(error = %other, "image analysis failed");
            ApiError::new(req_id.0.clone(), "upstream_error", "image analysis failed")
        }
    })?;

    Ok(Json(ApiResponse {
        data: analysis,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::testutil::{body_json, principal_header, test_app};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::PgPool;
    use tower::ServiceExt;

    // The vision client itself is covered by its own mock-server tests; here
    // the unconfigured path is what the server owns.
    #[sqlx::test(migrations = "../../migrations")]
    async fn analyze_without_configured_endpoint_is_an_upstream_error(pool: PgPool) {
        let (app, _dir) = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/analyze")
                    .header("content-type", "application/json")
                    .header("x-client-principal", principal_header("u1"))
                    .body(Body::from(r#"{"image_base64":"aGVsbG8="}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "upstream_error");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn analyze_requires_identity(pool: PgPool) {
        let (app, _dir) = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"image_base64":"aGVsbG8="}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
