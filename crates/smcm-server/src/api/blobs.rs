//! Signed blob reads. This is the only route that serves stored bytes, and
//! it serves nothing without a valid, unexpired signature over the exact key.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension,
};
use serde::Deserialize;

use smcm_storage::{SignatureError, StorageError};

use crate::api::{ApiError, AppState, Path, Query};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct BlobQuery {
    pub exp: i64,
    pub sig: String,
}

pub(super) async fn serve_blob(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(key): Path<String>,
    Query(query): Query<BlobQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = state.blobs.verify_read(&key, query.exp, &query.sig) {
        let message = match e {
            SignatureError::Expired => "signed URL has expired",
            SignatureError::Invalid => "signature rejected",
        };
        return Err(ApiError::new(req_id.0, "forbidden", message));
    }

    let bytes = match state.blobs.get(&key).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => {
            return Err(ApiError::new(req_id.0, "not_found", "blob not found"));
        }
        Err(StorageError::InvalidKey) => {
            return Err(ApiError::new(req_id.0, "bad_request", "invalid blob key"));
        }
        Err(e) => {
            tracing::error!(error = %e, key, "blob read failed");
            return Err(ApiError::new(req_id.0, "internal_error", "blob read failed"));
        }
    };

    let content_type = mime_guess::from_path(&key).first_or_octet_stream();
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            // Signed URLs are time-boxed; don't let caches outlive them.
            (header::CACHE_CONTROL, "private, max-age=60".to_string()),
        ],
        bytes,
    ))
}
