//! Media handlers: multipart upload, listing, metadata patching, deletion.
//!
//! Uploads are two-phase. The row is inserted as `pending` with its
//! destination blob key already recorded, the bytes go to the blob store,
//! and only then does the row flip to `ready`. If the blob write fails the
//! pending row is left behind for the reconciliation sweep, which reclaims
//! the row and any bytes under its key; it never shows in list responses.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use smcm_core::media::{parse_tags, MediaType};
use smcm_db::MediaRow;
use smcm_storage::BlobStore;

use crate::api::{
    double_option, map_db_error, parse_pagination, require_user, resolve_owned_brand, ApiError,
    ApiResponse, AppState, Json, ListQuery, Path, Query, ResponseMeta,
};
use crate::middleware::{Principal, RequestId};

use smcm_core::FieldError;

#[derive(Debug, Serialize)]
pub(super) struct MediaItem {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub status: String,
    pub media_type: String,
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub description: Option<String>,
    pub tags: serde_json::Value,
    pub analysis: Option<serde_json::Value>,
    pub blob_url: Option<String>,
    /// Time-boxed signed URL, minted fresh per response. Absent until the
    /// upload is confirmed.
    pub download_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn media_item(row: MediaRow, blobs: &BlobStore) -> MediaItem {
    let download_url = row
        .blob_key
        .as_deref()
        .filter(|_| row.status == "ready")
        .map(|key| blobs.signed_read_url(key, None));
    MediaItem {
        id: row.id,
        brand_id: row.brand_id,
        status: row.status,
        media_type: row.media_type,
        name: row.name,
        file_name: row.file_name,
        description: row.description,
        tags: row.tags,
        analysis: row.analysis,
        blob_url: row.blob_url,
        download_url,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct UpdateMediaRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub analysis: Option<serde_json::Value>,
}

/// Parsed form of the upload multipart body.
#[derive(Debug, Default)]
struct UploadForm {
    brand_id: Option<Uuid>,
    name: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Option<Vec<u8>>,
}

async fn read_upload_form(
    mut multipart: Multipart,
    request_id: &str,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    let mut errors = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "multipart read failed");
                return Err(ApiError::new(
                    request_id,
                    "bad_request",
                    "malformed multipart body",
                ));
            }
        };

        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "brand_id" => {
                let text = read_text(field, request_id).await?;
                match Uuid::parse_str(text.trim()) {
                    Ok(id) => form.brand_id = Some(id),
                    Err(_) => errors.push(FieldError::new("brand_id", "must be a UUID")),
                }
            }
            "name" => form.name = Some(read_text(field, request_id).await?),
            "description" => form.description = Some(read_text(field, request_id).await?),
            "tags" => form.tags = parse_tags(&read_text(field, request_id).await?),
            "file" => {
                form.file_name = field.file_name().map(ToOwned::to_owned);
                form.content_type = field.content_type().map(ToOwned::to_owned);
                match field.bytes().await {
                    Ok(bytes) => form.bytes = Some(bytes.to_vec()),
                    Err(e) => {
                        tracing::debug!(error = %e, "multipart file part read failed");
                        return Err(ApiError::new(
                            request_id,
                            "bad_request",
                            "file part could not be read",
                        ));
                    }
                }
            }
            // Unknown parts are ignored rather than rejected.
            _ => {}
        }
    }

    if form.brand_id.is_none() && !errors.iter().any(|e| e.field == "brand_id") {
        errors.push(FieldError::new("brand_id", "is required"));
    }
    match &form.bytes {
        None => errors.push(FieldError::new("file", "is required")),
        Some(bytes) if bytes.is_empty() => {
            errors.push(FieldError::new("file", "must be non-empty"));
        }
        Some(_) => {}
    }
    if errors.is_empty() {
        Ok(form)
    } else {
        Err(ApiError::validation(request_id, errors))
    }
}

async fn read_text(
    field: axum::extract::multipart::Field<'_>,
    request_id: &str,
) -> Result<String, ApiError> {
    field.text().await.map_err(|e| {
        tracing::debug!(error = %e, "multipart text part read failed");
        ApiError::new(request_id, "bad_request", "malformed multipart body")
    })
}

/// Classify the upload from its declared content type, falling back to the
/// file name when the part carries no type.
fn classify(form: &UploadForm) -> Option<MediaType> {
    if let Some(mime) = form.content_type.as_deref() {
        return MediaType::from_mime(mime);
    }
    let file_name = form.file_name.as_deref()?;
    let guessed = mime_guess::from_path(file_name).first()?;
    MediaType::from_mime(guessed.essence_str())
}

pub(super) async fn upload_media(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;
    let form = read_upload_form(multipart, &req_id.0).await?;

    let Some(media_type) = classify(&form) else {
        return Err(ApiError::validation(
            req_id.0,
            vec![FieldError::new("file", "must be an image or video")],
        ));
    };
    // Checked in read_upload_form.
    let (Some(brand_id), Some(bytes)) = (form.brand_id, form.bytes.as_deref()) else {
        return Err(ApiError::new(&req_id.0, "bad_request", "incomplete upload"));
    };

    resolve_owned_brand(&state.pool, brand_id, &user_id, &req_id.0).await?;

    // The key goes on the pending row before any bytes are written so the
    // reconciliation sweep can reclaim a half-finished upload's blob.
    let key = BlobStore::derive_key(&user_id, brand_id, form.file_name.as_deref().unwrap_or(""));
    let tags = serde_json::Value::from(form.tags.clone());
    let pending = smcm_db::create_pending_media(
        &state.pool,
        brand_id,
        media_type.as_str(),
        &key,
        form.name.as_deref(),
        form.file_name.as_deref(),
        form.description.as_deref(),
        &tags,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if let Err(e) = state.blobs.put(&key, bytes).await {
        // The pending row stays behind; the reconciliation sweep removes it.
        tracing::error!(error = %e, media_id = %pending.id, "blob write failed");
        return Err(ApiError::new(
            req_id.0,
            "internal_error",
            "upload could not be stored",
        ));
    }

    let blob_url = state.blobs.public_url(&key);
    let row = smcm_db::confirm_media(&state.pool, pending.id, &blob_url)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(media_id = %row.id, %brand_id, media_type = %media_type, "media uploaded");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: media_item(row, &state.blobs),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn list_media(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;
    let page = parse_pagination(&query, &req_id.0)?;
    resolve_owned_brand(&state.pool, query.brand_id, &user_id, &req_id.0).await?;

    let rows = smcm_db::list_media_by_brand(&state.pool, query.brand_id, page)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows
            .into_iter()
            .map(|row| media_item(row, &state.blobs))
            .collect::<Vec<_>>(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_media(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;
    let row = fetch_owned_media(&state, id, &user_id, &req_id.0).await?;

    Ok(Json(ApiResponse {
        data: media_item(row, &state.blobs),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn update_media(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMediaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;
    fetch_owned_media(&state, id, &user_id, &req_id.0).await?;

    let tags = body.tags.map(serde_json::Value::from);
    let row = smcm_db::update_media(
        &state.pool,
        id,
        body.name.as_deref(),
        body.description.as_ref().map(|d| d.as_deref()),
        tags.as_ref(),
        body.analysis.as_ref(),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: media_item(row, &state.blobs),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn delete_media(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;
    fetch_owned_media(&state, id, &user_id, &req_id.0).await?;

    let row = smcm_db::delete_media(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    // Row first, then blob: an orphan blob is harmless, an orphan row is not.
    if let Some(key) = row.blob_key.as_deref() {
        if let Err(e) = state.blobs.delete(key).await {
            tracing::warn!(error = %e, media_id = %row.id, "blob delete failed");
        }
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Load a media row and verify the caller owns its brand.
async fn fetch_owned_media(
    state: &AppState,
    id: Uuid,
    user_id: &str,
    request_id: &str,
) -> Result<MediaRow, ApiError> {
    let row = smcm_db::get_media(&state.pool, id)
        .await
        .map_err(|e| map_db_error(request_id.to_string(), &e))?
        .ok_or_else(|| {
            ApiError::new(request_id, "not_found", format!("media '{id}' not found"))
        })?;
    resolve_owned_brand(&state.pool, row.brand_id, user_id, request_id).await?;
    Ok(row)
}
