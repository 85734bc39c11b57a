//! Database operations for the `media` table.
//!
//! Media creation is two-phase: a `pending` row is inserted before the blob
//! write and flipped to `ready` once the bytes are durably stored. Rows stuck
//! in `pending` are garbage-collected by the reconciliation sweep.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::pagination::Pagination;
use crate::DbError;

const MEDIA_COLUMNS: &str = "id, brand_id, status, blob_key, blob_url, media_type, name, \
     file_name, description, tags, analysis, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `media` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MediaRow {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub status: String,
    pub blob_key: Option<String>,
    pub blob_url: Option<String>,
    pub media_type: String,
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub description: Option<String>,
    pub tags: serde_json::Value,
    pub analysis: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a `pending` media row ahead of the blob write. The destination
/// `blob_key` is recorded up front so the reconciliation sweep can reclaim
/// the bytes even when the row never reaches `ready`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
#[allow(clippy::too_many_arguments)]
pub async fn create_pending_media(
    pool: &PgPool,
    brand_id: Uuid,
    media_type: &str,
    blob_key: &str,
    name: Option<&str>,
    file_name: Option<&str>,
    description: Option<&str>,
    tags: &serde_json::Value,
) -> Result<MediaRow, DbError> {
    let row = sqlx::query_as::<_, MediaRow>(&format!(
        "INSERT INTO media (brand_id, status, media_type, blob_key, name, file_name, description, tags) \
         VALUES ($1, 'pending', $2, $3, $4, $5, $6, $7::jsonb) \
         RETURNING {MEDIA_COLUMNS}"
    ))
    .bind(brand_id)
    .bind(media_type)
    .bind(blob_key)
    .bind(name)
    .bind(file_name)
    .bind(description)
    .bind(tags)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Confirms a pending media row after its blob is durably stored,
/// recording the public URL and flipping status to `ready`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no pending row has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn confirm_media(pool: &PgPool, id: Uuid, blob_url: &str) -> Result<MediaRow, DbError> {
    let row = sqlx::query_as::<_, MediaRow>(&format!(
        "UPDATE media \
         SET status = 'ready', blob_url = $2, updated_at = NOW() \
         WHERE id = $1 AND status = 'pending' \
         RETURNING {MEDIA_COLUMNS}"
    ))
    .bind(id)
    .bind(blob_url)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Returns a single media row by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_media(pool: &PgPool, id: Uuid) -> Result<Option<MediaRow>, DbError> {
    let row = sqlx::query_as::<_, MediaRow>(&format!(
        "SELECT {MEDIA_COLUMNS} FROM media WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Lists `ready` media for a brand with clamped, allow-listed pagination.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_media_by_brand(
    pool: &PgPool,
    brand_id: Uuid,
    page: Pagination,
) -> Result<Vec<MediaRow>, DbError> {
    let rows = sqlx::query_as::<_, MediaRow>(&format!(
        "SELECT {MEDIA_COLUMNS} FROM media \
         WHERE brand_id = $1 AND status = 'ready' {}",
        page.order_clause()
    ))
    .bind(brand_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Updates media metadata with a single overlay statement.
///
/// `name`/`tags`/`analysis` use `Some(v)` = set / `None` = keep; the
/// doubly-optional `description` additionally supports explicit clearing.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has this id, or
/// [`DbError::Sqlx`] if the query fails.
#[allow(clippy::option_option)]
pub async fn update_media(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
    description: Option<Option<&str>>,
    tags: Option<&serde_json::Value>,
    analysis: Option<&serde_json::Value>,
) -> Result<MediaRow, DbError> {
    let description_supplied = description.is_some();
    let description_val = description.flatten();

    let row = sqlx::query_as::<_, MediaRow>(&format!(
        "UPDATE media \
         SET name        = COALESCE($2, name), \
             description = CASE WHEN $3::BOOL THEN $4 ELSE description END, \
             tags        = COALESCE($5::jsonb, tags), \
             analysis    = COALESCE($6::jsonb, analysis), \
             updated_at  = NOW() \
         WHERE id = $1 \
         RETURNING {MEDIA_COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(description_supplied)
    .bind(description_val)
    .bind(tags)
    .bind(analysis)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Deletes a media row and returns it so the caller can remove the blob.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn delete_media(pool: &PgPool, id: Uuid) -> Result<MediaRow, DbError> {
    let row = sqlx::query_as::<_, MediaRow>(&format!(
        "DELETE FROM media WHERE id = $1 RETURNING {MEDIA_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Returns `pending` rows older than `cutoff` — orphan candidates whose blob
/// write never completed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stale_pending_media(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<MediaRow>, DbError> {
    let rows = sqlx::query_as::<_, MediaRow>(&format!(
        "SELECT {MEDIA_COLUMNS} FROM media \
         WHERE status = 'pending' AND created_at < $1 \
         ORDER BY created_at"
    ))
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
