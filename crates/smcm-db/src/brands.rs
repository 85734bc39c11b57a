//! Database operations for the `brands` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const BRAND_COLUMNS: &str = "id, user_id, name, description, social_accounts, is_active, \
     created_at, updated_at, deleted_at";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `brands` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRow {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub social_accounts: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Creates a new brand row and returns the full inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_brand(
    pool: &PgPool,
    user_id: &str,
    name: &str,
    description: Option<&str>,
    social_accounts: &serde_json::Value,
) -> Result<BrandRow, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "INSERT INTO brands (user_id, name, description, social_accounts) \
         VALUES ($1, $2, $3, $4::jsonb) \
         RETURNING {BRAND_COLUMNS}"
    ))
    .bind(user_id)
    .bind(name)
    .bind(description)
    .bind(social_accounts)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Returns a single active, non-deleted brand by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_brand(pool: &PgPool, id: Uuid) -> Result<Option<BrandRow>, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} FROM brands \
         WHERE id = $1 AND is_active = true AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Returns all active, non-deleted brands owned by `user_id`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_brands_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<BrandRow>, DbError> {
    let rows = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} FROM brands \
         WHERE user_id = $1 AND is_active = true AND deleted_at IS NULL \
         ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Updates brand metadata fields in a single statement.
///
/// `name` uses `Some(v)` = set / `None` = keep. The doubly-optional
/// `description` distinguishes "not supplied" (outer `None`) from
/// "explicitly cleared" (`Some(None)`). `social_accounts`, when supplied,
/// replaces the stored map wholesale — partial token updates are handled by
/// the caller merging before the write.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no active brand has this id, or
/// [`DbError::Sqlx`] if the query fails.
#[allow(clippy::option_option)]
pub async fn update_brand(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
    description: Option<Option<&str>>,
    social_accounts: Option<&serde_json::Value>,
) -> Result<BrandRow, DbError> {
    let description_supplied = description.is_some();
    let description_val = description.flatten();

    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "UPDATE brands \
         SET name            = COALESCE($2, name), \
             description     = CASE WHEN $3::BOOL THEN $4 ELSE description END, \
             social_accounts = COALESCE($5::jsonb, social_accounts), \
             updated_at      = NOW() \
         WHERE id = $1 AND is_active = true AND deleted_at IS NULL \
         RETURNING {BRAND_COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(description_supplied)
    .bind(description_val)
    .bind(social_accounts)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Soft-deletes a brand by setting `is_active = false` and `deleted_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn deactivate_brand(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE brands \
         SET is_active = false, deleted_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
