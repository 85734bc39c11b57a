//! Database operations for the `templates` table.
//!
//! Template updates merge one sub-object level deep: top-level fields overlay
//! via COALESCE, while the `schedule` and `settings` JSONB blobs merge the
//! patch's keys into the stored object instead of replacing it wholesale.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;
use crate::pagination::Pagination;

const TEMPLATE_COLUMNS: &str = "id, brand_id, name, description, platforms, content_type, \
     schedule, settings, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row and patch types
// ---------------------------------------------------------------------------

/// A row from the `templates` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TemplateRow {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub platforms: serde_json::Value,
    pub content_type: Option<String>,
    pub schedule: Option<serde_json::Value>,
    pub settings: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a template.
///
/// Outer `None` always means "keep current". For `description` and
/// `content_type`, `Some(None)` clears the value. `schedule` and `settings`
/// patches are merged key-by-key into the stored JSONB object.
#[allow(clippy::option_option)]
#[derive(Debug, Default)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub platforms: Option<serde_json::Value>,
    pub content_type: Option<Option<String>>,
    pub schedule: Option<serde_json::Value>,
    pub settings: Option<serde_json::Value>,
}

/// Overlay `patch`'s top-level keys onto `base`, shallowly.
///
/// Non-object inputs replace `base` outright; `null` values in the patch
/// clear the corresponding key.
fn merge_shallow(base: Option<serde_json::Value>, patch: &serde_json::Value) -> serde_json::Value {
    let serde_json::Value::Object(patch_map) = patch else {
        return patch.clone();
    };
    let mut merged = match base {
        Some(serde_json::Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    for (key, value) in patch_map {
        if value.is_null() {
            merged.remove(key);
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }
    serde_json::Value::Object(merged)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Creates a new template row and returns the full inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_template(
    pool: &PgPool,
    brand_id: Uuid,
    name: &str,
    description: Option<&str>,
    platforms: &serde_json::Value,
    content_type: Option<&str>,
    schedule: Option<&serde_json::Value>,
    settings: Option<&serde_json::Value>,
) -> Result<TemplateRow, DbError> {
    let row = sqlx::query_as::<_, TemplateRow>(&format!(
        "INSERT INTO templates \
           (brand_id, name, description, platforms, content_type, schedule, settings) \
         VALUES ($1, $2, $3, $4::jsonb, $5, $6::jsonb, $7::jsonb) \
         RETURNING {TEMPLATE_COLUMNS}"
    ))
    .bind(brand_id)
    .bind(name)
    .bind(description)
    .bind(platforms)
    .bind(content_type)
    .bind(schedule)
    .bind(settings)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Returns a single template by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_template(pool: &PgPool, id: Uuid) -> Result<Option<TemplateRow>, DbError> {
    let row = sqlx::query_as::<_, TemplateRow>(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Lists templates for a brand with clamped, allow-listed pagination.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_templates_by_brand(
    pool: &PgPool,
    brand_id: Uuid,
    page: Pagination,
) -> Result<Vec<TemplateRow>, DbError> {
    let rows = sqlx::query_as::<_, TemplateRow>(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE brand_id = $1 {}",
        page.order_clause()
    ))
    .bind(brand_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Applies a [`TemplatePatch`], merging JSONB sub-objects one level deep.
///
/// The read and write run inside one transaction with the row locked
/// (`FOR UPDATE`), so two concurrent patches cannot silently drop each
/// other's sub-object keys.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has this id, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn update_template(
    pool: &PgPool,
    id: Uuid,
    patch: TemplatePatch,
) -> Result<TemplateRow, DbError> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, TemplateRow>(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    let schedule = match patch.schedule {
        Some(ref p) => Some(merge_shallow(current.schedule, p)),
        None => current.schedule,
    };
    let settings = match patch.settings {
        Some(ref p) => Some(merge_shallow(current.settings, p)),
        None => current.settings,
    };

    let description_supplied = patch.description.is_some();
    let description_val = patch.description.flatten();
    let content_type_supplied = patch.content_type.is_some();
    let content_type_val = patch.content_type.flatten();

    let row = sqlx::query_as::<_, TemplateRow>(&format!(
        "UPDATE templates \
         SET name         = COALESCE($2, name), \
             description  = CASE WHEN $3::BOOL THEN $4 ELSE description END, \
             platforms    = COALESCE($5::jsonb, platforms), \
             content_type = CASE WHEN $6::BOOL THEN $7 ELSE content_type END, \
             schedule     = $8::jsonb, \
             settings     = $9::jsonb, \
             updated_at   = NOW() \
         WHERE id = $1 \
         RETURNING {TEMPLATE_COLUMNS}"
    ))
    .bind(id)
    .bind(patch.name)
    .bind(description_supplied)
    .bind(description_val)
    .bind(patch.platforms)
    .bind(content_type_supplied)
    .bind(content_type_val)
    .bind(schedule)
    .bind(settings)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Deletes a template outright.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn delete_template(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM templates WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_shallow_overlays_top_level_keys() {
        let base = json!({"prompt_template": "old", "model": "gpt-4o", "temperature": 0.7});
        let patch = json!({"prompt_template": "new"});
        let merged = merge_shallow(Some(base), &patch);
        assert_eq!(merged["prompt_template"], "new");
        assert_eq!(merged["model"], "gpt-4o");
        assert_eq!(merged["temperature"], 0.7);
    }

    #[test]
    fn merge_shallow_null_clears_a_key() {
        let base = json!({"model": "gpt-4o", "temperature": 0.7});
        let patch = json!({"temperature": null});
        let merged = merge_shallow(Some(base), &patch);
        assert_eq!(merged["model"], "gpt-4o");
        assert!(merged.get("temperature").is_none());
    }

    #[test]
    fn merge_shallow_with_no_base_takes_the_patch() {
        let patch = json!({"days_of_week": ["monday"]});
        let merged = merge_shallow(None, &patch);
        assert_eq!(merged, patch);
    }

    #[test]
    fn merge_shallow_replaces_lists_wholesale() {
        // One level deep only: arrays inside the object are not element-merged.
        let base = json!({"time_slots": [{"hour": 9, "minute": 0, "timezone": "UTC"}]});
        let patch = json!({"time_slots": [{"hour": 17, "minute": 30, "timezone": "UTC"}]});
        let merged = merge_shallow(Some(base), &patch);
        assert_eq!(merged["time_slots"].as_array().map(Vec::len), Some(1));
        assert_eq!(merged["time_slots"][0]["hour"], 17);
    }
}
