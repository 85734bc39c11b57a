//! Content-generation template handlers.
//!
//! Creation takes the full typed shape and validates it in one pass;
//! PATCHes are partial, with `schedule`/`settings` merged key-by-key into
//! the stored JSONB by the database layer. Patch sub-objects are validated
//! here before the merge so a bad slot never lands in storage.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use smcm_core::schedule::{DayOfWeek, Schedule, TimeSlot};
use smcm_core::templates::{validate_template, TemplateInfo, TemplateSettings};
use smcm_core::FieldError;
use smcm_db::{TemplatePatch, TemplateRow};

use crate::api::{
    double_option, map_db_error, parse_pagination, require_user, resolve_owned_brand, ApiError,
    ApiResponse, AppState, Json, ListQuery, Path, Query, ResponseMeta,
};
use crate::middleware::{Principal, RequestId};

#[derive(Debug, Serialize)]
pub(super) struct TemplateItem {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub template_info: TemplateInfo,
    pub schedule: Option<serde_json::Value>,
    pub settings: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TemplateRow> for TemplateItem {
    fn from(row: TemplateRow) -> Self {
        let platforms = serde_json::from_value(row.platforms).unwrap_or_default();
        Self {
            id: row.id,
            brand_id: row.brand_id,
            template_info: TemplateInfo {
                name: row.name,
                description: row.description,
                platforms,
                content_type: row.content_type,
            },
            schedule: row.schedule,
            settings: row.settings,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateTemplateRequest {
    pub brand_id: Option<Uuid>,
    pub template_info: Option<TemplateInfo>,
    pub schedule: Option<Schedule>,
    #[serde(alias = "template_settings")]
    pub settings: Option<TemplateSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct TemplateInfoPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub platforms: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub content_type: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct UpdateTemplateRequest {
    pub template_info: Option<TemplateInfoPatch>,
    pub schedule: Option<serde_json::Value>,
    #[serde(alias = "template_settings")]
    pub settings: Option<serde_json::Value>,
}

pub(super) async fn create_template(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;

    let mut missing = Vec::new();
    if body.brand_id.is_none() {
        missing.push(FieldError::new("brand_id", "is required"));
    }
    if body.template_info.is_none() {
        missing.push(FieldError::new("template_info", "is required"));
    }
    if !missing.is_empty() {
        return Err(ApiError::validation(req_id.0, missing));
    }
    // Both checked just above.
    let (Some(brand_id), Some(info)) = (body.brand_id, &body.template_info) else {
        return Err(ApiError::new(&req_id.0, "bad_request", "incomplete template"));
    };

    let errors = validate_template(info, body.schedule.as_ref(), body.settings.as_ref());
    if !errors.is_empty() {
        return Err(ApiError::validation(req_id.0, errors));
    }

    resolve_owned_brand(&state.pool, brand_id, &user_id, &req_id.0).await?;

    let platforms = serde_json::Value::from(info.platforms.clone());
    let schedule = body
        .schedule
        .as_ref()
        .map(|s| serde_json::to_value(s))
        .transpose()
        .map_err(|e| encode_failure(&req_id.0, "schedule", &e))?;
    let settings = body
        .settings
        .as_ref()
        .map(|s| serde_json::to_value(s))
        .transpose()
        .map_err(|e| encode_failure(&req_id.0, "settings", &e))?;

    let row = smcm_db::create_template(
        &state.pool,
        brand_id,
        info.name.trim(),
        info.description.as_deref(),
        &platforms,
        info.content_type.as_deref(),
        schedule.as_ref(),
        settings.as_ref(),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: TemplateItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn list_templates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;
    let page = parse_pagination(&query, &req_id.0)?;
    resolve_owned_brand(&state.pool, query.brand_id, &user_id, &req_id.0).await?;

    let rows = smcm_db::list_templates_by_brand(&state.pool, query.brand_id, page)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(TemplateItem::from).collect::<Vec<_>>(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_template(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;
    let row = fetch_owned_template(&state, id, &user_id, &req_id.0).await?;

    Ok(Json(ApiResponse {
        data: TemplateItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn update_template(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;
    fetch_owned_template(&state, id, &user_id, &req_id.0).await?;

    let mut errors = Vec::new();
    if let Some(info) = &body.template_info {
        if let Some(name) = &info.name {
            errors.extend(smcm_core::brands::validate_name("template_info.name", name));
        }
    }
    if let Some(schedule) = &body.schedule {
        errors.extend(validate_schedule_patch(schedule));
    }
    if let Some(settings) = &body.settings {
        errors.extend(validate_settings_patch(settings));
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(req_id.0, errors));
    }

    let info = body.template_info.unwrap_or_default();
    let patch = TemplatePatch {
        name: info.name.map(|n| n.trim().to_string()),
        description: info.description,
        platforms: info.platforms.map(serde_json::Value::from),
        content_type: info.content_type,
        schedule: body.schedule,
        settings: body.settings,
    };

    let row = smcm_db::update_template(&state.pool, id, patch)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: TemplateItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn delete_template(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&principal, &req_id.0)?;
    fetch_owned_template(&state, id, &user_id, &req_id.0).await?;

    smcm_db::delete_template(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

async fn fetch_owned_template(
    state: &AppState,
    id: Uuid,
    user_id: &str,
    request_id: &str,
) -> Result<TemplateRow, ApiError> {
    let row = smcm_db::get_template(&state.pool, id)
        .await
        .map_err(|e| map_db_error(request_id.to_string(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                request_id,
                "not_found",
                format!("template '{id}' not found"),
            )
        })?;
    resolve_owned_brand(&state.pool, row.brand_id, user_id, request_id).await?;
    Ok(row)
}

/// Validate the pieces of a partial schedule patch. Keys the patch does not
/// touch are not re-validated; a `null` value clears the key and is allowed.
fn validate_schedule_patch(patch: &serde_json::Value) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if let Some(slots) = patch.get("time_slots").filter(|v| !v.is_null()) {
        match serde_json::from_value::<Vec<TimeSlot>>(slots.clone()) {
            Ok(time_slots) => {
                let partial = Schedule {
                    days_of_week: Vec::new(),
                    time_slots,
                };
                errors.extend(partial.validate("schedule"));
            }
            Err(_) => errors.push(FieldError::new(
                "schedule.time_slots",
                "must be a list of time slots",
            )),
        }
    }
    if let Some(days) = patch.get("days_of_week").filter(|v| !v.is_null()) {
        if serde_json::from_value::<Vec<DayOfWeek>>(days.clone()).is_err() {
            errors.push(FieldError::new(
                "schedule.days_of_week",
                "must be a list of lowercase weekday names",
            ));
        }
    }
    errors
}

fn validate_settings_patch(patch: &serde_json::Value) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if let Some(t) = patch.get("temperature").and_then(serde_json::Value::as_f64) {
        if !(0.0..=2.0).contains(&t) {
            errors.push(FieldError::new(
                "settings.temperature",
                format!("must be in 0.0..=2.0, got {t}"),
            ));
        }
    }
    errors
}

fn encode_failure(request_id: &str, field: &str, error: &serde_json::Error) -> ApiError {
    tracing::error!(error = %error, field, "request field failed to re-encode");
    ApiError::new(request_id, "internal_error", "request could not be processed")
}
