//! Content-generation template domain types.
//!
//! A template bundles descriptive info, an optional posting [`Schedule`],
//! and optional generation settings. These types are the canonical wire
//! shape; the database stores `schedule` and `settings` as JSONB blobs of
//! exactly this layout.

use serde::{Deserialize, Serialize};

use crate::schedule::Schedule;
use crate::FieldError;

/// Descriptive metadata for a template. Required on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub content_type: Option<String>,
}

/// Generation settings: prompt, model selection, and visual constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSettings {
    pub prompt_template: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    #[serde(default)]
    pub style_themes: Vec<String>,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
}

impl TemplateInfo {
    /// Validate the info block, prefixing field paths with `prefix`.
    #[must_use]
    pub fn validate(&self, prefix: &str) -> Vec<FieldError> {
        let mut errors = crate::brands::validate_name(&format!("{prefix}.name"), &self.name);
        for (i, platform) in self.platforms.iter().enumerate() {
            if platform.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("{prefix}.platforms[{i}]"),
                    "must be non-empty",
                ));
            }
        }
        errors
    }
}

impl TemplateSettings {
    /// Validate the settings block, prefixing field paths with `prefix`.
    #[must_use]
    pub fn validate(&self, prefix: &str) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                errors.push(FieldError::new(
                    format!("{prefix}.temperature"),
                    format!("must be in 0.0..=2.0, got {t}"),
                ));
            }
        }
        errors
    }
}

/// Validate an optional schedule together with info/settings blocks,
/// collecting every failure into one list.
#[must_use]
pub fn validate_template(
    info: &TemplateInfo,
    schedule: Option<&Schedule>,
    settings: Option<&TemplateSettings>,
) -> Vec<FieldError> {
    let mut errors = info.validate("template_info");
    if let Some(schedule) = schedule {
        errors.extend(schedule.validate("schedule"));
    }
    if let Some(settings) = settings {
        errors.extend(settings.validate("settings"));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{DayOfWeek, TimeSlot};

    fn info(name: &str) -> TemplateInfo {
        TemplateInfo {
            name: name.to_string(),
            description: None,
            platforms: vec!["instagram".to_string()],
            content_type: Some("post".to_string()),
        }
    }

    #[test]
    fn valid_template_passes() {
        let schedule = Schedule {
            days_of_week: vec![DayOfWeek::Monday],
            time_slots: vec![TimeSlot {
                hour: 9,
                minute: 0,
                timezone: "UTC".to_string(),
            }],
        };
        let settings = TemplateSettings {
            prompt_template: Some("Write a post about {topic}".to_string()),
            model: Some("gpt-4o".to_string()),
            temperature: Some(0.7),
            style_themes: vec!["minimal".to_string()],
            image_width: Some(1080),
            image_height: Some(1080),
        };
        let errors = validate_template(&info("Weekly promo"), Some(&schedule), Some(&settings));
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn empty_name_is_reported_with_path() {
        let errors = validate_template(&info("  "), None, None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "template_info.name");
    }

    #[test]
    fn temperature_out_of_range_is_reported() {
        let settings = TemplateSettings {
            prompt_template: None,
            model: None,
            temperature: Some(3.5),
            style_themes: vec![],
            image_width: None,
            image_height: None,
        };
        let errors = validate_template(&info("ok"), None, Some(&settings));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "settings.temperature");
    }

    #[test]
    fn bad_schedule_and_bad_settings_accumulate() {
        let schedule = Schedule {
            days_of_week: vec![],
            time_slots: vec![TimeSlot {
                hour: 25,
                minute: 0,
                timezone: "UTC".to_string(),
            }],
        };
        let settings = TemplateSettings {
            prompt_template: None,
            model: None,
            temperature: Some(-1.0),
            style_themes: vec![],
            image_width: None,
            image_height: None,
        };
        let errors = validate_template(&info("ok"), Some(&schedule), Some(&settings));
        assert_eq!(errors.len(), 2);
    }
}
