//! Posting schedule types for content-generation templates.
//!
//! A schedule is a set of days-of-week plus a list of time-of-day slots,
//! each pinned to an IANA timezone. Validation is collected into
//! [`FieldError`]s rather than failing fast, so a client sees every bad
//! field in one 422 response.

use serde::{Deserialize, Serialize};

use crate::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// A single posting slot: time of day in a named timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub hour: u8,
    pub minute: u8,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub days_of_week: Vec<DayOfWeek>,
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
}

impl Schedule {
    /// Validate every slot, returning one [`FieldError`] per violation.
    ///
    /// `prefix` is prepended to field paths (e.g. `"schedule"` yields
    /// `schedule.time_slots[0].hour`). An empty vec means the schedule is valid.
    #[must_use]
    pub fn validate(&self, prefix: &str) -> Vec<FieldError> {
        let mut errors = Vec::new();

        for (i, slot) in self.time_slots.iter().enumerate() {
            if slot.hour > 23 {
                errors.push(FieldError::new(
                    format!("{prefix}.time_slots[{i}].hour"),
                    format!("hour must be in 0..=23, got {}", slot.hour),
                ));
            }
            if slot.minute > 59 {
                errors.push(FieldError::new(
                    format!("{prefix}.time_slots[{i}].minute"),
                    format!("minute must be in 0..=59, got {}", slot.minute),
                ));
            }
            if slot.timezone.parse::<chrono_tz::Tz>().is_err() {
                errors.push(FieldError::new(
                    format!("{prefix}.time_slots[{i}].timezone"),
                    format!("'{}' is not a recognized IANA timezone", slot.timezone),
                ));
            }
        }

        errors
    }
}
