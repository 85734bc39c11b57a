//! Brand domain types: per-platform social account credentials.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::FieldError;

/// Social platforms a brand can link an account for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Instagram,
    Facebook,
    Twitter,
    Tiktok,
    Linkedin,
    Youtube,
}

/// Credentials and state for one linked social account.
///
/// Tokens are opaque to this service; they are stored and returned as-is
/// and never logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialAccount {
    #[serde(default)]
    pub enabled: bool,
    pub username: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Map of platform → linked account, serialized into the brand's
/// `social_accounts` JSONB column.
pub type SocialAccounts = BTreeMap<SocialPlatform, SocialAccount>;

/// Validate a brand display name: non-empty after trimming, at most 200 chars.
#[must_use]
pub fn validate_name(field: &str, name: &str) -> Vec<FieldError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        vec![FieldError::new(field, "must be non-empty")]
    } else if trimmed.len() > 200 {
        vec![FieldError::new(field, "must be at most 200 characters")]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn social_platform_serializes_lowercase() {
        let json = serde_json::to_string(&SocialPlatform::Instagram).expect("serialize");
        assert_eq!(json, "\"instagram\"");
    }

    #[test]
    fn social_accounts_round_trip() {
        let mut accounts = SocialAccounts::new();
        accounts.insert(
            SocialPlatform::Twitter,
            SocialAccount {
                enabled: true,
                username: Some("handle".to_string()),
                access_token: Some("tok".to_string()),
                refresh_token: None,
                token_expires_at: None,
            },
        );
        let json = serde_json::to_value(&accounts).expect("serialize");
        assert!(json.get("twitter").is_some());
        let back: SocialAccounts = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, accounts);
    }

    #[test]
    fn validate_name_rejects_empty_and_oversized() {
        assert!(!validate_name("name", "  ").is_empty());
        assert!(!validate_name("name", &"x".repeat(201)).is_empty());
        assert!(validate_name("name", "Acme Soda").is_empty());
    }
}
