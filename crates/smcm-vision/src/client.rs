//! HTTP client for the external image-analysis API.
//!
//! Wraps `reqwest` with typed error handling, API key management, and
//! response normalization. Non-2xx upstream answers are surfaced as
//! [`VisionError::UpstreamStatus`] with the upstream status embedded, so
//! handlers can report "analysis failed with 429" without leaking the body.

use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client, Url};

use crate::error::VisionError;
use crate::types::{Analysis, RawAnalysis};

/// Client for the image-analysis API.
///
/// Use [`VisionClient::new`] for production or point `endpoint` at a mock
/// server in tests.
pub struct VisionClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl VisionClient {
    /// Creates a new client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`VisionError::Config`] if `endpoint`
    /// is not a valid URL.
    pub fn new(endpoint: &str, api_key: &str, timeout_secs: u64) -> Result<Self, VisionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("smcm/0.1 (media-analysis)")
            .build()?;

        // Normalise: ensure the base URL ends with exactly one slash so that
        // join() appends to the path rather than replacing the last segment.
        let normalised = format!("{}/", endpoint.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| VisionError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Analyze raw image bytes and return the normalized result.
    ///
    /// # Errors
    ///
    /// - [`VisionError::UpstreamStatus`] if the API answers non-2xx.
    /// - [`VisionError::Http`] on network failure.
    /// - [`VisionError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn analyze_image(&self, image: Vec<u8>) -> Result<Analysis, VisionError> {
        let url = self
            .base_url
            .join("analyze")
            .map_err(|e| VisionError::Config(format!("cannot build analyze URL: {e}")))?;

        let response = self
            .client
            .post(url)
            .header("api-key", &self.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "image analysis API error");
            return Err(VisionError::UpstreamStatus {
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }

        let body: serde_json::Value = response.json().await?;
        let raw: RawAnalysis =
            serde_json::from_value(body).map_err(|e| VisionError::Deserialize {
                context: "analyze".to_string(),
                source: e,
            })?;

        Ok(Analysis::from_raw(raw))
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}
