//! Wire types for the image-analysis API and the normalized result.
//!
//! `Raw*` types mirror the upstream response envelope; [`Analysis`] is the
//! flattened shape this service returns to its own clients.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Upstream response shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RawAnalysis {
    #[serde(default)]
    pub tags: Vec<RawScored>,
    pub description: Option<RawDescription>,
    #[serde(default)]
    pub objects: Vec<RawObject>,
    #[serde(default)]
    pub categories: Vec<RawCategory>,
    #[serde(default)]
    pub brands: Vec<RawScored>,
    #[serde(default)]
    pub faces: Vec<serde_json::Value>,
    pub read: Option<RawRead>,
}

#[derive(Debug, Deserialize)]
pub struct RawScored {
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawDescription {
    #[serde(default)]
    pub captions: Vec<RawCaption>,
}

#[derive(Debug, Deserialize)]
pub struct RawCaption {
    pub text: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawObject {
    pub object: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawCategory {
    pub name: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawRead {
    #[serde(default)]
    pub content: String,
}

// ---------------------------------------------------------------------------
// Normalized result
// ---------------------------------------------------------------------------

/// A label with its detection confidence, normalized across upstream shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub name: String,
    pub confidence: f64,
}

/// Normalized image analysis returned by `POST /api/v1/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub tags: Vec<ScoredLabel>,
    pub caption: Option<String>,
    pub objects: Vec<ScoredLabel>,
    pub categories: Vec<ScoredLabel>,
    pub brands: Vec<ScoredLabel>,
    pub people_count: usize,
    pub ocr_text: Option<String>,
    pub suggested_name: String,
}

impl Analysis {
    /// Flatten the upstream envelope, sorting scored lists by confidence
    /// (highest first) and deriving the suggested display name.
    #[must_use]
    pub fn from_raw(raw: RawAnalysis) -> Self {
        let mut tags: Vec<ScoredLabel> = raw
            .tags
            .into_iter()
            .map(|t| ScoredLabel {
                name: t.name,
                confidence: t.confidence,
            })
            .collect();
        tags.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut objects: Vec<ScoredLabel> = raw
            .objects
            .into_iter()
            .map(|o| ScoredLabel {
                name: o.object,
                confidence: o.confidence,
            })
            .collect();
        objects.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let categories = raw
            .categories
            .into_iter()
            .map(|c| ScoredLabel {
                name: c.name,
                confidence: c.score,
            })
            .collect();

        let brands: Vec<ScoredLabel> = raw
            .brands
            .into_iter()
            .map(|b| ScoredLabel {
                name: b.name,
                confidence: b.confidence,
            })
            .collect();

        let caption = raw
            .description
            .and_then(|d| d.captions.into_iter().max_by(|a, b| {
                a.confidence.total_cmp(&b.confidence)
            }))
            .map(|c| c.text);

        let ocr_text = raw
            .read
            .map(|r| r.content)
            .filter(|c| !c.trim().is_empty());

        let suggested_name =
            crate::suggest::suggested_name(&objects, &brands, &tags, caption.as_deref());

        Self {
            tags,
            caption,
            objects,
            categories,
            brands,
            people_count: raw.faces.len(),
            ocr_text,
            suggested_name,
        }
    }
}
