//! Heuristic display-name suggestion for analyzed images.

use crate::types::ScoredLabel;

/// Pick a human-friendly name for an image from its analysis.
///
/// Priority: most confident detected object, then a recognized brand name,
/// then the top tag, then the caption, and finally the literal `"Image"`.
#[must_use]
pub fn suggested_name(
    objects: &[ScoredLabel],
    brands: &[ScoredLabel],
    tags: &[ScoredLabel],
    caption: Option<&str>,
) -> String {
    if let Some(object) = objects.first() {
        return title_case(&object.name);
    }
    if let Some(brand) = brands.first() {
        return brand.name.clone();
    }
    if let Some(tag) = tags.first() {
        return title_case(&tag.name);
    }
    if let Some(caption) = caption {
        let trimmed = caption.trim();
        if !trimmed.is_empty() {
            return title_case(trimmed);
        }
    }
    "Image".to_string()
}

/// Uppercase the first letter of each word; labels arrive lowercased.
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(name: &str, confidence: f64) -> ScoredLabel {
        ScoredLabel {
            name: name.to_string(),
            confidence,
        }
    }

    #[test]
    fn object_wins_over_everything() {
        let name = suggested_name(
            &[label("golden retriever", 0.9)],
            &[label("Acme", 0.8)],
            &[label("dog", 0.99)],
            Some("a dog on grass"),
        );
        assert_eq!(name, "Golden Retriever");
    }

    #[test]
    fn brand_wins_when_no_objects() {
        let name = suggested_name(&[], &[label("Acme", 0.8)], &[label("soda", 0.9)], None);
        assert_eq!(name, "Acme");
    }

    #[test]
    fn tag_then_caption_then_literal_image() {
        assert_eq!(
            suggested_name(&[], &[], &[label("sunset", 0.7)], None),
            "Sunset"
        );
        assert_eq!(
            suggested_name(&[], &[], &[], Some("a beach at dusk")),
            "A Beach At Dusk"
        );
        assert_eq!(suggested_name(&[], &[], &[], Some("  ")), "Image");
        assert_eq!(suggested_name(&[], &[], &[], None), "Image");
    }
}
