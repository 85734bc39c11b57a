//! Integration tests for `VisionClient` using wiremock HTTP mocks.

use smcm_vision::{VisionClient, VisionError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> VisionClient {
    VisionClient::new(base_url, "test-key", 30).expect("client construction should not fail")
}

#[tokio::test]
async fn analyze_image_normalizes_full_response() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "tags": [
            { "name": "dog", "confidence": 0.81 },
            { "name": "outdoor", "confidence": 0.95 }
        ],
        "description": {
            "captions": [
                { "text": "a dog on grass", "confidence": 0.88 },
                { "text": "an animal outside", "confidence": 0.42 }
            ]
        },
        "objects": [
            { "object": "golden retriever", "confidence": 0.91 }
        ],
        "categories": [
            { "name": "animal_dog", "score": 0.76 }
        ],
        "brands": [
            { "name": "Acme", "confidence": 0.55 }
        ],
        "faces": [ {}, {} ],
        "read": { "content": "BEST DOG" }
    });

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .and(header("api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let analysis = client
        .analyze_image(vec![0u8; 16])
        .await
        .expect("should parse analysis");

    // Tags come back sorted by confidence, highest first.
    assert_eq!(analysis.tags[0].name, "outdoor");
    assert_eq!(analysis.tags[1].name, "dog");
    assert_eq!(analysis.caption.as_deref(), Some("a dog on grass"));
    assert_eq!(analysis.objects[0].name, "golden retriever");
    assert_eq!(analysis.categories[0].name, "animal_dog");
    assert_eq!(analysis.brands[0].name, "Acme");
    assert_eq!(analysis.people_count, 2);
    assert_eq!(analysis.ocr_text.as_deref(), Some("BEST DOG"));
    assert_eq!(analysis.suggested_name, "Golden Retriever");
}

#[tokio::test]
async fn analyze_image_with_sparse_response_suggests_literal_image() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let analysis = client
        .analyze_image(vec![0u8; 16])
        .await
        .expect("empty analysis is still valid");

    assert!(analysis.tags.is_empty());
    assert!(analysis.caption.is_none());
    assert!(analysis.ocr_text.is_none());
    assert_eq!(analysis.people_count, 0);
    assert_eq!(analysis.suggested_name, "Image");
}

#[tokio::test]
async fn upstream_error_status_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .analyze_image(vec![0u8; 16])
        .await
        .expect_err("429 should be an error");

    match err {
        VisionError::UpstreamStatus { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("expected UpstreamStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "tags": "not-a-list" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .analyze_image(vec![0u8; 16])
        .await
        .expect_err("shape mismatch should fail");

    assert!(matches!(err, VisionError::Deserialize { .. }));
}
