use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Header carrying the platform-injected identity claim: base64-encoded
/// JSON with a `userId` field.
pub const PRINCIPAL_HEADER: &str = "x-client-principal";

/// The caller's identity as decoded from [`PRINCIPAL_HEADER`].
///
/// Every decode failure degrades to `Anonymous`; extraction itself never
/// rejects a request. Handlers that require authentication turn
/// `Anonymous` into a 401 before touching the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    User(String),
    Anonymous,
}

impl Principal {
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Principal::User(id) => Some(id),
            Principal::Anonymous => None,
        }
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Axum middleware that decodes the identity header into a [`Principal`]
/// request extension. Never rejects; malformed input becomes `Anonymous`.
pub async fn extract_principal(mut req: Request, next: Next) -> Response {
    let principal = req
        .headers()
        .get(PRINCIPAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or(Principal::Anonymous, decode_principal);

    req.extensions_mut().insert(principal);
    next.run(req).await
}

fn decode_principal(raw: &str) -> Principal {
    let Ok(bytes) = BASE64.decode(raw.trim()) else {
        return Principal::Anonymous;
    };
    let Ok(claims) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return Principal::Anonymous;
    };
    match claims.get("userId").and_then(serde_json::Value::as_str) {
        Some(id) if !id.trim().is_empty() && id != "anonymous" => {
            Principal::User(id.to_string())
        }
        _ => Principal::Anonymous,
    }
}
