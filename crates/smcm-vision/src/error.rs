use thiserror::Error;

/// Errors returned by the image-analysis API client.
#[derive(Debug, Error)]
pub enum VisionError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint URL could not be parsed or the client misconfigured.
    #[error("vision client configuration error: {0}")]
    Config(String),

    /// The analysis API answered with a non-2xx status.
    #[error("image analysis API returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
