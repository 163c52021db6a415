use fruitfall_core::FeatureId;
use thiserror::Error;

/// Errors returned by the Detail API client.
#[derive(Debug, Error)]
pub enum DetailError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Failures the map controller reports to its caller.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to load detail for feature {feature_id}: {source}")]
    Detail {
        feature_id: FeatureId,
        #[source]
        source: DetailError,
    },

    #[error("map event channel closed")]
    ChannelClosed,
}
