use thiserror::Error;

/// Errors from the provider parsers: the payload arrived but does not have
/// the shape the provider promised. Anything recoverable as a "no data for
/// today" outcome is *not* an error — parsers reserve `Err` for payloads
/// that cannot be interpreted at all.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The payload body could not be deserialized into the expected shape.
    #[error("payload deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The payload parsed but violates the provider contract (missing
    /// required array, provider-declared error text, no recognizable item).
    #[error("malformed {provider} payload: {reason}")]
    Shape { provider: String, reason: String },
}

/// Errors from the fetch client.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network, TLS, or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered with a non-2xx status.
    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// The catalog entry has no resolvable request URL for its provider.
    #[error("restaurant '{code}' is not fetchable: {reason}")]
    Unsupported { code: String, reason: String },
}
