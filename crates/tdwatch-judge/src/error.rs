use thiserror::Error;

/// Errors returned by the judgment client.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call did not finish within the configured timeout.
    #[error("judgment call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The endpoint answered with a non-2xx status.
    #[error("judgment API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The endpoint answered 2xx but with no message content.
    #[error("judgment API returned no content")]
    EmptyResponse,

    /// The content was not the JSON the caller asked for.
    #[error("malformed judgment output for {context}: {source}")]
    Malformed {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URL could not be parsed.
    #[error("invalid judge base URL '{0}'")]
    InvalidBaseUrl(String),
}
