use thiserror::Error;

/// Error type returned from this library's functions
#[derive(Debug, Error)]
pub enum Error {
    /// The chat request is missing its model or its messages, or carries an unknown role.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The model runtime could not be reached or failed before producing any output.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    /// The stream broke after some output had already been produced.
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),
    /// An Error returned by the API
    #[error("API Error: {0}")]
    ApiError(String),
    /// An Error from the HTTP client
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// De/serialization error
    #[error("de/serialize error: {0}")]
    Serde(#[from] serde_json::error::Error),
    /// An Error occurred when performing an IO operation.
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
}
