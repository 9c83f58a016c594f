//! Error types for the external provider boundaries.
//!
//! Application plumbing (config, state, storage) uses `anyhow`; these enums
//! exist so the orchestrator and advisory adapters can tell failure kinds
//! apart when they log and fall back.

/// Failure of the food recognition step.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("no food recognized")]
    NoFoodRecognized,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("undecodable provider payload: {0}")]
    Decode(String),

    #[error("recognition API key not configured")]
    MissingCredential,
}

/// Failure of a language-model advisory call. Never leaves the adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("empty response content")]
    EmptyContent,

    #[error("unparseable advisory content: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid advisory content: {0}")]
    Invalid(String),
}
