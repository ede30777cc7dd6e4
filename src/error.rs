use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The acquisition driver itself failed; the whole run is void.
    #[error("acquisition aborted: {0}")]
    Orchestration(String),
    #[error("operation cancelled by user")]
    Cancelled,
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }

    pub fn orchestration<T: Into<String>>(msg: T) -> Self {
        AppError::Orchestration(msg.into())
    }

    pub fn is_orchestration(&self) -> bool {
        matches!(self, AppError::Orchestration(_))
    }
}

/// Failure of a single channel lookup. Always recoverable: the acquirer either
/// retries the identifier or leaves it out of the results.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request for `{identifier}` failed: {source}")]
    Transport {
        identifier: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request for `{identifier}` returned status {status}")]
    Status {
        identifier: String,
        status: reqwest::StatusCode,
    },
    #[error("response for `{identifier}` is not valid JSON: {source}")]
    Decode {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("response for `{identifier}` has neither a channel id nor a user object")]
    MissingShape { identifier: String },
}

impl LookupError {
    pub fn identifier(&self) -> &str {
        match self {
            LookupError::Transport { identifier, .. }
            | LookupError::Status { identifier, .. }
            | LookupError::Decode { identifier, .. }
            | LookupError::MissingShape { identifier } => identifier,
        }
    }
}
