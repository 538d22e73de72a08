use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single chat-completion call
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a response (connection, timeout, ...)
    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with any status other than 200
    #[error("API error: HTTP {status} - {body}")]
    Status { status: u16, body: String },

    /// The gateway answered 200 but the payload is unusable
    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    /// The chat request could not be assembled
    #[error("Invalid chat request: {0}")]
    InvalidRequest(#[from] async_openai::error::OpenAIError),

    /// The HTTP client could not be configured
    #[error("Gateway setup failed: {0}")]
    Setup(String),
}

impl GatewayError {
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}

/// Failure of a strategy while producing an answer
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The chat request could not be assembled
    #[error("Failed to build chat request: {0}")]
    Request(#[from] async_openai::error::OpenAIError),
}

/// Failure to persist run artifacts; always fatal to the caller
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {what} to JSON: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
