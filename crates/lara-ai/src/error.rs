//! Error types for the completion layer

use std::fmt;

use thiserror::Error;

/// Completion failure taxonomy.
///
/// Every variant maps to a distinct user-visible [`AiError::diagnostic`] so
/// callers can render a reply bubble instead of surfacing a hard failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AiError {
    /// A required credential or setting is missing.
    #[error("Configuration error: missing {0}")]
    Configuration(String),

    /// The upstream service answered with a non-2xx status.
    #[error("{provider} returned HTTP {status}: {body}")]
    UpstreamHttp {
        provider: String,
        status: u16,
        body: String,
    },

    /// The upstream body could not be parsed as JSON.
    #[error("Upstream returned a non-JSON body: {body}")]
    NonJson { body: String },

    /// The upstream JSON had no usable `choices[0].message.content`.
    #[error("Upstream response did not contain a completion")]
    EmptyCompletion,

    /// Network-level failure before a complete response arrived.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Local input was rejected before any network call.
    #[error("Invalid input: {0}")]
    Validation(String),
}

/// Coarse failure class used for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Configuration,
    UpstreamHttp,
    MalformedResponse,
    Transport,
    Validation,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Configuration => "configuration",
            ErrorClass::UpstreamHttp => "upstream_http",
            ErrorClass::MalformedResponse => "malformed_response",
            ErrorClass::Transport => "transport",
            ErrorClass::Validation => "validation",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AiError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AiError::Configuration(_) => ErrorClass::Configuration,
            AiError::UpstreamHttp { .. } => ErrorClass::UpstreamHttp,
            AiError::NonJson { .. } | AiError::EmptyCompletion => ErrorClass::MalformedResponse,
            AiError::Transport(_) => ErrorClass::Transport,
            AiError::Validation(_) => ErrorClass::Validation,
        }
    }

    /// Human-readable reply text shown in place of a model answer.
    pub fn diagnostic(&self) -> String {
        match self {
            AiError::Configuration(what) => format!("Server misconfigured: missing {}.", what),
            AiError::UpstreamHttp {
                provider,
                status,
                body,
            } => {
                let body = if body.is_empty() { "no body" } else { body.as_str() };
                format!("{} error {}: {}", provider, status, body)
            }
            AiError::NonJson { body } => {
                let body = if body.is_empty() { "empty body" } else { body.as_str() };
                format!("Upstream returned non-JSON: {}", body)
            }
            AiError::EmptyCompletion => "No reply was returned from the model.".to_string(),
            AiError::Transport(_) => "Network hiccup reaching the model. Try again?".to_string(),
            AiError::Validation(_) => "Please type a message before sending.".to_string(),
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Transport(err.to_string())
    }
}

/// Result type alias for completion operations
pub type Result<T> = std::result::Result<T, AiError>;
