//! Error types
//!
//! Startup errors (`ConfigError`, `ClientError`) are fatal. `RequestError` is
//! scoped to a single completion call and is shown to the user instead.

use thiserror::Error;

/// Missing or unreadable configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration value {0} (set it in the environment or the config file)")]
    Missing(&'static str),

    #[error("invalid configuration value {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The completion client could not be built from the given settings
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// A completion call failed
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RequestError {
    pub kind: RequestErrorKind,
    pub message: String,
}

impl RequestError {
    pub fn new(kind: RequestErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::Auth, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::MalformedResponse, message)
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::Remote, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::Aborted, message)
    }
}

/// Classification of a failed completion call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    /// Connection refused, DNS failure, broken transfer
    Network,
    /// 401 / 403 from the endpoint
    Auth,
    /// Body could not be decoded or carried no reply
    MalformedResponse,
    /// Any other error reported by the remote service
    Remote,
    /// The request task ended without producing a result
    Aborted,
}

/// A message was rejected by the conversation log
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("user message is empty")]
    EmptyMessage,

    #[error("error records are not part of the conversation")]
    ErrorRole,
}
