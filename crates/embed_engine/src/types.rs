use std::fmt;

use embed_core::{ContainerId, Provider};

/// Parsed oEmbed payload; only `html` is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OEmbedDocument {
    pub html: String,
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub provider_name: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct OEmbedError {
    pub kind: FailureKind,
    pub message: String,
}

impl OEmbedError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    MalformedResponse,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::MalformedResponse => write!(f, "malformed oembed response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Failures reported by a [`crate::DocumentHost`] when asked to touch the page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("container {0} is not mounted")]
    UnknownContainer(ContainerId),
    #[error("global for {0} is not available")]
    ProviderUnavailable(Provider),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start fetch runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
