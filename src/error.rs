use std::fmt;
use thiserror::Error;

/// Which remote operation failed and what it was aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub operation: &'static str,
    pub target: String,
}

impl ErrorContext {
    pub fn new(operation: &'static str, target: impl Into<String>) -> Self {
        Self {
            operation,
            target: target.into(),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.operation, self.target)
    }
}

/// Fieldless discriminant of [`AggregatorError`], for callers that branch on
/// the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    ChannelNotFound,
    ChannelCreate,
    IdentityResolution,
    RelayPost,
    MessageNotFound,
    SlackApi,
    CorrelationLog,
    Io,
    Serialization,
}

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(ErrorContext),

    #[error("Channel create failed: {context}: {reason}")]
    ChannelCreate { context: ErrorContext, reason: String },

    #[error("Identity resolution failed: {context}: {reason}")]
    IdentityResolution { context: ErrorContext, reason: String },

    #[error("Relay post failed: {context}: {reason}")]
    RelayPost { context: ErrorContext, reason: String },

    #[error("Message not found: {0}")]
    MessageNotFound(ErrorContext),

    #[error("Slack API error: {context}: {reason}")]
    SlackApi { context: ErrorContext, reason: String },

    #[error("Correlation log error: {0}")]
    CorrelationLog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AggregatorError {
    pub fn slack_api(context: ErrorContext, reason: impl fmt::Display) -> Self {
        Self::SlackApi {
            context,
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::ChannelNotFound(_) => ErrorKind::ChannelNotFound,
            Self::ChannelCreate { .. } => ErrorKind::ChannelCreate,
            Self::IdentityResolution { .. } => ErrorKind::IdentityResolution,
            Self::RelayPost { .. } => ErrorKind::RelayPost,
            Self::MessageNotFound(_) => ErrorKind::MessageNotFound,
            Self::SlackApi { .. } => ErrorKind::SlackApi,
            Self::CorrelationLog(_) => ErrorKind::CorrelationLog,
            Self::Io(_) => ErrorKind::Io,
            Self::Serde(_) | Self::Toml(_) => ErrorKind::Serialization,
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::ChannelNotFound(context) | Self::MessageNotFound(context) => Some(context),
            Self::ChannelCreate { context, .. }
            | Self::IdentityResolution { context, .. }
            | Self::RelayPost { context, .. }
            | Self::SlackApi { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Re-tag a failure as an identity lookup failure, keeping its context.
    pub(crate) fn into_identity(self, fallback: ErrorContext) -> Self {
        match self {
            Self::IdentityResolution { .. } => self,
            Self::SlackApi { context, reason } => Self::IdentityResolution { context, reason },
            other => Self::IdentityResolution {
                context: fallback,
                reason: other.to_string(),
            },
        }
    }

    /// Re-tag a failure as a post failure, keeping its context.
    pub(crate) fn into_post(self, fallback: ErrorContext) -> Self {
        match self {
            Self::RelayPost { .. } => self,
            Self::SlackApi { context, reason } => Self::RelayPost { context, reason },
            other => Self::RelayPost {
                context: fallback,
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
