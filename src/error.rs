/// Error types for host, store and rule failures
use thiserror::Error;

/// Failures reported by the browser's tab and tab group API
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("tab not found: {0}")]
    TabNotFound(String),

    #[error("host call failed: {0}")]
    Failed(String),

    #[error("could not decode host value: {0}")]
    Decode(String),
}

impl HostError {
    /// Classify a raw host error message
    ///
    /// The browser reports vanished objects as "No group with id: 7." and
    /// "No tab with id: 3."; anything else is a plain failure.
    pub fn from_message(message: impl Into<String>) -> HostError {
        let message = message.into();
        if message.contains("No group with id") {
            HostError::GroupNotFound(message)
        } else if message.contains("No tab with id") {
            HostError::TabNotFound(message)
        } else {
            HostError::Failed(message)
        }
    }

    pub fn is_group_not_found(&self) -> bool {
        matches!(self, HostError::GroupNotFound(_))
    }
}

/// Failures reading or writing the persistent key-value store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("failed to read `{key}`: {message}")]
    Read { key: String, message: String },

    #[error("failed to write `{key}`: {message}")]
    Write { key: String, message: String },

    #[error("malformed `{key}` record: {message}")]
    Decode { key: String, message: String },
}

/// Rejections from the validated record constructors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule domain is empty")]
    EmptyDomain,

    #[error("`{0}` is not a valid hostname")]
    InvalidDomain(String),

    #[error("group title is empty")]
    EmptyGroupTitle,
}
