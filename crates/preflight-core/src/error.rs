//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse {source_name}: {error}")]
    Parse {
        source_name: String,
        #[source]
        error: serde_yaml::Error,
    },

    #[error("Invalid version '{version}': {message}")]
    InvalidVersion { version: String, message: String },

    #[error("Invalid structure in {source_name}: {message}")]
    Schema { source_name: String, message: String },

    #[error("{kind} not found: {message}")]
    NotFound { kind: String, message: String },

    #[error("Unrecognized components declaration {source_name}: {message}")]
    Format { source_name: String, message: String },

    #[error("Upgrade from {installed} to {target} is not possible: {reason}")]
    UpgradeDenied {
        installed: String,
        target: String,
        reason: String,
    },

    #[error("It is not possible to upgrade, since nothing is installed on the cluster")]
    NotInstalled,

    #[error("Failed to get the installation status")]
    StatusUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn parse(source_name: impl Into<String>, error: serde_yaml::Error) -> Self {
        CoreError::Parse {
            source_name: source_name.into(),
            error,
        }
    }

    pub(crate) fn schema(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Schema {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn not_found(kind: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub(crate) fn format(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Format {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Check if this error reports a missing element
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }

    /// Check if this error comes from undecodable input
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            CoreError::Parse { .. } | CoreError::InvalidVersion { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
