//! CLI error types with exit code handling
//!
//! Every command returns [`CliError`], which carries a diagnostic code for
//! display and maps to one of the codes in [`crate::exit_codes`].

use miette::Diagnostic;
use preflight_core::CoreError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Input could not be decoded or has the wrong shape
    #[error("Invalid input: {message}")]
    #[diagnostic(code(preflight::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// An expected element is missing
    #[error("{message}")]
    #[diagnostic(code(preflight::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The version gate refused the upgrade
    #[error("{message}")]
    #[diagnostic(code(preflight::cli::upgrade_denied))]
    UpgradeDenied {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(preflight::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(preflight::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::VALIDATION_ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::UpgradeDenied { .. } => exit_codes::UPGRADE_DENIED,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Parse { .. } | CoreError::InvalidVersion { .. } | CoreError::Schema { .. } => {
                CliError::Input { message, help: None }
            }
            CoreError::Format { .. } => CliError::Input {
                message,
                help: Some(
                    "Use a list of {name, namespace} entries or an installation resource with spec.components"
                        .to_string(),
                ),
            },
            CoreError::NotFound { .. } => CliError::NotFound {
                message,
                help: Some("Pass --container if the installer uses a different container name".to_string()),
            },
            CoreError::UpgradeDenied { .. } => CliError::UpgradeDenied {
                message,
                help: Some("Only upgrades to the next minor release are supported".to_string()),
            },
            CoreError::NotInstalled => CliError::Other {
                message: format!("{}. Run an installation first", message),
            },
            CoreError::StatusUnavailable => CliError::Other { message },
            CoreError::Io(e) => CliError::Io {
                message: e.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Other {
            message: format!("Failed to encode JSON: {}", err),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_exit_codes() {
        let denied = preflight_core::check_upgrade("1.2.0", "2.0.0")
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(CliError::from(denied).exit_code(), exit_codes::UPGRADE_DENIED);

        let not_found = preflight_core::installer_image(&[]).unwrap_err();
        assert_eq!(CliError::from(not_found).exit_code(), exit_codes::NOT_FOUND);

        let invalid = preflight_core::check_upgrade("nope", "1.0.0").unwrap_err();
        assert_eq!(CliError::from(invalid).exit_code(), exit_codes::VALIDATION_ERROR);

        let format = preflight_core::parse_components("a: b\n", "inline").unwrap_err();
        assert_eq!(CliError::from(format).exit_code(), exit_codes::VALIDATION_ERROR);
    }
}
