//! CLI error types with exit code handling
//!
//! Library errors are folded into [`CliError`] so every failure carries a
//! diagnostic code, optional help and an exit code.

use bettercf_cloud::CloudError;
use bettercf_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Stack config or settings rejected
    #[error("Configuration error: {message}")]
    #[diagnostic(code(bettercf::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Template body unreadable or overrides failed
    #[error("Template error: {message}")]
    #[diagnostic(code(bettercf::cli::template))]
    Template {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Version parsing, resolution or increment failed
    #[error("Version error: {message}")]
    #[diagnostic(code(bettercf::cli::version))]
    Version {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Remote resource missing
    #[error("{message}")]
    #[diagnostic(code(bettercf::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Stack did not reach a success status
    #[error("Deployment failed: {message}")]
    #[diagnostic(code(bettercf::cli::deployment))]
    Deployment {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Provider rejected a call
    #[error("Provider error: {message}")]
    #[diagnostic(code(bettercf::cli::provider))]
    Provider { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(bettercf::cli::io))]
    Io { message: String },

    /// Cancelled by the user
    #[error("Interrupted")]
    #[diagnostic(
        code(bettercf::cli::interrupted),
        help("the provider keeps working on any stack operation already issued")
    )]
    Interrupted,

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(bettercf::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Template { .. } => exit_codes::TEMPLATE_ERROR,
            CliError::Version { .. } => exit_codes::VERSION_ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Deployment { .. } => exit_codes::DEPLOYMENT_FAILED,
            CliError::Provider { .. } => exit_codes::PROVIDER_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Interrupted => exit_codes::INTERRUPTED,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    fn version(message: impl Into<String>, help: Option<&str>) -> Self {
        Self::Version {
            message: message.into(),
            help: help.map(str::to_string),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConfigValidation { message, help } => CliError::Config { message, help },
            CoreError::UnknownRegion { .. } => CliError::Config {
                message: err.to_string(),
                help: None,
            },
            CoreError::VersionFormat { .. } | CoreError::MixedVersionFormats { .. } => {
                CliError::version(err.to_string(), Some("versions look like 1.2 or 1.2.3"))
            }
            CoreError::NoVersions => CliError::version(err.to_string(), None),
            CoreError::NoMicroSegment { .. } => CliError::version(
                err.to_string(),
                Some("pass --template-version with an X.Y.Z version to start using micro versions"),
            ),
            CoreError::VersionOverflow { .. } => CliError::version(
                err.to_string(),
                Some("pass --template-version to push an explicit version"),
            ),
            CoreError::ConflictingIncrement => CliError::version(
                err.to_string(),
                Some("use either --major or --micro; without either a minor bump is made"),
            ),
            CoreError::Override(e) => CliError::Template {
                message: format!("resource overrides failed: {e}"),
                help: Some(
                    "keys starting with >> insert, << delete and ^^ merge; other keys descend"
                        .to_string(),
                ),
            },
            CoreError::JsonParse(e) => CliError::Config {
                message: format!("invalid JSON: {e}"),
                help: None,
            },
            CoreError::Io(e) => CliError::from(e),
        }
    }
}

impl From<CloudError> for CliError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::Core(e) => CliError::from(e),
            CloudError::NotFound { kind, .. } => {
                let help = match kind {
                    "parameter" => Some("run `bettercf init` to create the management stack"),
                    "object" => Some("check the template name and version with `bettercf template latest`"),
                    _ => None,
                };
                CliError::NotFound {
                    message: err.to_string(),
                    help: help.map(str::to_string),
                }
            }
            CloudError::NoVersions { .. } => CliError::version(
                err.to_string(),
                Some("push the first version with --template-version"),
            ),
            CloudError::TerminalFailure { .. } => CliError::Deployment {
                message: err.to_string(),
                help: Some("inspect the stack events in the CloudFormation console".to_string()),
            },
            CloudError::AmbiguousStack { .. } | CloudError::Timeout { .. } => {
                CliError::Deployment {
                    message: err.to_string(),
                    help: None,
                }
            }
            CloudError::Provider { .. } => CliError::Provider {
                message: err.to_string(),
            },
            CloudError::Settings(message) => CliError::Config {
                message,
                help: None,
            },
            CloudError::Io(e) => CliError::from(e),
            other => CliError::Other {
                message: other.to_string(),
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

impl From<miette::Report> for CliError {
    fn from(err: miette::Report) -> Self {
        CliError::Other {
            message: format!("{:?}", err),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
