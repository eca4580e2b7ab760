//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Stack config parsing failure: {message}")]
    ConfigValidation {
        message: String,
        help: Option<String>,
    },

    #[error("Version '{input}' is not of the 'X.Y' or 'X.Y.Z' format")]
    VersionFormat { input: String },

    #[error("No versions to resolve")]
    NoVersions,

    #[error("Versions (e.g. '{example}') are not uniformly of the 'X.Y' or 'X.Y.Z' format")]
    MixedVersionFormats { example: String },

    #[error("Cannot do a micro version increment on '{version}' which has no micro segment")]
    NoMicroSegment { version: String },

    #[error("Cannot increment '{version}': the {segment} segment is already at its maximum")]
    VersionOverflow {
        version: String,
        segment: &'static str,
    },

    #[error("Cannot specify a major AND micro version increment at the same time")]
    ConflictingIncrement,

    #[error("Region '{input}' not recognized")]
    UnknownRegion { input: String },

    #[error("Invalid resource overrides: {0}")]
    Override(#[from] OverrideError),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Create a config validation error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
            help: None,
        }
    }

    /// Create a config validation error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a version format error
    pub fn version_format(input: impl Into<String>) -> Self {
        Self::VersionFormat {
            input: input.into(),
        }
    }
}

/// Structural errors raised while applying resource overrides
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OverrideError {
    #[error("trying to delete key '{key}' but it is not found in resources")]
    MissingDeleteTarget { key: String },

    #[error("trying to merge into key '{key}' but it is not found in resources")]
    MissingMergeTarget { key: String },

    #[error("cannot merge {patch} into {existing} at key '{key}' (only mappings and lists can be merged)")]
    Unmergeable {
        key: String,
        existing: &'static str,
        patch: &'static str,
    },

    #[error("cannot apply '{key}' to a {found}, expected a mapping")]
    NotAMapping { key: String, found: &'static str },
}

pub type Result<T> = std::result::Result<T, CoreError>;
