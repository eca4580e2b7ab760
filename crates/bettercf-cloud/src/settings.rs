//! Tool settings
//!
//! Stored in `~/.config/bettercf/config.yaml`; every field has a default so
//! an absent file is equivalent to an empty one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CloudError, Result};
use crate::poll::PollConfig;

/// Product name used when none is configured
pub const DEFAULT_PRODUCT: &str = "BetterCF";

/// Settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Names the management stack, bucket and parameter path
    #[serde(default = "default_product")]
    pub product: String,

    /// Stack status polling
    #[serde(default)]
    pub poll: PollConfig,

    /// AWS SDK overrides
    #[serde(default)]
    pub aws: AwsSettings,
}

/// Overrides for the AWS SDK's environment-based configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

fn default_product() -> String {
    DEFAULT_PRODUCT.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            product: default_product(),
            poll: PollConfig::default(),
            aws: AwsSettings::default(),
        }
    }
}

impl Settings {
    /// Load from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Ok(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Get default settings path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            CloudError::Settings("could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("bettercf").join("config.yaml"))
    }

    fn validate(&self) -> Result<()> {
        if self.product.is_empty() || self.product.contains('/') {
            return Err(CloudError::Settings(format!(
                "product '{}' must be non-empty and contain no '/'",
                self.product
            )));
        }
        Ok(())
    }

    /// SSM parameter holding the management bucket name
    pub fn management_parameter(&self) -> String {
        management_parameter(&self.product)
    }

    /// Name of the management stack
    pub fn management_stack_name(&self) -> String {
        management_stack_name(&self.product)
    }
}

/// `/<product>/.management/<product>-management-bucket-name`
pub fn management_parameter(product: &str) -> String {
    format!("/{product}/.management/{product}-management-bucket-name")
}

/// `<product>-management`
pub fn management_stack_name(product: &str) -> String {
    format!("{product}-management")
}
