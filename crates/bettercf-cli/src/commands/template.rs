//! Template commands - push template artifacts and look up their versions

use bettercf_cloud::{ArtifactStore, AwsProvider, Settings};
use bettercf_core::{Increment, Version};
use console::style;
use std::path::Path;

use super::read_template;
use crate::error::Result;

/// Run the template push command
pub async fn push(
    settings: &Settings,
    name: &str,
    template_path: &Path,
    template_version: Option<&str>,
    major: bool,
    micro: bool,
) -> Result<()> {
    // Everything checkable offline is checked before touching AWS
    let template = read_template(template_path)?;
    let increment = Increment::from_flags(major, micro)?;
    let version = template_version.map(Version::parse).transpose()?;

    let provider = AwsProvider::from_settings(&settings.aws).await;
    let store = ArtifactStore::locate(&provider, &settings.product).await?;

    let pushed = store.push(name, &template, version, increment).await?;

    println!(
        "{} Pushed {} version {} to {}",
        style("✓").green().bold(),
        style(&pushed.name).cyan(),
        style(&pushed.version).yellow(),
        style(store.bucket()).dim()
    );
    Ok(())
}

/// Run the template latest command
pub async fn latest(settings: &Settings, name: &str) -> Result<()> {
    let provider = AwsProvider::from_settings(&settings.aws).await;
    let store = ArtifactStore::locate(&provider, &settings.product).await?;

    let version = store.latest_version(name).await?;
    println!("{version}");
    Ok(())
}
