//! CLI commands

pub mod init;
pub mod stack;
pub mod teardown;
pub mod template;

use bettercf_cloud::{AwsProvider, Settings, StackReconciler};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value as JsonValue;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::error::{CliError, Result};

/// Read a JSON template body from disk
pub fn read_template(path: &Path) -> Result<JsonValue> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| CliError::Template {
        message: format!("{} is not valid JSON: {e}", path.display()),
        help: Some("templates must be JSON documents".to_string()),
    })
}

/// Spinner shown while a stack settles
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.blue} {msg}") {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]));
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// AWS-backed reconciler reporting statuses on `spinner`
pub async fn reconciler(settings: &Settings, spinner: &ProgressBar) -> StackReconciler<AwsProvider> {
    let provider = AwsProvider::from_settings(&settings.aws).await;
    let progress = spinner.clone();

    StackReconciler::new(provider)
        .with_product(settings.product.clone())
        .with_poll_config(settings.poll.clone())
        .with_observer(Box::new(move |stack: &str, status: &str| {
            progress.set_message(format!("{} {}", style(stack).cyan(), style(status).yellow()));
        }))
}

/// Run `operation`, giving up on Ctrl-C
pub async fn interruptible<T, F>(operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        result = operation => result,
        _ = tokio::signal::ctrl_c() => Err(CliError::Interrupted),
    }
}
