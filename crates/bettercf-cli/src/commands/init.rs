//! Init command - deploy the management stack

use bettercf_cloud::{BucketMode, ManagementStack, Settings};
use console::style;
use std::path::Path;

use super::{interruptible, read_template, reconciler, spinner};
use crate::error::{CliError, Result};

/// Run the init command
pub async fn run(settings: &Settings, template_path: &Path, mode: BucketMode) -> Result<()> {
    let template = read_template(template_path)?;

    println!(
        "{} Initialising {} in {} mode",
        style("→").blue().bold(),
        style(&settings.product).cyan(),
        style(mode).yellow()
    );

    let progress = spinner("Checking management stack");
    let reconciler = reconciler(settings, &progress).await;
    let management = ManagementStack::new(&reconciler);

    let result = interruptible(async {
        management
            .initialise(template.to_string(), mode)
            .await
            .map_err(CliError::from)
    })
    .await;
    progress.finish_and_clear();
    let outcome = result?;

    println!(
        "{} Management stack {} {} ({})",
        style("✓").green().bold(),
        style(&outcome.stack_name).cyan(),
        outcome.action,
        style(&outcome.status).yellow()
    );
    if mode.is_locked() {
        println!(
            "  {} {} buckets keep their objects; `bettercf teardown --force` cannot empty them",
            style("!").yellow().bold(),
            mode
        );
    }
    Ok(())
}
