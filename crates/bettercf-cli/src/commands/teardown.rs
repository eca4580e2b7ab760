//! Teardown command - remove the management stack

use bettercf_cloud::{ManagementStack, Settings};
use console::style;

use super::{interruptible, reconciler, spinner};
use crate::error::{CliError, Result};

/// Run the teardown command
pub async fn run(settings: &Settings, force: bool) -> Result<()> {
    println!(
        "{} Tearing down {}",
        style("→").blue().bold(),
        style(&settings.product).cyan()
    );
    if force {
        println!(
            "  {} Emptying the management bucket first; locked buckets must be emptied manually",
            style("⚠").yellow()
        );
    }

    let progress = spinner("Deleting management stack");
    let reconciler = reconciler(settings, &progress).await;
    let management = ManagementStack::new(&reconciler);

    let result = interruptible(async { management.teardown(force).await.map_err(CliError::from) }).await;
    progress.finish_and_clear();
    let outcome = result?;

    println!(
        "{} Management stack {} {}",
        style("✓").green().bold(),
        style(&outcome.stack_name).cyan(),
        outcome.action
    );
    Ok(())
}
