//! Stack commands - deploy, delete and validate stacks

use bettercf_cloud::{DeployOptions, Settings};
use bettercf_core::StackSpec;
use console::style;
use serde_json::json;
use std::path::Path;

use super::{interruptible, read_template, reconciler, spinner};
use crate::error::{CliError, Result};

/// Run the stack deploy command
pub async fn deploy(
    settings: &Settings,
    stack_config_path: &Path,
    template_path: Option<&Path>,
) -> Result<()> {
    let spec = StackSpec::from_file(stack_config_path)?;
    let mut options = DeployOptions::new();
    if let Some(path) = template_path {
        options = options.with_local_template(read_template(path)?);
    }

    println!(
        "{} Deploying {} from {} version {}",
        style("→").blue().bold(),
        style(spec.stack_name()).cyan(),
        style(&spec.template.name).cyan(),
        style(&spec.template.version).yellow()
    );
    if options.local_template.is_some() {
        println!("  {} Using local template body", style("→").blue());
    }
    if spec.has_overrides() {
        println!(
            "  {} Applying {} resource override(s)",
            style("→").blue(),
            spec.resource_overrides.count()
        );
    }

    let progress = spinner("Checking stack");
    let reconciler = reconciler(settings, &progress).await;

    let result = interruptible(async {
        reconciler
            .deploy(&spec, &options)
            .await
            .map_err(CliError::from)
    })
    .await;
    progress.finish_and_clear();
    let outcome = result?;

    println!(
        "{} Stack {} {} ({})",
        style("✓").green().bold(),
        style(&outcome.stack_name).cyan(),
        outcome.action,
        style(&outcome.status).yellow()
    );
    Ok(())
}

/// Run the stack delete command
pub async fn delete(settings: &Settings, stack_name: &str) -> Result<()> {
    println!(
        "{} Deleting stack {}",
        style("→").blue().bold(),
        style(stack_name).cyan()
    );

    let progress = spinner("Checking stack");
    let reconciler = reconciler(settings, &progress).await;

    let result = interruptible(async {
        reconciler
            .delete(stack_name)
            .await
            .map_err(CliError::from)
    })
    .await;
    progress.finish_and_clear();
    let outcome = result?;

    println!(
        "{} Stack {} {}",
        style("✓").green().bold(),
        style(&outcome.stack_name).cyan(),
        outcome.action
    );
    Ok(())
}

/// Run the stack validate command
///
/// Offline: parses the stack config and reports what a deploy would target.
pub fn validate(stack_config_path: &Path, json_output: bool) -> Result<()> {
    let spec = StackSpec::from_file(stack_config_path)?;

    if json_output {
        let report = json!({
            "valid": true,
            "stackName": spec.stack_name(),
            "overrideCount": spec.resource_overrides.count(),
            "spec": spec,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).map_err(|e| CliError::Other {
                message: e.to_string()
            })?
        );
        return Ok(());
    }

    println!(
        "{} Stack config {} is valid",
        style("✓").green().bold(),
        stack_config_path.display()
    );
    println!("  Stack name: {}", style(spec.stack_name()).cyan());
    println!(
        "  Template:   {} {}",
        spec.template.name,
        style(&spec.template.version).yellow()
    );
    println!(
        "  Region:     {} ({})",
        spec.region,
        style(spec.region.full_name()).dim()
    );
    if let Some(role_arn) = &spec.role_arn {
        println!("  Role:       {role_arn}");
    }
    println!("  Parameters: {}", spec.template_parameters.len());
    println!("  Overrides:  {}", spec.resource_overrides.count());
    Ok(())
}
