//! BetterCF CLI - Versioned CloudFormation template storage and stack deployment

use bettercf_cloud::{BucketMode, Settings};
use clap::{Parser, Subcommand, ValueEnum};
use humantime_serde::re::humantime;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::prelude::*;

mod commands;
mod error;
mod exit_codes;

use error::Result;

#[derive(Parser)]
#[command(name = "bettercf")]
#[command(author = "BetterCF Contributors")]
#[command(version)]
#[command(about = "Versioned CloudFormation template storage and stack deployment", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Settings file (default: ~/.config/bettercf/config.yaml)
    #[arg(long, global = true, env = "BETTERCF_CONFIG")]
    config: Option<PathBuf>,

    /// Time between stack status checks, e.g. 10s (overrides the settings file)
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    poll_interval: Option<Duration>,

    /// Give up waiting for a stack after this long, e.g. 45m (default: wait indefinitely)
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialise BetterCF in your AWS account
    Init {
        /// Management stack template (JSON)
        #[arg(short = 't', long)]
        template_path: PathBuf,

        /// Object lock mode of the management bucket
        #[arg(short, long, value_enum, default_value_t = Mode::Standard)]
        mode: Mode,
    },

    /// Remove all BetterCF resources from your AWS account
    Teardown {
        /// Empty the management bucket before deleting it (fails for locked buckets)
        #[arg(short, long)]
        force: bool,
    },

    /// Push templates and look up their versions
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Deploy and delete stacks from pushed templates
    Stack {
        #[command(subcommand)]
        command: StackCommands,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Push a template to the management bucket
    Push {
        /// Template name
        #[arg(short, long)]
        name: String,

        /// Template file (JSON)
        #[arg(short = 't', long)]
        template_path: PathBuf,

        /// Version to push as, e.g. 1.0.0 (default: bump the latest version)
        #[arg(short = 'v', long, conflicts_with_all = ["major", "micro"])]
        template_version: Option<String>,

        /// Bump the major version instead of the minor
        #[arg(long)]
        major: bool,

        /// Bump the micro version instead of the minor
        #[arg(long)]
        micro: bool,
    },

    /// Print the latest pushed version of a template
    Latest {
        /// Template name
        #[arg(short, long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum StackCommands {
    /// Create or update a stack from a stack config
    Deploy {
        /// Stack config file (JSON)
        #[arg(short = 'c', long)]
        stack_config_path: PathBuf,

        /// Deploy this local template instead of the pushed one
        #[arg(short = 't', long)]
        template_path: Option<PathBuf>,
    },

    /// Delete a stack
    Delete {
        /// Stack name
        #[arg(short = 's', long)]
        stack_name: String,
    },

    /// Check a stack config without deploying it
    Validate {
        /// Stack config file (JSON)
        #[arg(short = 'c', long)]
        stack_config_path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Standard,
    Compliance,
    Governance,
}

impl From<Mode> for BucketMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Standard => BucketMode::Standard,
            Mode::Compliance => BucketMode::Compliance,
            Mode::Governance => BucketMode::Governance,
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_settings(
    path: Option<&Path>,
    poll_interval: Option<Duration>,
    timeout: Option<Duration>,
) -> Result<Settings> {
    let mut settings = match path {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    if let Some(interval) = poll_interval {
        settings.poll = settings.poll.with_interval(interval);
    }
    if let Some(timeout) = timeout {
        settings.poll = settings.poll.with_timeout(timeout);
    }
    Ok(settings)
}

async fn run(cli: Cli) -> Result<()> {
    // Validation never needs settings or credentials
    if let Commands::Stack {
        command:
            StackCommands::Validate {
                stack_config_path,
                json,
            },
    } = &cli.command
    {
        return commands::stack::validate(stack_config_path, *json);
    }

    let settings = load_settings(cli.config.as_deref(), cli.poll_interval, cli.timeout)?;

    match cli.command {
        Commands::Init {
            template_path,
            mode,
        } => commands::init::run(&settings, &template_path, mode.into()).await,

        Commands::Teardown { force } => commands::teardown::run(&settings, force).await,

        Commands::Template { command } => match command {
            TemplateCommands::Push {
                name,
                template_path,
                template_version,
                major,
                micro,
            } => {
                commands::template::push(
                    &settings,
                    &name,
                    &template_path,
                    template_version.as_deref(),
                    major,
                    micro,
                )
                .await
            }
            TemplateCommands::Latest { name } => commands::template::latest(&settings, &name).await,
        },

        Commands::Stack { command } => match command {
            StackCommands::Deploy {
                stack_config_path,
                template_path,
            } => {
                commands::stack::deploy(&settings, &stack_config_path, template_path.as_deref())
                    .await
            }
            StackCommands::Delete { stack_name } => {
                commands::stack::delete(&settings, &stack_name).await
            }
            StackCommands::Validate {
                stack_config_path,
                json,
            } => commands::stack::validate(&stack_config_path, json),
        },
    }
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let code = match run(cli).await {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
