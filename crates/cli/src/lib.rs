pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use claimdesk_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "claimdesk",
    about = "Claimdesk operator CLI",
    long_about = "Inspect claimdesk configuration, run readiness checks, and evaluate the claim approval gate.",
    after_help = "Examples:\n  claimdesk doctor --json\n  claimdesk config\n  claimdesk gate pending-claim.json --can-approve"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to the claimdesk.toml config file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with secrets redacted"
    )]
    Config,
    #[command(about = "Validate config, credential readiness, and API client construction")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Evaluate whether the approval flow may be entered for a claim")]
    Gate {
        #[arg(help = "Path to a claim JSON file")]
        claim: PathBuf,
        #[arg(long, help = "Whether the calling operator holds the approve permission")]
        can_approve: bool,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

fn init_logging(config: &LoggingConfig) {
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.format {
        LogFormat::Compact => {
            let _ = tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .compact()
                .try_init();
        }
        LogFormat::Pretty => {
            let _ = tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .pretty()
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .json()
                .try_init();
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let load_options =
        LoadOptions { config_path: cli.config.clone(), require_file: cli.config.is_some() };

    let logging = AppConfig::load(load_options.clone())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match cli.command {
        Command::Config => commands::CommandResult {
            exit_code: 0,
            output: commands::config::run(load_options),
        },
        Command::Doctor { json } => commands::CommandResult {
            exit_code: 0,
            output: commands::doctor::run(load_options, json),
        },
        Command::Gate { claim, can_approve, json } => {
            commands::gate::run(&claim, can_approve, json)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
