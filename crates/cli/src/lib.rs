pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "santa",
    about = "Santa voice agent operator CLI",
    long_about = "Inspect configuration, check runtime readiness, and resolve deployment targets for the Santa voice agent.",
    after_help = "Examples:\n  santa doctor --json\n  santa config\n  santa deploy-target --branch main --base-domain example.app"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, SignalWire readiness, catalog mode, and web assets")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Resolve the app name and URL a branch or pull request deploys to")]
    DeployTarget {
        #[arg(long, conflicts_with = "pr", required_unless_present = "pr")]
        branch: Option<String>,
        #[arg(long, help = "Pull request number")]
        pr: Option<u64>,
        #[arg(long, help = "Domain the deployed apps are served under")]
        base_domain: String,
    },
}

pub fn run() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::DeployTarget { branch, pr, base_domain } => {
            commands::deploy_target::run(branch.as_deref(), pr, &base_domain)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
