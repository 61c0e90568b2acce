//! ShareMirror CLI - Command-line interface for ShareMirror
//!
//! Provides commands for:
//! - Registering provider accounts
//! - Creating and administering mirror tasks
//! - Running one reconciliation pass in the foreground
//! - Reading the task log
//! - Inspecting the configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    account::AccountCommand, config::ConfigCommand, logs::LogsCommand, run::RunCommand,
    task::TaskCommand, CliContext,
};
use output::OutputFormat;
use sharemirror_core::config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "sharemirror",
    version,
    about = "Mirror shared cloud folders into your own drive"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage provider accounts
    #[command(subcommand)]
    Account(AccountCommand),
    /// Manage mirror tasks
    #[command(subcommand)]
    Task(TaskCommand),
    /// Run one reconciliation pass now
    Run(RunCommand),
    /// Show the task log
    Logs(LogsCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let ctx = CliContext {
        config_path: cli.config.unwrap_or_else(Config::default_path),
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        },
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Account(cmd) => cmd.execute(&ctx).await,
        Commands::Task(cmd) => cmd.execute(&ctx).await,
        Commands::Run(cmd) => cmd.execute(&ctx).await,
        Commands::Logs(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}
