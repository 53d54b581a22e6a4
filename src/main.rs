// src/main.rs

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod analyzer;
mod backup;
mod config;
mod detector;
mod error;
mod generator;
mod manifest;
mod materializer;
mod migrator;
mod model;
mod parser;
mod report;
mod resolver;
mod transform;

use config::{CliOverrides, MigrateOptions};
use error::MigrateError;
use generator::RoutesDirectory;
use migrator::{MigrationStatus, Migrator, StdinConfirm};
use transform::{PageStrategy, ShellVariant};

#[derive(Parser, Debug)]
#[command(
    name = "hopr",
    version,
    about = "Migrate a Next.js App Router project to TanStack Start"
)]
struct Cli {
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect the framework, routing convention and package manager
    Detect {
        /// Project root
        #[arg(default_value = ".", value_name = "PATH")]
        path: PathBuf,

        /// Print the detection result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rewrite the project in place
    Migrate(MigrateArgs),
}

#[derive(Args, Debug)]
struct MigrateArgs {
    /// Project root
    #[arg(default_value = ".", value_name = "PATH")]
    path: PathBuf,

    /// Source framework, instead of detecting it
    #[arg(long, value_name = "FW")]
    from: Option<String>,

    /// Target framework
    #[arg(long, value_name = "FW")]
    to: Option<String>,

    /// Show what would change without touching the project
    #[arg(long)]
    dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Copy the project to .hopr-backup/ first
    #[arg(long)]
    backup: bool,

    #[arg(long, value_enum)]
    variant: Option<ShellVariant>,

    #[arg(long, value_enum)]
    strategy: Option<PageStrategy>,

    #[arg(long = "routes-dir", value_enum)]
    routes_dir: Option<RoutesDirectory>,

    /// Fail when no App Router routes are found
    #[arg(long)]
    strict: bool,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "hopr=debug" } else { "hopr=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Detect { path, json } => {
            // 1) detect and print
            let detection = detector::detect(&path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&detection)?);
            } else {
                report::print_detection(&detection);
            }
            Ok(())
        }
        Command::Migrate(args) => migrate(args),
    }
}

fn migrate(args: MigrateArgs) -> Result<()> {
    // 1) options: defaults < hopr.config.json < flags
    let overrides = CliOverrides {
        from: args.from,
        to: args.to,
        variant: args.variant,
        strategy: args.strategy,
        routes_directory: args.routes_dir,
        dry_run: args.dry_run,
        yes: args.yes,
        backup: args.backup,
        strict: args.strict,
    };
    let options = MigrateOptions::resolve(&args.path, overrides)
        .with_context(|| format!("loading options for {}", args.path.display()))?;

    // 2) run
    let outcome = match Migrator::new(&args.path, options).run(&mut StdinConfirm) {
        Ok(outcome) => outcome,
        Err(MigrateError::Validation(reasons)) => {
            for reason in &reasons {
                eprintln!("  • {reason}");
            }
            anyhow::bail!("migration prerequisites not met ({} problems)", reasons.len());
        }
        Err(e) => return Err(e).context("migration failed"),
    };

    // 3) report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report::outcome_json(&outcome))?);
    } else {
        if outcome.status != MigrationStatus::Cancelled {
            report::print_detection(&outcome.detection);
        }
        report::print_outcome(&outcome);
    }
    Ok(())
}
