// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod runner;

use clap::{Parser, Subcommand};
use labwired_clic_config::StimulusScript;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "LabWired CLIC model runner",
    long_about = None
)]
struct Cli {
    /// Enable per-register and per-tick tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a stimulus script (YAML) against the controller and check its expectations.
    Run(RunArgs),

    /// Parse and validate a stimulus script without running it.
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the stimulus script (YAML)
    #[arg(short, long)]
    script: PathBuf,

    /// Write the run report (JSON) to this path
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Path to the stimulus script (YAML)
    #[arg(short, long)]
    script: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Validate(args) => validate(args),
    }
}

fn load_script(path: &Path) -> Option<StimulusScript> {
    match StimulusScript::from_file(path) {
        Ok(script) => Some(script),
        Err(e) => {
            error!("Failed to load stimulus script {:?}: {:#}", path, e);
            None
        }
    }
}

fn validate(args: ValidateArgs) -> ExitCode {
    match load_script(&args.script) {
        Some(script) => {
            info!(
                "{:?}: {} lines, {} harts, {} steps",
                args.script,
                script.clic.num_interrupts,
                script.clic.num_harts,
                script.steps.len()
            );
            ExitCode::from(EXIT_PASS)
        }
        None => ExitCode::from(EXIT_CONFIG_ERROR),
    }
}

fn write_report(path: &Path, report: &runner::RunReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let f = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(f, report)?;
    Ok(())
}

fn run(args: RunArgs) -> ExitCode {
    let Some(script) = load_script(&args.script) else {
        return ExitCode::from(EXIT_CONFIG_ERROR);
    };

    let report = match runner::run_script(&script) {
        Ok(report) => report,
        Err(e) => {
            error!("Run failed: {:#}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    if let Some(path) = &args.output {
        if let Err(e) = write_report(path, &report) {
            error!("Failed to write report {:?}: {:#}", path, e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
        info!("Report written to {:?}", path);
    }

    if report.passed() {
        ExitCode::from(EXIT_PASS)
    } else {
        for failed in report.expectations.iter().filter(|e| !e.passed) {
            error!(
                "FAIL step {} (tick {}): {:?}, observed {}",
                failed.step, failed.tick, failed.expectation, failed.observed
            );
        }
        ExitCode::from(EXIT_ASSERT_FAIL)
    }
}
