use std::path::{Path, PathBuf};
use std::process;

use auction_core::scenario::{self, Scenario, ScenarioReport};
use auction_core::Address;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// auction-cli: binding-bid auction engine
///
/// Run scripted auction scenarios and inspect their outcome.
#[derive(Parser)]
#[command(name = "auction-cli", version, about, long_about = None)]
struct Cli {
    /// Suppress normal output; only the exit code reports the result
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and report every step
    Run {
        /// Path to scenario .json file
        file: PathBuf,
        /// Output the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the SHA-256 digest of the auction state after a scenario
    Digest {
        /// Path to scenario .json file
        file: PathBuf,
    },

    /// Write a starter scenario
    Init {
        /// Destination file; prints to stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let exit_code = match cli.command {
        Commands::Run { file, json } => cmd_run(&file, json, cli.quiet),
        Commands::Digest { file } => cmd_digest(&file),
        Commands::Init { output } => cmd_init(output, cli.quiet),
        Commands::Version => {
            if !cli.quiet {
                println!(
                    "auction-cli {} (auction-core {})",
                    env!("CARGO_PKG_VERSION"),
                    env!("CARGO_PKG_VERSION")
                );
            }
            0
        }
    };

    process::exit(exit_code);
}

fn init_tracing(quiet: bool, verbose: u8) {
    let default = match (quiet, verbose) {
        (true, _) => "off",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_error(err: impl std::fmt::Display) -> i32 {
    eprintln!("{} {}", "error:".red().bold(), err);
    2
}

fn load_and_run(file: &Path) -> Result<ScenarioReport, auction_core::Error> {
    info!(file = %file.display(), "loading scenario");
    let scenario = Scenario::from_file(file)?;
    scenario::run_scenario(&scenario)
}

// ── Commands ──────────────────────────────────────────────

/// Exit 0 when every step matched, 1 on a mismatch, 2 on load errors
fn cmd_run(file: &Path, json: bool, quiet: bool) -> i32 {
    let report = match load_and_run(file) {
        Ok(report) => report,
        Err(e) => return report_error(e),
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => return report_error(e),
        }
    } else if !quiet {
        print_report(&report);
    }

    if report.success {
        0
    } else {
        1
    }
}

fn cmd_digest(file: &Path) -> i32 {
    match load_and_run(file) {
        Ok(report) => {
            println!("{}", report.state_digest);
            0
        }
        Err(e) => report_error(e),
    }
}

fn cmd_init(output: Option<PathBuf>, quiet: bool) -> i32 {
    let template = scenario::template(
        Address::from_low_u8(0x01),
        Address::from_low_u8(0xa0),
        Address::from_low_u8(0xee),
    );
    let text = match serde_json::to_string_pretty(&template) {
        Ok(text) => text,
        Err(e) => return report_error(e),
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, text + "\n") {
                return report_error(format!("cannot write {}: {}", path.display(), e));
            }
            if !quiet {
                println!("{} {}", "created".green(), path.display());
            }
        }
        None => println!("{}", text),
    }
    0
}

// ── Output ────────────────────────────────────────────────

fn print_report(report: &ScenarioReport) {
    for step in &report.steps {
        let status = match (step.success, step.matched) {
            (true, true) => "ok".green(),
            (false, true) => "rejected".yellow(),
            (_, false) => "MISMATCH".red().bold(),
        };
        println!(
            "{:>3}  {:<14} {} @{}  {}",
            step.index, step.op, step.caller, step.block, status
        );
        if let Some(err) = &step.error {
            println!("       {}", err.dimmed());
        }
        for event in &step.events {
            let body = serde_json::to_string(event).unwrap_or_else(|_| event.name().to_string());
            println!("       {}", body.cyan());
        }
    }

    let state = &report.final_state;
    println!();
    println!("state:   {:?}", state.state);
    if let Some(leader) = state.highest_bidder {
        println!(
            "leader:  {} (bid {}, binding {})",
            leader, state.highest_bid, state.highest_binding_bid
        );
    }
    println!("escrow:  {}", state.escrow_total());
    println!("digest:  {}", report.state_digest);

    let mismatches = report.mismatches().count();
    if mismatches == 0 {
        println!("{}", format!("{} steps, all as expected", report.steps.len()).green());
    } else {
        println!(
            "{}",
            format!("{} of {} steps did not match", mismatches, report.steps.len()).red()
        );
    }
}
