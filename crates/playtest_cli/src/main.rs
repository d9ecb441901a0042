use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use playtest_core::{run_batch, run_scenario_file, ScenarioReport};
use tracing::info;

#[derive(Parser)]
#[command(version, about = "Replay scripted dungeon playtests headlessly")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario file and print its JSON report.
    Run(RunArgs),
    /// Run every scenario under a directory.
    Batch(BatchArgs),
    /// Pretty-print an existing report.
    Report(ReportArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    scenario: PathBuf,
    #[arg(long)]
    id: Option<String>,
    /// Also write the report to this file.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct BatchArgs {
    #[arg(long, default_value = "scenarios")]
    dir: PathBuf,
    #[arg(long)]
    id: Option<String>,
    /// Write one `<id>.json` report per scenario here.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long)]
    input: PathBuf,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt::try_init().ok();
    let cli = Cli::parse();
    let passed = match cli.command {
        Commands::Run(args) => handle_run(args)?,
        Commands::Batch(args) => handle_batch(args)?,
        Commands::Report(args) => handle_report(args)?,
    };
    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn default_run_id() -> String {
    format!("run-{}", Utc::now().format("%Y%m%dT%H%M%S"))
}

fn handle_run(args: RunArgs) -> Result<bool> {
    let run_id = args.id.unwrap_or_else(default_run_id);
    let report = run_scenario_file(&args.scenario, run_id)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(out) = args.out.as_deref() {
        write_report(out, &report)?;
        println!("Report written to {}", out.display());
    }
    Ok(report.passed())
}

fn handle_batch(args: BatchArgs) -> Result<bool> {
    let run_id = args.id.unwrap_or_else(default_run_id);
    let reports = run_batch(&args.dir, &run_id)?;
    if reports.is_empty() {
        println!("No scenarios under {}", args.dir.display());
        return Ok(true);
    }

    for report in &reports {
        print_summary(report);
        if let Some(dir) = args.out_dir.as_deref() {
            write_report(&dir.join(format!("{}.json", report.id)), report)?;
        }
    }
    let failed = reports.iter().filter(|report| !report.passed()).count();
    info!(target: "playtest", dir = %args.dir.display(), total = reports.len(), failed, "batch finished");
    println!("{} scenarios, {} failed", reports.len(), failed);
    Ok(failed == 0)
}

fn handle_report(args: ReportArgs) -> Result<bool> {
    let data = fs::read_to_string(&args.input)
        .with_context(|| format!("reading report {}", args.input.display()))?;
    let report: ScenarioReport = serde_json::from_str(&data)
        .with_context(|| format!("parsing report {}", args.input.display()))?;
    print_summary(&report);
    for check in &report.checks {
        println!(
            "  [{:?}] {}: expected {}, got {}",
            check.status, check.name, check.expected, check.actual
        );
    }
    if !report.trace.is_empty() {
        println!("  trace:");
        for entry in &report.trace {
            println!(
                "    tick {:>4}  {:<15} {}",
                entry.tick,
                entry.topic.as_str(),
                entry.value
            );
        }
    }
    Ok(report.passed())
}

fn print_summary(report: &ScenarioReport) {
    println!(
        "Report {} ({}) -> {:?} ({}/{} checks, {:.2})",
        report.id,
        report.scenario.name,
        report.summary.status,
        report.summary.passed,
        report.summary.passed + report.summary.failed,
        report.summary.score
    );
}

fn write_report(path: &Path, report: &ScenarioReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("writing report {}", path.display()))
}
