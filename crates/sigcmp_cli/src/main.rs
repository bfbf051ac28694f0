//! sigcmp CLI
//!
//! Compares every pair of trace files recorded from the same recording and
//! writes JUnit, CSV and timeline reports.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{ArgGroup, Parser};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use sigcmp_compare::{BatchConfig, BatchReport, CompareConfig, TestType, discover, pair_count, run_batch_with};
use sigcmp_core::ElementKind;
use sigcmp_report::{ReportOptions, write_junit, write_pair_reports};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Warnings are mirrored into this file inside the output directory
const MISMATCH_LOG: &str = "mismatched_urls.log";

#[derive(Parser, Debug)]
#[command(name = "sigcmp")]
#[command(about = "Regression comparison of recorded signal traces", long_about = None)]
#[command(group(ArgGroup::new("inputs").required(true).multiple(true).args(["trace_folder", "traces"])))]
#[command(group(ArgGroup::new("outputs").required(true).multiple(true).args(["out_path", "junit_path"])))]
struct Cli {
    /// Folder scanned for trace files
    #[arg(short = 'b', long)]
    trace_folder: Option<PathBuf>,

    /// Explicit trace files
    #[arg(long, num_args = 1..)]
    traces: Vec<PathBuf>,

    /// Checkpoint label of the candidate build
    #[arg(short = 'l', long, num_args = 1..)]
    cp_label: Vec<String>,

    /// Directory for CSV and timeline reports
    #[arg(short, long)]
    out_path: Option<PathBuf>,

    /// JUnit XML output file
    #[arg(short, long)]
    junit_path: Option<PathBuf>,

    /// Which traces are paired: sil_sil or edp_sil
    #[arg(short, long, default_value = "sil_sil")]
    test_type: TestType,

    /// JSON comparison configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Element kind of legacy (version 1) lanes, overrides the configuration
    #[arg(long, value_name = "KIND")]
    legacy_kind: Option<ElementKind>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8, out_dir: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let mirror = match out_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .wrap_err_with(|| format!("cannot create {}", dir.display()))?;
            let file = std::fs::File::create(dir.join(MISMATCH_LOG))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false)
                    .with_filter(LevelFilter::WARN),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(mirror)
        .try_init()?;
    Ok(())
}

fn summarize(report: &BatchReport) {
    for (recording, outcomes) in report.by_recording() {
        for outcome in outcomes {
            let verdict = if outcome.result.passed { "PASSED" } else { "FAILED" };
            println!("{recording}: {} {verdict}", outcome.name);
            if let Some(first) = &outcome.result.first_divergence {
                println!(
                    "  first divergence at sample {} ({:.2} s): {}",
                    first.index,
                    first.micros as f64 / 1_000_000.0,
                    first.signals.join(", ")
                );
            }
            let tree = &outcome.result.tree;
            for component in tree.ordered_components().into_iter().take_while(|c| !c.is_equal) {
                println!(
                    "  {}: {} divergent samples",
                    component.id, component.divergent_sample_count
                );
            }
        }
    }
    for failure in &report.failures {
        println!(
            "{}: {} vs {} ERROR {}",
            failure.recording,
            failure.reference.display(),
            failure.compared.display(),
            failure.error
        );
    }
    println!(
        "Overall: {}",
        if report.passed() { "PASSED" } else { "FAILED" }
    );
}

fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose, cli.out_path.as_deref())?;

    let mut compare = match &cli.config {
        Some(path) => CompareConfig::load(path)?,
        None => CompareConfig::default(),
    };
    if let Some(kind) = cli.legacy_kind {
        let open = compare.open.with_legacy_element_kind(kind);
        compare = compare.with_open_options(open);
    }
    let config = BatchConfig::default()
        .with_test_type(cli.test_type)
        .with_compare(compare);

    let mut options = ReportOptions::default();
    if !cli.cp_label.is_empty() {
        options = options.with_checkpoint(cli.cp_label.join(" "));
    }

    let recordings = discover(cli.trace_folder.as_deref(), &cli.traces, &config)?;
    let total = pair_count(&recordings);
    info!(recordings = recordings.len(), pairs = total, "starting comparison");
    if total == 0 {
        warn!("no pair of trace files to compare");
    }

    let mut done = 0;
    let report = run_batch_with(&recordings, &config, |a, b| {
        done += 1;
        info!(done, total, "compared {} / {}", a.display(), b.display());
    });

    if let Some(path) = &cli.junit_path {
        write_junit(path, &report, &options)
            .wrap_err_with(|| format!("cannot write {}", path.display()))?;
    }
    if let Some(dir) = &cli.out_path {
        write_pair_reports(dir, &report, &options)
            .wrap_err_with(|| format!("cannot write reports to {}", dir.display()))?;
    }

    summarize(&report);
    Ok(())
}

fn main() {
    if let Err(err) = color_eyre::install() {
        eprintln!("{err}");
    }
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:?}");
        std::process::exit(-1);
    }
}
