//! vqsweep - drive an encoder sweep and compare variants with BD metrics.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vqsweep_core::bd::{compare_rate_points, CurveFit, RatePoint};
use vqsweep_core::config::{ConfigManager, Settings};
use vqsweep_core::models::SweepTemplate;
use vqsweep_core::process::SystemRunner;
use vqsweep_core::report::{
    write_json, AnalysisDocument, ComparisonDocument, ANALYSE_DATA_FILE, REPORT_DATA_FILE,
};
use vqsweep_core::sweep::SweepRunner;

#[derive(Parser)]
#[command(name = "vqsweep", version, about = "Video quality sweep and BD comparison")]
struct Cli {
    /// Settings file (created with defaults on first run).
    #[arg(long, default_value = "vqsweep.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one sweep template and write its analysis document.
    Sweep {
        /// Sweep template (TOML).
        #[arg(long)]
        template: PathBuf,
    },
    /// Compare two sweep analysis documents with BD-Rate / BD-Metric.
    Compare {
        /// Anchor (baseline) analysis document.
        #[arg(long)]
        anchor: PathBuf,
        /// Test (candidate) analysis document.
        #[arg(long)]
        test: PathBuf,
        /// Use piecewise (PCHIP) integration instead of the cubic fit.
        #[arg(long)]
        piecewise: bool,
        /// Where to write the comparison document.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut manager = ConfigManager::new(&cli.config);
    let settings = manager
        .load_or_create()
        .with_context(|| format!("loading settings from {}", cli.config.display()))?
        .clone();
    init_tracing(&settings.logging.level);

    match cli.command {
        Command::Sweep { template } => run_sweep(&settings, &template),
        Command::Compare {
            anchor,
            test,
            piecewise,
            output,
        } => run_compare(&anchor, &test, piecewise, output.as_deref()),
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_sweep(settings: &Settings, template_path: &Path) -> Result<()> {
    let template = SweepTemplate::load(template_path)
        .with_context(|| format!("loading template {}", template_path.display()))?;

    let runner = Arc::new(SystemRunner::with_timeout_secs(settings.tools.timeout_secs));
    let sweep = SweepRunner::new(settings.clone(), runner);
    let outcome = sweep.run(&template)?;

    let document = AnalysisDocument::new(&template, &outcome, sweep.command_log().snapshot());
    let report_path = template
        .output_dir
        .join(&settings.sweep.analysis_subdir)
        .join(ANALYSE_DATA_FILE);
    write_json(&report_path, &document)?;

    println!(
        "sweep '{}': {} succeeded, {} failed -> {}",
        template.name,
        outcome.successful.len(),
        outcome.failed.len(),
        report_path.display()
    );
    for failure in &outcome.failed {
        println!(
            "  FAILED {} @ {} ({:?}): {}",
            failure.source, failure.control_value, failure.stage, failure.message
        );
    }
    if outcome.successful.is_empty() {
        bail!("no sweep unit succeeded");
    }
    Ok(())
}

fn run_compare(
    anchor_path: &Path,
    test_path: &Path,
    piecewise: bool,
    output: Option<&Path>,
) -> Result<()> {
    let anchor = load_document(anchor_path)?;
    let test = load_document(test_path)?;
    let anchor_points: Vec<RatePoint> =
        anchor.entries.iter().filter_map(|e| e.rate_point()).collect();
    let test_points: Vec<RatePoint> = test.entries.iter().filter_map(|e| e.rate_point()).collect();
    if anchor_points.is_empty() || test_points.is_empty() {
        bail!("nothing to compare: one of the documents has no usable rate points");
    }

    let fit = if piecewise {
        CurveFit::Piecewise
    } else {
        CurveFit::Polynomial
    };
    let bd = compare_rate_points(&anchor_points, &test_points, fit);

    println!(
        "{} (anchor) vs {} (test), {:?} fit",
        anchor.template, test.template, fit
    );
    for row in &bd {
        let rate = row
            .bd_rate
            .map(|v| format!("{v:+.2}%"))
            .unwrap_or_else(|| "n/a".to_string());
        let metric = row
            .bd_metric
            .map(|v| format!("{v:+.4}"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "  {:<30} {:<9} BD-Rate {:>9}  BD-Metric {:>9}",
            row.video,
            row.metric.as_str(),
            rate,
            metric
        );
    }

    let document = ComparisonDocument::new(
        anchor.template.clone(),
        test.template.clone(),
        fit,
        bd,
        anchor_points,
        test_points,
    );
    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None => anchor_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(REPORT_DATA_FILE),
    };
    write_json(&output_path, &document)?;
    println!("comparison written to {}", output_path.display());
    Ok(())
}

fn load_document(path: &Path) -> Result<AnalysisDocument> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading analysis document {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("parsing analysis document {}", path.display()))
}
