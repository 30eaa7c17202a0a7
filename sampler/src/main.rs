//! `sampler`: run batches of simulator trials and extract their metrics.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use sampler::core::cancel::CancellationToken;
use sampler::core::report::BatchReport;
use sampler::core::query::ReducerName;
use sampler::exit_codes;
use sampler::extract::extract_metrics;
use sampler::io::config::{DEFAULT_CONFIG_PATH, SamplerConfig, load_config, write_config};
use sampler::io::record_store::{load_record, save_record};
use sampler::io::run_dirs::scan_next_start;
use sampler::logging;
use sampler::sample::{BatchRequest, run_samples};

#[derive(Parser)]
#[command(
    name = "sampler",
    version,
    about = "Run batches of simulator trials and extract scalar metrics"
)]
struct Cli {
    /// Config file; missing files fall back to defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a config file with default values.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Run a batch of trials into new `run_<n>` directories.
    Run(RunArgs),
    /// Print the index the next batch would start at.
    NextIndex {
        /// Output root to scan (default: `batch.output_root`).
        root: Option<PathBuf>,
    },
    /// Extract one value per result file and print it.
    Extract(ExtractArgs),
    /// Print the values stored in a CSV record.
    Show { path: PathBuf },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    #[arg(long)]
    executable: Option<String>,
    #[arg(long)]
    output_root: Option<PathBuf>,
    #[arg(short = 'n', long)]
    samples: Option<u32>,
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Stop launching trials after the first failure.
    #[arg(long)]
    fail_fast: bool,
    /// Write the batch report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Simulator arguments (replace `batch.args` when given).
    #[arg(last = true)]
    args: Vec<String>,
}

#[derive(Args, Debug, Default)]
struct ExtractArgs {
    /// Results root (default: `batch.output_root`).
    root: Option<PathBuf>,
    /// Metric identifier; repeat for several (replaces `extract.metrics`).
    #[arg(short, long = "metric")]
    metrics: Vec<String>,
    #[arg(short, long, value_enum)]
    reducer: Option<ReducerName>,
    /// Multiply every derived value by this factor.
    #[arg(long)]
    scale: Option<f64>,
    #[arg(long)]
    result_filename: Option<String>,
    /// Save the values as a single CSV record.
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = cli.config;
    match cli.command {
        Command::Init { force } => cmd_init(&config, force),
        Command::Run(args) => cmd_run(load_config(&config)?, args),
        Command::NextIndex { root } => cmd_next_index(&load_config(&config)?, root),
        Command::Extract(args) => cmd_extract(load_config(&config)?, args),
        Command::Show { path } => cmd_show(&path),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &SamplerConfig::default())?;
    println!("init: wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_run(cfg: SamplerConfig, args: RunArgs) -> Result<i32> {
    let cfg = apply_run_overrides(cfg, &args)?;
    let request = BatchRequest::from_config(&cfg.batch);

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!(err = %err, "could not install Ctrl-C handler");
    }

    let report = run_samples(&request, &cancel)?;
    for trial in &report.trials {
        println!(
            "run: index={} status={} dir={}",
            trial.run_index,
            trial.status.label(),
            trial.run_dir.display()
        );
    }
    println!("{}", report.summary());

    if let Some(path) = &args.report {
        write_report(path, &report)?;
    }
    Ok(exit_code_for(&report))
}

fn cmd_next_index(cfg: &SamplerConfig, root: Option<PathBuf>) -> Result<i32> {
    let root = root.unwrap_or_else(|| cfg.batch.output_root.clone());
    println!("{}", scan_next_start(&root)?);
    Ok(exit_codes::OK)
}

fn cmd_extract(cfg: SamplerConfig, args: ExtractArgs) -> Result<i32> {
    let root = args
        .root
        .clone()
        .unwrap_or_else(|| cfg.batch.output_root.clone());
    let cfg = apply_extract_overrides(cfg, &args)?;
    let extract = &cfg.extract;

    let mut result = extract_metrics(&root, &extract.query(), &extract.result_filename)?;
    if let Some(scale) = extract.scale {
        result = result.map_values(|value| value * scale);
    }
    if result.is_empty() {
        eprintln!(
            "warning: no {} files under {}",
            extract.result_filename,
            root.display()
        );
    }
    for sample in result.samples() {
        let index = sample
            .run_index
            .map_or_else(|| "-".to_string(), |i| i.to_string());
        println!("{index}\t{}", sample.value);
    }

    if let Some(path) = &args.csv {
        save_record(path, &result.values())?;
    }
    Ok(exit_codes::OK)
}

fn cmd_show(path: &Path) -> Result<i32> {
    for value in load_record(path)? {
        println!("{value}");
    }
    Ok(exit_codes::OK)
}

/// Apply `sampler run` flags over the config file, then revalidate.
fn apply_run_overrides(mut cfg: SamplerConfig, args: &RunArgs) -> Result<SamplerConfig> {
    let batch = &mut cfg.batch;
    if let Some(executable) = &args.executable {
        batch.executable = executable.clone();
    }
    if let Some(root) = &args.output_root {
        batch.output_root = root.clone();
    }
    if let Some(samples) = args.samples {
        batch.samples = samples;
    }
    if let Some(jobs) = args.jobs {
        batch.concurrency = jobs;
    }
    if let Some(timeout) = args.timeout_secs {
        batch.trial_timeout_secs = Some(timeout);
    }
    if args.fail_fast {
        batch.fail_fast = true;
    }
    if !args.args.is_empty() {
        batch.args = args.args.clone();
    }
    cfg.validate_for_run()?;
    Ok(cfg)
}

/// Apply `sampler extract` flags over the config file, then revalidate.
fn apply_extract_overrides(mut cfg: SamplerConfig, args: &ExtractArgs) -> Result<SamplerConfig> {
    let extract = &mut cfg.extract;
    if !args.metrics.is_empty() {
        extract.metrics = args.metrics.clone();
    }
    if args.reducer.is_some() {
        extract.reducer = args.reducer;
    }
    if args.scale.is_some() {
        extract.scale = args.scale;
    }
    if let Some(filename) = &args.result_filename {
        extract.result_filename = filename.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn exit_code_for(report: &BatchReport) -> i32 {
    if !report.failed().is_empty() {
        exit_codes::TRIALS_FAILED
    } else if !report.cancelled().is_empty() {
        exit_codes::CANCELLED
    } else {
        exit_codes::OK
    }
}

/// Serialize `report` to pretty-printed JSON with trailing newline.
fn write_report(path: &Path, report: &BatchReport) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(report).context("serialize report")?;
    payload.push('\n');
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, payload).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
