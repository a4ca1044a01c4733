//! threatscan CLI - scores files for malware signatures and heuristics.
//!
//! Usage:
//!   threatscan scan /path/to/scan
//!   threatscan scan /path/to/scan --format json --remote https://scorer.example/scan
//!   threatscan request < request.json
//!   threatscan threats
//!   threatscan quarantine <threat-id>

use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use threatscan_core::notify::TracingNotifier;
use threatscan_core::quarantine::{FsQuarantine, Quarantine};
use threatscan_core::remote::{FallbackScorer, RemoteScorer};
use threatscan_core::report::{print_results, OutputFormat};
use threatscan_core::scan::{dispatch_threats, run_scan, ScanProgress};
use threatscan_core::source::FsFileSource;
use threatscan_core::store::JsonlThreatStore;
use threatscan_core::wire::{handle_request, ErrorResponse, ScanRequest};
use threatscan_core::{HeuristicScorer, ScannerConfig, Scorer, ThreatScorer};

#[derive(Parser)]
#[command(name = "threatscan")]
#[command(about = "Signature and heuristic file threat scanner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file (defaults to $THREATSCAN_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan files or directories
    Scan {
        /// Paths to scan (files or directories)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Points at which an unmatched file is reported suspicious
        #[arg(short, long)]
        threshold: Option<u32>,

        /// Remote scorer endpoint; falls back to local heuristics when unreachable
        #[arg(long)]
        remote: Option<String>,

        /// Score files one at a time
        #[arg(long)]
        sequential: bool,

        /// Do not write threat records
        #[arg(long)]
        no_record: bool,
    },

    /// Score one JSON request read from stdin and print the JSON response
    Request,

    /// List recorded threats
    Threats {
        /// Show every user's records
        #[arg(long)]
        all: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Quarantine the file behind a recorded threat
    Quarantine {
        /// Threat record id
        id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set subscriber")?;

    let config = ScannerConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Commands::Scan {
            paths,
            format,
            threshold,
            remote,
            sequential,
            no_record,
        } => {
            let mut config = config;
            if let Some(t) = threshold {
                config.scoring = config.scoring.with_suspicious_threshold(t);
                config.scoring.validate()?;
            }
            if remote.is_some() {
                config.remote_url = remote;
            }
            if sequential {
                config.parallel = false;
            }
            cmd_scan(&config, paths, format, !no_record)
        }
        Commands::Request => cmd_request(&config),
        Commands::Threats { all, format } => cmd_threats(&config, all, format),
        Commands::Quarantine { id } => cmd_quarantine(&config, &id),
    }
}

fn build_scorer(config: &ScannerConfig) -> Result<Box<dyn Scorer>> {
    match &config.remote_url {
        Some(url) => {
            info!("Using remote scorer at {url}");
            let remote = RemoteScorer::new(url.clone(), Duration::from_secs(config.remote_timeout_secs))?;
            Ok(Box::new(FallbackScorer::new(
                remote,
                HeuristicScorer::new(config.scoring.clone()),
            )))
        }
        None => Ok(Box::new(ThreatScorer::new(config.scoring.clone()))),
    }
}

fn cmd_scan(config: &ScannerConfig, paths: Vec<PathBuf>, format: OutputFormat, record: bool) -> Result<()> {
    let scorer = build_scorer(config)?;
    let source = FsFileSource::new(paths).with_limits(config.max_content_bytes, config.max_content_chars);
    let progress = Arc::new(ScanProgress::new());

    let report = run_scan(scorer.as_ref(), &source, config.parallel, &progress)?;

    let total = progress.total_files.load(Ordering::Relaxed);
    info!("Scanned {} files", total);

    if report.outcomes.is_empty() {
        info!("No files to scan.");
        return Ok(());
    }

    print_results(&report, format);

    if record && report.threats().next().is_some() {
        let store = JsonlThreatStore::open(&config.store_path)?;
        let summary = dispatch_threats(&report, &config.user_id, &store, &TracingNotifier);
        info!(
            "Recorded {} threats to {} ({} failed)",
            summary.recorded,
            store.path().display(),
            summary.failed
        );
    }

    Ok(())
}

fn cmd_request(config: &ScannerConfig) -> Result<()> {
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw).context("failed to read stdin")?;

    let scorer = build_scorer(config)?;
    let result = serde_json::from_str::<ScanRequest>(&raw)
        .map_err(anyhow::Error::from)
        .and_then(|req| handle_request(scorer.as_ref(), req).map_err(anyhow::Error::from));

    match result {
        Ok(resp) => {
            println!("{}", serde_json::to_string_pretty(&resp)?);
            Ok(())
        }
        Err(e) => {
            let body = ErrorResponse {
                error: "Scanning failed".to_string(),
                details: e.to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(1);
        }
    }
}

fn cmd_threats(config: &ScannerConfig, all: bool, format: OutputFormat) -> Result<()> {
    let store = JsonlThreatStore::open(&config.store_path)?;
    let records = if all {
        store.list()?
    } else {
        store.list_for_user(&config.user_id)?
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No threats recorded.");
            }
            for r in &records {
                println!(
                    "{}  {:<11} {:<8} {:<10} {}  {}",
                    r.id,
                    format!("{:?}", r.status).to_lowercase(),
                    r.severity,
                    r.threat_type,
                    r.detected_at.format("%Y-%m-%d %H:%M:%S"),
                    r.description
                );
            }
        }
    }
    Ok(())
}

fn cmd_quarantine(config: &ScannerConfig, id: &str) -> Result<()> {
    let id = id.parse().with_context(|| format!("invalid threat id: {id}"))?;
    let store = JsonlThreatStore::open(&config.store_path)?;
    let record = store.get(id)?;

    let quarantine = FsQuarantine::new(&config.quarantine_dir);
    let outcome = quarantine
        .quarantine(std::path::Path::new(&record.file_path), record.threat_type)
        .with_context(|| format!("failed to quarantine {}", record.file_path))?;

    store.mark_quarantined(id, &outcome.quarantine_path.display().to_string())?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
