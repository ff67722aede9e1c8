//! Download and window-planning commands

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

use super::CliError;
use crate::downloader::config::{DEFAULT_BACKOFF_FACTOR, DEFAULT_MAX_ATTEMPTS, MAX_CONCURRENCY};
use crate::fetcher::listing::{listing_url, DEFAULT_BASE_URL};
use crate::fetcher::RetryPolicy;
use crate::metrics::init_metrics;
use crate::pipeline::{Pipeline, PipelineConfig, RunSummary, DEFAULT_OUTPUT_DIR};
use crate::window::{plan_windows, DEFAULT_MAX_DAYS_PER_WINDOW};

/// Sub-directory of the output directory holding texts when `--text-dir` is absent
pub const TEXT_SUBDIR: &str = "textos";

/// Parse a date given as `YYYY-MM-DD` or `YYYYMMDD`
pub fn parse_date(input: &str) -> Result<NaiveDate, String> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y%m%d"))
        .map_err(|_| format!("'{input}' is not a date (expected YYYY-MM-DD or YYYYMMDD)"))
}

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

fn parse_backoff_factor(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err("backoff factor must be a non-negative number".to_string());
    }
    Ok(value)
}

/// Plenary speech downloader CLI
#[derive(Parser, Debug)]
#[command(name = "plenary-speech-downloader")]
#[command(about = "Download plenary speech metadata and full texts for a date range", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Root URL of the open-data API
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Maximum days per listing request
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DAYS_PER_WINDOW,
          value_parser = clap::value_parser!(u32).range(1..=366))]
    pub window_days: u32,

    /// Number of concurrent text downloads (default: 8, max: 32)
    #[arg(long, global = true, default_value = "8", value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Maximum attempts per request, first try included (range: 1-20)
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ATTEMPTS,
          value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: u32,

    /// Exponential backoff factor in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_BACKOFF_FACTOR, value_parser = parse_backoff_factor)]
    pub backoff_factor: f64,

    /// Listing request timeout in seconds
    #[arg(long, global = true, default_value_t = 90)]
    pub listing_timeout: u64,

    /// Text request timeout in seconds
    #[arg(long, global = true, default_value_t = 60)]
    pub asset_timeout: u64,

    /// Pause between listing windows in milliseconds
    #[arg(long, global = true, default_value_t = 0)]
    pub window_delay_ms: u64,

    /// Directory for the listing and final tables
    #[arg(long, global = true, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Directory for the texts (default: <output-dir>/textos)
    #[arg(long, global = true)]
    pub text_dir: Option<PathBuf>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9000)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Text directory after applying the default
    pub fn text_dir(&self) -> PathBuf {
        self.text_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join(TEXT_SUBDIR))
    }

    /// Run settings for `[start, end]` built from the global flags
    pub fn pipeline_config(&self, start: NaiveDate, end: NaiveDate) -> PipelineConfig {
        PipelineConfig::new(start, end)
            .with_base_url(self.base_url.clone())
            .with_max_days_per_window(self.window_days)
            .with_concurrency(self.concurrency)
            .with_timeouts(
                Duration::from_secs(self.listing_timeout),
                Duration::from_secs(self.asset_timeout),
            )
            .with_retry(RetryPolicy::new(self.max_retries, self.backoff_factor))
            .with_window_delay(Duration::from_millis(self.window_delay_ms))
            .with_output_dirs(self.output_dir.clone(), self.text_dir())
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the listing, download every text and write the merged table
    Download(DownloadArgs),

    /// Print the listing windows for a date range without any network access
    Windows(WindowsArgs),
}

/// Download command arguments
#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// First day (YYYY-MM-DD or YYYYMMDD)
    #[arg(long, value_parser = parse_date)]
    pub start_date: NaiveDate,

    /// Last day, inclusive (YYYY-MM-DD or YYYYMMDD)
    #[arg(long, value_parser = parse_date)]
    pub end_date: NaiveDate,
}

/// Window planning arguments
#[derive(Parser, Debug)]
pub struct WindowsArgs {
    /// First day (YYYY-MM-DD or YYYYMMDD)
    #[arg(long, value_parser = parse_date)]
    pub start_date: NaiveDate,

    /// Last day, inclusive (YYYY-MM-DD or YYYYMMDD)
    #[arg(long, value_parser = parse_date)]
    pub end_date: NaiveDate,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

impl DownloadArgs {
    /// Execute the full run
    pub async fn execute(&self, cli: &Cli) -> Result<RunSummary, CliError> {
        if let Some(addr) = cli.metrics_addr {
            init_metrics(addr)?;
        }

        let config = cli.pipeline_config(self.start_date, self.end_date);
        info!(
            "Downloading speeches from {} to {} into {}",
            config.start,
            config.end,
            config.output_dir.display()
        );

        let mut pipeline = Pipeline::new(config)?;
        if cli.output_format == OutputFormat::Human {
            pipeline = pipeline.with_progress(create_progress_bar());
        }

        match pipeline.run().await {
            Ok(summary) => {
                match cli.output_format {
                    OutputFormat::Json => output_json(&summary)?,
                    OutputFormat::Human => output_human(&summary),
                }
                Ok(summary)
            }
            Err(e) => {
                match cli.output_format {
                    OutputFormat::Json => {
                        let failure = serde_json::json!({ "success": false, "error": e.to_string() });
                        println!("{failure}");
                    }
                    OutputFormat::Human => {
                        eprintln!("\nDownload failed!");
                        eprintln!("Error: {e}");
                    }
                }
                error!("Download failed: {}", e);
                Err(e.into())
            }
        }
    }
}

/// One planned window as printed by `windows`
#[derive(Debug, Serialize)]
struct WindowLine {
    start: NaiveDate,
    end: NaiveDate,
    days: i64,
    url: String,
}

impl WindowsArgs {
    /// Print the planned windows and their listing URLs
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let windows = plan_windows(self.start_date, self.end_date, cli.window_days)?;
        let lines: Vec<WindowLine> = windows
            .iter()
            .map(|w| WindowLine {
                start: w.start,
                end: w.end,
                days: w.days(),
                url: listing_url(&cli.base_url, w),
            })
            .collect();

        match cli.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string(&lines)
                    .map_err(|e| CliError::OutputError(e.to_string()))?;
                println!("{json}");
            }
            OutputFormat::Human => {
                for line in &lines {
                    println!("{}  {}  {:>3} days  {}", line.start, line.end, line.days, line.url);
                }
                println!("{} window(s)", lines.len());
            }
        }
        Ok(())
    }
}

fn output_json(summary: &RunSummary) -> Result<(), CliError> {
    let mut value =
        serde_json::to_value(summary).map_err(|e| CliError::OutputError(e.to_string()))?;
    value["success"] = serde_json::Value::Bool(true);
    println!("{value}");
    Ok(())
}

fn output_human(summary: &RunSummary) {
    println!("\nDownload completed successfully!");
    println!("Range: {} to {} ({} windows)", summary.start, summary.end, summary.windows);
    println!("Records listed: {}", summary.records);
    println!(
        "Texts saved: {} of {} ({} failed, {} rows without a usable URL)",
        summary.assets_ok, summary.tasks, summary.assets_failed, summary.excluded
    );
    println!("Listing: {}", summary.listing_path.display());
    println!("Output: {}", summary.output_path.display());
    println!("Texts: {}", summary.text_dir.display());
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message("Downloading texts");
    pb
}
