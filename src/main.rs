use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use ufw_report::config::DEFAULT_TIMEOUT_MS;
use ufw_report::pipeline::{DEFAULT_CONCURRENCY, DEFAULT_TOP};
use ufw_report::{logging, GeoResolver, OutputFormat, ResolverConfig, RunOptions};

#[derive(Parser)]
#[command(name = "ufw_report")]
#[command(about = "Rank firewall log sources by connection attempts and geolocate the top offenders")]
struct Args {
    /// Path to the UFW / kernel log file
    log_file: PathBuf,

    /// Geolocate the top N source IPs
    #[arg(short = 'n', long, default_value_t = DEFAULT_TOP)]
    top: usize,

    /// Per-provider request timeout in milliseconds
    #[arg(short, long = "timeout-ms", default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Number of source IPs geolocated at the same time
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// JSON file replacing the built-in geolocation providers
    #[arg(short, long)]
    providers: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Log debug output to stderr
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.debug);

    let timeout = Duration::from_millis(args.timeout_ms);
    let config = match &args.providers {
        Some(path) => ResolverConfig::from_file(path, timeout)?,
        None => ResolverConfig::default().with_timeout(timeout),
    };

    let aggregator = ufw_report::scan_log_file(&args.log_file)?;
    let resolver = GeoResolver::new(&config)?;

    let options = RunOptions {
        top_n: args.top,
        concurrency: args.concurrency,
        format: args.format,
    };

    ufw_report::write_report(&aggregator, &resolver, &options, io::stdout().lock())
        .await
        .context("report generation failed")?;

    Ok(())
}
