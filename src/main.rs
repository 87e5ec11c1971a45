// src/main.rs

use clap::Parser;
use color_eyre::eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use onion_scout::core::config::{ProxyOverride, ScanConfig};
use onion_scout::core::report;
use onion_scout::{logging, ScanContext, Scanner};

/// Scan onion services through a SOCKS proxy and write a JSON privacy report.
#[derive(Parser, Debug)]
#[command(name = "onion-scout", version, about, long_about = None)]
struct Cli {
    /// Onion URL to scan, or a `.txt` file with one URL per line
    target: String,

    /// Path to save the JSON report
    #[arg(short, long, default_value = "scan_report.json")]
    output: PathBuf,

    /// Print the JSON report to stdout instead of writing a file
    #[arg(long, conflicts_with = "output")]
    stdout: bool,

    /// Per-probe timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// SOCKS proxy host (overrides TOR_PROXY_HOST)
    #[arg(long)]
    proxy_host: Option<String>,

    /// SOCKS proxy port (overrides TOR_PROXY_PORT)
    #[arg(long)]
    proxy_port: Option<String>,

    /// Number of targets scanned at the same time
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Accept invalid TLS certificates when fetching HTTPS pages
    #[arg(long)]
    insecure: bool,

    /// Mirror the full log on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::initialize_logging(cli.verbose)?;

    let config = ScanConfig {
        timeout: Duration::from_secs(cli.timeout),
        concurrency: cli.concurrency,
        accept_invalid_certs: cli.insecure,
        ..ScanConfig::default()
    };
    let proxy = ProxyOverride { host: cli.proxy_host, port: cli.proxy_port };

    let ctx = Arc::new(ScanContext::new(config, proxy));
    let scanner = Scanner::live(Arc::clone(&ctx));

    let targets = report::load_targets(&cli.target)?;
    eprintln!("Scanning {} target(s) through the proxy...", targets.len());
    let results = report::run_scan(&scanner, &targets, ctx.config().concurrency).await;

    if cli.stdout {
        println!("{}", report::render_json(&results)?);
    } else {
        report::write_report(&cli.output, &results)?;
        info!(path = %cli.output.display(), "Report saved.");
        eprintln!("Report saved to {}", cli.output.display());
    }
    Ok(())
}
