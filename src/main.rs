use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::fs::File;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod error;
mod modules;
mod pipeline;
mod report;
mod utils;

use config::ScanConfig;
use modules::capture::{DHash, FfmpegCapture};
use modules::creds::utils::REPORT_INTERVAL;
use modules::creds::{Attacker, Phase, ScanProgress};
use modules::rtsp::{RtspClient, DEFAULT_PORT};
use pipeline::{Pipeline, PipelineDeps};
use report::Report;

fn display_banner() {
    println!("{}", "╔═══════════════════════════════════════════════════════════╗".cyan());
    println!("{}", "║   rtspsploit                                              ║".cyan());
    println!("{}", "║   Route and credential discovery for RTSP cameras         ║".cyan());
    println!("{}", "╚═══════════════════════════════════════════════════════════╝".cyan());
    println!();
}

fn init_debug_log(report: &Report) -> Result<()> {
    let path = report.debug_log_path();
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("rtspsploit=debug"))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_thread_names(true),
        )
        .try_init()
        .context("Failed to install debug logger")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    display_banner();

    let config = ScanConfig::from_cli(&cli)?;
    let cwd = std::env::current_dir().context("Unable to determine working directory")?;
    let report = Arc::new(Report::create(&cwd)?);

    if config.debug {
        init_debug_log(&report)?;
    }

    match utils::raise_nofile_limit() {
        Ok(limit) => println!("{}", format!("[*] Temporary ulimit -n set to {}", limit).yellow()),
        Err(e) => println!("{}", format!("[!] Could not raise open file limit: {:#}", e).yellow()),
    }

    let addresses = utils::load_targets(config.targets_path())?;
    let targets: Vec<RtspClient> = addresses
        .into_iter()
        .map(|ip| {
            RtspClient::with_options(&ip.to_string(), u32::from(DEFAULT_PORT), config.timeout)
                .map(|t| t.with_retry(config.retry))
        })
        .collect::<Result<_, _>>()?;

    println!(
        "{}",
        format!(
            "[*] Loaded {} targets, {} ports, {} routes, {} credentials",
            targets.len(),
            config.attack.ports.len(),
            config.attack.routes.len(),
            config.attack.credentials.len()
        )
        .cyan()
    );
    tracing::debug!(pools = ?config.pools, timeout = ?config.timeout, "Scan configuration");

    let capture = FfmpegCapture::new(report.pics_dir()).context("Failed to start capture runtime")?;
    let progress = Arc::new(ScanProgress::new());
    let deps = PipelineDeps {
        attacker: Attacker::new(Arc::clone(&config.attack)),
        progress: progress.clone(),
        capture: Arc::new(capture),
        fingerprinter: Arc::new(DHash),
        results: report.clone(),
    };

    println!("{}", "[*] Starting...\n".green());
    let reporter = progress.spawn_reporter(REPORT_INTERVAL)?;
    Pipeline::new(config.pools, deps).run(targets);
    reporter.stop();
    progress.print_final();

    let found = progress.snapshot(Phase::Screenshot).total;
    if found == 0 {
        println!("{}", "[-] No working streams found.".yellow());
    } else {
        println!(
            "{} {}",
            "[+] Stream list saved to".green().bold(),
            report.result_file().display().to_string().cyan().underline()
        );
        println!(
            "{} {}",
            "[+] Gallery saved to".green().bold(),
            report.html_file().display().to_string().cyan().underline()
        );
    }
    tracing::debug!("Report folder {}", report.root().display());
    Ok(())
}
