mod collectors;
mod config;
mod report;
mod reporter;

use clap::Parser;
use collectors::public_ip::HttpPublicIpFetcher;
use collectors::system::SysinfoProbe;
use collectors::Collector;
use config::Config;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sysdumper")]
#[command(version, about = "Dump host system information to JSON and text files")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    print_default_config: bool,
    #[arg(long, conflicts_with = "no_public_ip")]
    public_ip: bool,
    #[arg(long, conflicts_with = "public_ip")]
    no_public_ip: bool,
    #[arg(long, value_parser = humantime::parse_duration)]
    cpu_sample_interval: Option<Duration>,
    #[arg(long)]
    json_out: Option<PathBuf>,
    #[arg(long)]
    text_out: Option<PathBuf>,
    /// Do not echo the text report to stdout.
    #[arg(long, short)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    info!(
        include_public_ip = cfg.collect.include_public_ip,
        cpu_sample_interval_ms = cfg.collect.cpu_sample_interval_ms,
        "collecting system info"
    );

    let fetcher = HttpPublicIpFetcher::new(&cfg.public_ip);
    let mut collector = Collector::new(SysinfoProbe::new(), fetcher);
    let report = collector.collect(&cfg.collect_options()).await;

    let json_written = match reporter::write_json(&report, &cfg.output.json_path) {
        Ok(()) => {
            info!(path = %cfg.output.json_path.display(), "saved JSON report");
            true
        }
        Err(err) => {
            error!(error = %err, "failed to save JSON report");
            false
        }
    };

    let text_written = match reporter::write_text(&report, &cfg.output.text_path) {
        Ok(()) => {
            info!(path = %cfg.output.text_path.display(), "saved text report");
            true
        }
        Err(err) => {
            error!(error = %err, "failed to save text report");
            false
        }
    };

    if !cli.quiet {
        print!("{}", reporter::render_text(&report));
    }

    if !json_written && !text_written {
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, config::ConfigError> {
    let mut cfg = match &cli.config {
        Some(path) => Config::read_from_file(path)?,
        None => Config::default(),
    };

    if cli.public_ip {
        cfg.collect.include_public_ip = true;
    } else if cli.no_public_ip {
        cfg.collect.include_public_ip = false;
    }
    if let Some(interval) = cli.cpu_sample_interval {
        cfg.collect.cpu_sample_interval_ms =
            u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
    }
    if let Some(path) = &cli.json_out {
        cfg.output.json_path = path.clone();
    }
    if let Some(path) = &cli.text_out {
        cfg.output.text_path = path.clone();
    }

    cfg.validate()?;
    Ok(cfg)
}
