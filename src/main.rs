//! Fintrack main entry point

use anyhow::Context;
use clap::Parser;
use fintrack_api::{build_pages, start_server};
use fintrack_config::error::ConfigErrorSeverity;
use fintrack_config::Config;
use fintrack_core::MemoryLedger;
use std::path::PathBuf;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "fintrack")]
#[command(author = "Fintrack Contributors")]
#[command(version = "0.1.0")]
#[command(about = "A lightweight personal-finance record keeper", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let config = match Config::load(args.config.clone()) {
        Ok(config) => config,
        Err(e) if e.severity() == ConfigErrorSeverity::Warning => {
            eprintln!("[WARN] {}; using defaults", e);
            Config::default()
        }
        Err(e) => {
            let details = e.to_details();
            eprintln!("[ERROR] {}: {}", details.code, details.message);
            for suggestion in &details.suggestions {
                eprintln!("        {}", suggestion);
            }
            return Err(e).context("failed to load configuration");
        }
    };

    env_logger::Builder::new()
        .parse_filters(&config.logging.level)
        .parse_default_env()
        .init();
    log::info!("Config loaded from {}", args.config.display());

    let rt = Runtime::new()?;
    rt.block_on(async {
        let seed = &config.data.seed_file;
        let ledger = if config.data.load_seed && seed.exists() {
            log::info!("Loading seed records from {}", seed.display());
            MemoryLedger::load_seed(seed)
                .await
                .with_context(|| format!("failed to load seed file {}", seed.display()))?
        } else {
            if config.data.load_seed {
                log::warn!("Seed file not found: {}", seed.display());
            }
            MemoryLedger::new()
        };
        log::info!("Ledger ready with {} records", ledger.total());

        let pages = build_pages(&config, &ledger)?;
        for page in pages.values() {
            if let Err(e) = page.mount().await {
                log::error!("Failed to mount {} page: {}", page.kind().slug(), e);
            }
        }

        start_server(config.clone(), pages).await
    })
}
