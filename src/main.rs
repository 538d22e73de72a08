use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod config;
mod error;
mod gateway;
mod models;
mod output;
mod pacing;
mod report;
mod retrieval;
mod runner;
mod scoring;
mod storage;
mod strategy;

use crate::config::{Config, GatewayCredentials};
use crate::gateway::Gateway;
use crate::output::OutputFormat;
use crate::retrieval::StaticRetriever;
use crate::runner::Experiment;
use crate::storage::ResultStore;
use crate::strategy::{AnswerProvider, Strategy};

/// CRM assistant A/B/C experiment - compare ontology+RAG, fine-tuned and vanilla answers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file; built-in test cases are used when omitted
    config: Option<PathBuf>,

    /// Summary format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Directory for the results and report files (overrides the config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Verbose output - log every gateway call
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(&args)?;
    let credentials = GatewayCredentials::from_env(&config.gateway)?;
    let gateway = Arc::new(
        Gateway::new(&config.gateway, &credentials).context("Failed to set up chat completion gateway")?,
    );
    let retriever = Arc::new(StaticRetriever::new(config.retrieval.context.clone()));

    let strategies = Strategy::from_config(&config, gateway.clone(), retriever);
    for strategy in &strategies {
        info!("Strategy {} uses model {}", strategy.kind(), strategy.model());
    }
    info!(
        cases = config.test_cases.len(),
        strategies = strategies.len(),
        endpoint = gateway.completions_url(),
        "Starting A/B/C experiment"
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current call");
            on_interrupt.cancel();
        }
    });

    let pacer = config.pacer()?;
    info!(pacing = ?pacer.policy(), "Pacing between gateway calls");

    let outcome = Experiment::new(pacer)
        .with_cancellation(cancel)
        .run_all(&config.test_cases, &strategies)
        .await;
    if outcome.cancelled {
        warn!(collected = outcome.results.len(), "Experiment cancelled; saving partial results");
    }

    let report = report::build_report(&outcome.results);

    let store = ResultStore::new(&config.output_dir);
    info!("Writing artifacts to {}", store.output_dir().display());
    store
        .save(&outcome.results, &report, Local::now())
        .context("Failed to save experiment results")?;

    output::print_report(&report, args.output);

    Ok(())
}
