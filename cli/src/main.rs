//! Chronicle CLI - trims a persisted agent transcript into its running summary.
//!
//! ```text
//! chronicle trim <transcript.json> [--chain <chain.json> | --keep-last N] [--dry-run]
//! ```
//!
//! The transcript is loaded, every message that has left the active chain is
//! folded into the summary through the configured fast model, and the updated
//! transcript is written back atomically.

mod transcript;

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use chronicle_config::{ChronicleConfig, chronicle_dir};
use chronicle_context::{
    AuditSink, ConversationId, FileAuditSink, HistoryTrimmer, ProviderCompletion,
    TiktokenBudgeter, TracingAuditSink,
};
use chronicle_providers::ProviderClient;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fold messages that left the active chain into the running summary
    Trim {
        /// Transcript JSON (persisted history or bare cycle log)
        transcript: PathBuf,

        /// JSON array of the messages still in the active chain
        #[arg(long, conflicts_with = "keep_last")]
        chain: Option<PathBuf>,

        /// Treat the last N messages as the active chain
        #[arg(long, default_value_t = 0)]
        keep_last: usize,

        /// Print the result without writing the transcript back
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stdout carries command output, so log to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.chronicle/logs/chronicle.log
    if let Some(dir) = chronicle_dir() {
        candidates.push(dir.join("logs").join("chronicle.log"));
    }

    // Fallback: ./.chronicle/logs/chronicle.log
    candidates.push(PathBuf::from(".chronicle").join("logs").join("chronicle.log"));

    candidates
}

fn load_config(path: Option<&PathBuf>) -> Result<ChronicleConfig> {
    Ok(match path {
        Some(path) => ChronicleConfig::load_from(path)?,
        None => ChronicleConfig::load()?.unwrap_or_default(),
    })
}

async fn run_trim(
    config: &ChronicleConfig,
    transcript_path: PathBuf,
    chain_path: Option<PathBuf>,
    keep_last: usize,
    dry_run: bool,
) -> Result<()> {
    let mut history = transcript::load(&transcript_path, config.initial_summary())?;
    let chain = match chain_path {
        Some(path) => transcript::load_chain(&path)?,
        None => transcript::tail_chain(&history, keep_last),
    };

    let client = ProviderClient::new(config.provider_settings())
        .context("failed to build provider client")?;
    let audit: Box<dyn AuditSink> = match config.audit_dir() {
        Some(dir) => Box::new(FileAuditSink::new(dir)),
        None => Box::new(TracingAuditSink),
    };
    let trimmer = HistoryTrimmer::new(
        ProviderCompletion::new(client),
        TiktokenBudgeter::new(config.model_registry()),
        audit.as_ref(),
        config.summary_settings(ConversationId::new(config.agent_name())),
    );

    let previous_cursor = history.last_trimmed_index();
    let trimmed = trimmer
        .trim(&mut history, &chain)
        .await
        .context("failed to trim history")?;

    println!("{}", trimmed.summary_message.content());
    println!(
        "trimmed {} message(s); cursor {} -> {}",
        trimmed.trimmed.len(),
        previous_cursor,
        history.last_trimmed_index()
    );

    if dry_run {
        tracing::info!(path = %transcript_path.display(), "Dry run, transcript not written");
        return Ok(());
    }
    transcript::save(&transcript_path, &history)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Trim {
            transcript,
            chain,
            keep_last,
            dry_run,
        } => run_trim(&config, transcript, chain, keep_last, dry_run).await,
    }
}
