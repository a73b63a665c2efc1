#![forbid(unsafe_code)]

//! `stream-assembler`: replays a captured chat stream through the assembler.
//!
//! Reads a `data:` frame capture from a file or stdin, feeds it through one
//! conversation turn, and prints the final snapshot as JSON. `--chunk-size`
//! re-chunks the input to exercise split frames and split markers.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use stream_assembler::orchestrator::conversation::Conversation;
use stream_assembler::stream::session::Snapshot;
use stream_assembler::{AppError, AssemblerConfig, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "stream-assembler", about = "Replay a captured chat stream", version, long_about = None)]
struct Cli {
    /// Captured stream to replay; `-` reads stdin.
    #[arg(long, default_value = "-")]
    input: String,

    /// Path to an optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read size in bytes; overrides `read_chunk_bytes`.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Print every intermediate snapshot as a JSON line.
    #[arg(long)]
    follow: bool,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AssemblerConfig::load_from_path(path)?,
        None => AssemblerConfig::default(),
    };
    if let Some(chunk_size) = args.chunk_size {
        config.read_chunk_bytes = chunk_size;
        config.validate()?;
    }
    info!(input = args.input.as_str(), chunk_bytes = config.read_chunk_bytes, "replaying stream");

    let (tx, rx) = mpsc::channel(config.snapshot_channel_capacity);
    let printer = tokio::spawn(print_snapshots(rx, args.follow));

    let mut conversation = Conversation::new(config)?;
    let cancel = conversation.begin_turn(&format!("replay {}", args.input))?;
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let snapshot = if args.input == "-" {
        conversation.stream_turn(tokio::io::stdin(), Some(&tx)).await?
    } else {
        let file = tokio::fs::File::open(&args.input)
            .await
            .map_err(|err| AppError::Io(format!("cannot open {}: {err}", args.input)))?;
        conversation.stream_turn(file, Some(&tx)).await?
    };

    drop(tx);
    interrupt.abort();
    if let Err(err) = printer.await {
        warn!(%err, "snapshot printer task failed");
    }

    let rendered = serde_json::to_string_pretty(&snapshot)
        .map_err(|err| AppError::Io(format!("failed to render snapshot: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn print_snapshots(mut rx: mpsc::Receiver<Snapshot>, follow: bool) {
    while let Some(snapshot) = rx.recv().await {
        if !follow {
            continue;
        }
        match serde_json::to_string(&snapshot) {
            Ok(line) => println!("{line}"),
            Err(err) => warn!(%err, "failed to render intermediate snapshot"),
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
