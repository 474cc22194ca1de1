//! Streampress CLI
//!
//! Command-line front end for the streaming compression pipeline: walks
//! the counter, classifies every value, and writes the compressed record
//! stream to a local file.
//!
//! ## Quick Start
//!
//! ```bash
//! # Compress the first 10 million records with zstd (the default)
//! streampress --records 10000000
//!
//! # Same run, deflate at level 9, explicit output path
//! streampress --records 10000000 --codec deflate --level 9 --output out/records.zz
//!
//! # No limit: run the full u64 counter range (ctrl-c when bored)
//! streampress
//! ```
//!
//! ## Configuration
//!
//! Every flag can also be set through the environment:
//! - `STREAMPRESS_CODEC`: compression engine (zstd, deflate, none)
//! - `STREAMPRESS_LEVEL`: compression level
//! - `STREAMPRESS_OUTPUT`: output file path
//! - `STREAMPRESS_RECORDS`: record limit
//! - `RUST_LOG`: tracing filter (default: info)
//!
//! Without `--output` the file lands in the working directory as
//! `result.<ext>`, where the extension follows the codec.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use streampress_pipeline::{
    CodecKind, FileStore, Pipeline, PipelineConfig, TracingProgress, Watermarks,
};

#[derive(Parser)]
#[command(name = "streampress")]
#[command(about = "Stream classified counter records through a compressor to disk", long_about = None)]
struct Cli {
    /// Compression engine
    #[arg(short, long, value_enum, env = "STREAMPRESS_CODEC", default_value = "zstd")]
    codec: CodecArg,

    /// Compression level (zstd: 1-22, deflate: 0-9; ignored by none)
    #[arg(short, long, env = "STREAMPRESS_LEVEL", default_value_t = 1)]
    level: u32,

    /// Output file; defaults to result.<ext> for the chosen codec
    #[arg(short, long, env = "STREAMPRESS_OUTPUT")]
    output: Option<PathBuf>,

    /// Stop after this many records; omit to run the full counter range
    #[arg(short, long, env = "STREAMPRESS_RECORDS")]
    records: Option<u64>,

    /// Records staged between channel writes
    #[arg(long, env = "STREAMPRESS_FLUSH_INTERVAL", default_value_t = 128)]
    flush_interval: u64,

    /// Records between progress log lines
    #[arg(long, env = "STREAMPRESS_PROGRESS_INTERVAL", default_value_t = 1_000_000)]
    progress_interval: u64,

    /// High watermark of the raw record channel, in bytes
    #[arg(long, env = "STREAMPRESS_RAW_HIGH", default_value_t = 32 * 1024)]
    raw_high: usize,

    /// Low watermark of the raw record channel, in bytes
    #[arg(long, env = "STREAMPRESS_RAW_LOW", default_value_t = 16 * 1024)]
    raw_low: usize,

    /// High watermark of the encoded channel, in bytes
    #[arg(long, env = "STREAMPRESS_ENCODED_HIGH", default_value_t = 128 * 1024 * 1024)]
    encoded_high: usize,

    /// Low watermark of the encoded channel, in bytes
    #[arg(long, env = "STREAMPRESS_ENCODED_LOW", default_value_t = 16 * 1024)]
    encoded_low: usize,
}

/// Codec selector mirrored into clap's value-enum machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CodecArg {
    Zstd,
    Deflate,
    None,
}

impl From<CodecArg> for CodecKind {
    fn from(arg: CodecArg) -> Self {
        match arg {
            CodecArg::Zstd => CodecKind::Zstd,
            CodecArg::Deflate => CodecKind::Deflate,
            CodecArg::None => CodecKind::None,
        }
    }
}

fn default_output(kind: CodecKind) -> PathBuf {
    PathBuf::from(format!("result.{}", kind.extension()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let kind: CodecKind = cli.codec.into();
    let output = cli.output.unwrap_or_else(|| default_output(kind));

    let config = PipelineConfig {
        raw_watermarks: Watermarks::new(cli.raw_high, cli.raw_low),
        encoded_watermarks: Watermarks::new(cli.encoded_high, cli.encoded_low),
        flush_interval_records: cli.flush_interval,
        progress_interval_records: cli.progress_interval,
        record_limit: cli.records,
    };

    tracing::info!(
        codec = %kind,
        level = cli.level,
        output = %output.display(),
        records = ?cli.records,
        "starting streampress"
    );

    let codec = kind
        .build(cli.level)
        .with_context(|| format!("building {kind} codec at level {}", cli.level))?;
    let store = FileStore::create(&output)
        .await
        .with_context(|| format!("creating output file {}", output.display()))?;

    let summary = Pipeline::new(config)
        .with_observer(Arc::new(TracingProgress))
        .run(codec, Box::new(store))
        .await
        .context("pipeline run failed")?;

    println!(
        "{} records ({} raw bytes) -> {} encoded bytes in {:.2?}, ratio {:.4}",
        summary.records,
        summary.raw_bytes,
        summary.encoded_bytes,
        summary.elapsed,
        summary.ratio()
    );
    println!("output: {}", output.display());
    if summary.raw_channel.writer_pauses > 0 || summary.encoded_channel.writer_pauses > 0 {
        println!(
            "flow control: raw channel paused {} times, encoded channel paused {} times",
            summary.raw_channel.writer_pauses, summary.encoded_channel.writer_pauses
        );
    }

    Ok(())
}
