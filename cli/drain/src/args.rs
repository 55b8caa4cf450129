//! CLI argument definitions for pc-drain.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
pub use pc_cli_common::LogLevel;
use pc_cursor::{CursorConfig, ResetPolicy};
use std::path::PathBuf;
use std::time::Duration;

/// Drain a prefetch cursor over a simulated source.
///
/// Every index is fetched after a random delay. The cursor keeps up to
/// `--max-concurrency` fetches in flight and up to `--buffer-size` results
/// buffered, and prints items strictly in index order.
///
/// ## Examples
///
/// Ten items, five at a time:
///   pc-drain -n 10 -j 5 -b 5
///
/// Inject failures and emit JSON lines:
///   pc-drain -n 20 --fail-at 3,7 --output-format jsonl
///
/// Two passes reusing the buffer:
///   pc-drain -n 50 -b 50 --passes 2
#[derive(Parser, Debug)]
#[command(name = "pc-drain")]
#[command(version, about, long_about = None)]
pub struct Cli {
    // === Cursor ===
    /// Cursor configuration file (JSON); the flags below override it
    #[arg(short = 'c', long, env = "PC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of items in the sequence
    #[arg(short = 'n', long)]
    pub max_index: Option<u64>,

    /// Maximum in-flight fetches (must be >= 1)
    #[arg(short = 'j', long, value_parser = parse_positive_usize)]
    pub max_concurrency: Option<usize>,

    /// Maximum buffered results (must be >= 1)
    #[arg(short = 'b', long, value_parser = parse_positive_usize)]
    pub buffer_size: Option<usize>,

    /// Pause between fan-out launch attempts in milliseconds
    #[arg(long)]
    pub pacing_ms: Option<u64>,

    /// Log every dispatched fetch
    #[arg(long)]
    pub debug: bool,

    /// Purge buffered results between passes
    #[arg(long)]
    pub purge_on_reset: bool,

    /// Number of passes over the sequence, with a reset in between
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub passes: u32,

    // === Simulated source ===
    /// Minimum fetch latency in milliseconds
    #[arg(long, default_value = "0")]
    pub min_latency_ms: u64,

    /// Maximum fetch latency in milliseconds
    #[arg(long, default_value = "50")]
    pub max_latency_ms: u64,

    /// Indices whose fetch fails (comma separated or repeated)
    #[arg(long = "fail-at", value_delimiter = ',')]
    pub fail_at: Vec<u64>,

    /// Seed for the latency generator
    #[arg(long, env = "PC_SEED")]
    pub seed: Option<u64>,

    // === Output ===
    /// Output format for drained items
    #[arg(long, value_enum, default_value = "lines")]
    pub output_format: OutputFormat,

    /// Print final cursor statistics as JSON to stderr
    #[arg(long)]
    pub stats_json: bool,

    // === Logging ===
    /// Log level
    #[arg(short = 'l', long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

/// Output format for drained items.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// One value per line, failures as `!error`
    Lines,
    /// JSON Lines (one object per item)
    Jsonl,
}

impl Cli {
    /// Build the cursor configuration from the optional file and flags.
    pub fn cursor_config(&self) -> Result<CursorConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => CursorConfig::new(),
        };

        if let Some(max_index) = self.max_index {
            config.max_index = max_index;
        }
        if let Some(max_concurrency) = self.max_concurrency {
            config.max_concurrency = max_concurrency;
        }
        if let Some(buffer_size) = self.buffer_size {
            config.buffer_size = buffer_size;
        }
        if let Some(pacing_ms) = self.pacing_ms {
            config.fanout_pacing = Duration::from_millis(pacing_ms);
        }
        if self.debug {
            config.debug_mode = true;
        }
        if self.purge_on_reset {
            config.reset_policy = ResetPolicy::Purge;
        }

        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(config)
    }

    /// Validate the simulated source settings.
    pub fn validate_latency(&self) -> Result<()> {
        if self.min_latency_ms > self.max_latency_ms {
            anyhow::bail!(
                "--min-latency-ms ({}) must not exceed --max-latency-ms ({})",
                self.min_latency_ms,
                self.max_latency_ms
            );
        }
        Ok(())
    }
}

/// Parse a positive usize (>= 1).
fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value < 1 {
        return Err(format!("{} is not in 1..", value));
    }
    Ok(value)
}
