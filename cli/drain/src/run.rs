//! Main execution logic for pc-drain CLI.

use anyhow::Result;
use pc_cursor::{CursorStats, Fetched, StreamingCursor};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::args::{Cli, OutputFormat};
use crate::source::SimulatedFetcher;

/// Outcome of a drain run.
#[derive(Debug)]
pub struct DrainSummary {
    pub passes: u32,
    pub delivered: u64,
    pub failed: u64,
    pub stats: CursorStats,
}

/// Totals for a single pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassTotals {
    pub delivered: u64,
    pub failed: u64,
}

/// One drained item in JSON Lines output.
#[derive(Serialize)]
struct ItemRecord<'a> {
    index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// Execute the drain with the provided arguments.
pub async fn execute(args: &Cli) -> Result<DrainSummary> {
    let config = args.cursor_config()?;
    args.validate_latency()?;

    info!(
        max_index = config.max_index,
        max_concurrency = config.max_concurrency,
        buffer_size = config.buffer_size,
        bounded = config.is_bounded(),
        passes = args.passes,
        "Starting drain"
    );

    let fetcher = SimulatedFetcher::new(
        Duration::from_millis(args.min_latency_ms),
        Duration::from_millis(args.max_latency_ms),
        args.seed,
    )
    .with_failures(args.fail_at.iter().copied());

    let cursor = StreamingCursor::with_fetcher(config, Arc::new(fetcher));
    let mut out = std::io::stdout();

    let mut delivered = 0;
    let mut failed = 0;
    for pass in 0..args.passes {
        if pass > 0 {
            cursor.reset().await?;
        }
        let totals = drain_pass(&cursor, args.output_format, &mut out).await?;
        info!(
            pass = pass + 1,
            delivered = totals.delivered,
            failed = totals.failed,
            "Pass complete"
        );
        delivered += totals.delivered;
        failed += totals.failed;
    }

    Ok(DrainSummary {
        passes: args.passes,
        delivered,
        failed,
        stats: cursor.stats(),
    })
}

/// Drain the cursor to `out` until it is exhausted.
pub async fn drain_pass<W: Write>(
    cursor: &StreamingCursor<u64>,
    format: OutputFormat,
    out: &mut W,
) -> Result<PassTotals> {
    let mut totals = PassTotals::default();

    while cursor.has_next() {
        let index = cursor.index();
        let Some(item) = cursor.next().await else {
            break;
        };

        match &item {
            Fetched::Ready(_) => totals.delivered += 1,
            Fetched::Failed(err) => {
                warn!(index, error = %err, "Item failed");
                totals.failed += 1;
            }
        }
        write_item(out, format, index, &item)?;
    }

    out.flush()?;
    Ok(totals)
}

fn write_item<W: Write>(
    out: &mut W,
    format: OutputFormat,
    index: u64,
    item: &Fetched<u64>,
) -> Result<()> {
    match format {
        OutputFormat::Lines => match item {
            Fetched::Ready(value) => writeln!(out, "{}", value)?,
            Fetched::Failed(err) => writeln!(out, "!{}", err)?,
        },
        OutputFormat::Jsonl => {
            let error = item.error().map(|e| e.to_string());
            let record = ItemRecord {
                index,
                value: item.value().copied(),
                error: error.as_deref(),
            };
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
