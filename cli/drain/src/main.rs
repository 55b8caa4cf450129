//! pc-drain CLI
//!
//! Drains a prefetch cursor over a simulated high-latency source and prints
//! every item in order.

use clap::Parser;
use pc_cli_common::{format_number, format_rate, init_logging};

mod args;
mod run;
mod source;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Initialize logging (to stderr, so stdout is clean for output)
    init_logging(args.log_level)?;

    let summary = run::execute(&args).await?;
    let stats = &summary.stats;

    // Report results to stderr
    eprintln!();
    eprintln!("Drain completed:");
    eprintln!("  Passes:          {}", summary.passes);
    eprintln!("  Items delivered: {}", format_number(summary.delivered));
    eprintln!("  Items failed:    {}", format_number(summary.failed));
    eprintln!("  Fetches:         {}", format_number(stats.fetches_launched));
    eprintln!("  Peak in flight:  {}", stats.max_in_flight);
    eprintln!("  Peak buffered:   {}", stats.max_buffered);

    if let Some(duration) = stats.duration() {
        let secs = duration.num_milliseconds() as f64 / 1000.0;
        eprintln!("  Duration:        {:.2}s", secs);
    }
    if let Some(rate) = stats.delivery_rate() {
        eprintln!("  Throughput:      {}", format_rate(rate, "items"));
    }

    if args.stats_json {
        eprintln!("{}", serde_json::to_string_pretty(stats)?);
    }

    // Exit with error code if any item failed
    if summary.failed > 0 {
        std::process::exit(4); // Partial failure
    }

    Ok(())
}
