use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use severity_ql::{config::Cli, io, EntryStore, Interpreter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(cli.env_filter())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!(input = %cli.input.display(), output = %cli.output.display(), "Starting severity-ql...");

    let lines = io::read_lines(&cli.input).await?;

    let mut interpreter = Interpreter::new(EntryStore::with_batch_rows(cli.batch_rows));
    let output = interpreter
        .process(&lines)
        .context("failed to process command file")?;

    io::write_lines(&cli.output, &output).await?;

    let stats = interpreter.stats();
    if let Some(path) = &cli.stats {
        io::write_stats(path, stats).await?;
    }

    info!(
        lines = stats.lines_read,
        results = stats.lines_written,
        entries = stats.entries_added,
        skipped = stats.malformed_adds + stats.unrecognized_lines,
        "Finished"
    );

    Ok(())
}
