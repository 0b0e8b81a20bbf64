use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::storage::DEFAULT_BATCH_ROWS;

/// Answer mean-severity queries over a batch of log commands.
#[derive(Debug, Clone, Parser)]
#[command(name = "severity-ql", version, about)]
pub struct Cli {
    /// Command file, one command per line.
    #[arg(default_value = "input.txt")]
    pub input: PathBuf,

    /// Where to write the results.
    #[arg(default_value = "output.txt")]
    pub output: PathBuf,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Also write run statistics as JSON to this path.
    #[arg(long)]
    pub stats: Option<PathBuf>,

    /// Rows buffered before the entry store seals a batch.
    #[arg(long, default_value_t = DEFAULT_BATCH_ROWS)]
    pub batch_rows: usize,
}

impl Cli {
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}
