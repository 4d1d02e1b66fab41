//! flatbeam CLI: load a train/test pair and sanity-check the row counts.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use flatbeam::{DatasetLoader, FileReport, LoadConfig, verify_dataset};
use tracing_subscriber::EnvFilter;

/// Load, sample and flatten a train/test dataset pair.
#[derive(Parser, Debug)]
#[command(name = "flatbeam")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding train.csv and test.csv
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,
    /// JSON load config, used instead of the Google Analytics preset
    #[arg(long)]
    config: Option<PathBuf>,
    /// Load only a limited number of rows from each file
    #[arg(long)]
    debug: bool,
    /// With --debug, spread the rows evenly over each file
    #[arg(long)]
    even: bool,
    /// Row cap used by --debug
    #[arg(long)]
    max_rows: Option<u64>,
    /// Expand nested objects this many levels deep
    #[arg(long)]
    depth: Option<usize>,
    /// Load train and test one after the other
    #[arg(long)]
    sequential: bool,
    /// Print the first N training rows as JSON lines
    #[arg(long, default_value_t = 0)]
    show: usize,
}

impl Cli {
    fn load_config(&self) -> Result<LoadConfig> {
        let mut config = match &self.config {
            Some(path) => LoadConfig::from_json_file(path)?,
            None => LoadConfig::google_analytics(&self.data_dir),
        };
        if self.debug {
            config.limit.limited = true;
        }
        if self.even {
            config.limit.evenly_sampled = true;
        }
        if let Some(max_rows) = self.max_rows {
            config.limit.max_rows = max_rows;
        }
        if let Some(depth) = self.depth {
            config.flatten.max_depth = depth;
        }
        if self.sequential {
            config.parallel = false;
        }
        Ok(config)
    }
}

fn summarize(report: &FileReport, columns: usize) {
    println!(
        "{}: {} rows kept of {} scanned (stride {}), {} columns",
        report.label,
        report.rows_kept,
        report.rows_scanned,
        report.plan.stride,
        columns
    );
    for (nested, count) in &report.flattened {
        println!("  {nested}: {count} flattened columns");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    let loader = DatasetLoader::new(config)?;
    let dataset = loader.load()?;

    verify_dataset(&dataset, loader.config())?;

    summarize(&dataset.train.report, dataset.train.table.num_columns());
    summarize(&dataset.test.report, dataset.test.table.num_columns());
    for row in dataset.train.table.rows().take(cli.show) {
        println!("{}", row.to_json());
    }

    println!("Successfully loaded the dataset.");
    Ok(())
}
