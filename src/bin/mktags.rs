//! Rebuilds `src/tags.rs` from the tags exiftool finds in a directory of sample images.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use exiftool_async::mktags::{self, DEFAULT_MIN_VALUES};
use exiftool_async::{ExifTool, ExifToolConfig, EXIFTOOL_PATH_ENV};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mktags")]
#[command(about = "Rebuilds src/tags.rs from tags found in IMG_DIR", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory searched recursively for sample files
    img_dir: PathBuf,

    /// Where the generated Rust source is written
    #[arg(short, long, default_value = "src/tags.rs")]
    out: PathBuf,

    /// File extensions to sample, case-insensitive (repeatable)
    #[arg(short, long = "extension", default_value = "jpg")]
    extensions: Vec<String>,

    /// Only tags seen in more than this many files get a field
    #[arg(long, default_value_t = DEFAULT_MIN_VALUES)]
    min_values: usize,

    /// Files read concurrently
    #[arg(short, long, default_value_t = 8)]
    concurrency: usize,

    /// exiftool executable
    #[arg(long, env = EXIFTOOL_PATH_ENV, default_value = "exiftool")]
    exiftool: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let files = mktags::find_files(&cli.img_dir, &cli.extensions);
    if files.is_empty() {
        eprintln!("No files found in {}", cli.img_dir.display());
        eprintln!();
        Cli::command().print_help()?;
        std::process::exit(1);
    }

    let config = ExifToolConfig::default().with_executable(cli.exiftool.clone());
    let exiftool = ExifTool::with_config(config)
        .await
        .with_context(|| format!("Failed to start {}", cli.exiftool.display()))?;
    log::info!(
        "Sampling {} files with exiftool {}",
        files.len(),
        exiftool.version().await?
    );

    let collector = mktags::sample(&exiftool, &files, cli.concurrency).await;
    println!("Read {} unique tags.", collector.len());

    let source = mktags::render(&collector, cli.min_values);
    std::fs::write(&cli.out, source)
        .with_context(|| format!("Failed to write {}", cli.out.display()))?;
    println!("Wrote {}", cli.out.display());

    exiftool.end().await;
    Ok(())
}
