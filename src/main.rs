use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use docloader::{config, logging, processing::IngestionService};

#[derive(Parser)]
#[command(
    name = "docloader",
    about = "OCR a folder of PDF reports and load the passages into Qdrant"
)]
struct Cli {
    /// Directory scanned for `*.pdf` files (overrides INGEST_INPUT_DIR).
    #[arg(long)]
    input_dir: Option<PathBuf>,
    /// Category stamped onto every passage (overrides INGEST_CATEGORY).
    #[arg(long)]
    category: Option<String>,
    /// JSON file mapping filenames to reference titles (overrides REFERENCE_MAP_PATH).
    #[arg(long)]
    reference_map: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::init_config()
        .context("failed to load configuration")?
        .clone();
    logging::init_tracing();

    if let Some(path) = cli.reference_map {
        config.reference_map_path = Some(path);
    }
    let input_dir = cli
        .input_dir
        .or_else(|| config.input_dir.clone())
        .ok_or_else(|| anyhow!("no input directory: pass --input-dir or set INGEST_INPUT_DIR"))?;
    let category = cli
        .category
        .or_else(|| config.category.clone())
        .ok_or_else(|| anyhow!("no category: pass --category or set INGEST_CATEGORY"))?;

    let service = IngestionService::from_config(&config)
        .await
        .context("failed to initialize ingestion pipeline")?;
    let summary = service
        .run(&input_dir, &category)
        .await
        .with_context(|| format!("failed to scan {}", input_dir.display()))?;

    println!(
        "Processed {} documents in {:.1}s: {} loaded ({} passages, {} oversize sub-chunks dropped), {} failed",
        summary.total,
        summary.elapsed.as_secs_f64(),
        summary.loaded.len(),
        summary.chunks_inserted(),
        summary.chunks_dropped(),
        summary.failed.len(),
    );
    for failure in &summary.failed {
        println!("  failed: {} ({})", failure.filename, failure.reason);
    }

    Ok(())
}
