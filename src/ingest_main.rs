use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use ragdesk::core::config::{AppPaths, ConfigService, RagSettings};
use ragdesk::core::logging;
use ragdesk::documents::DocumentParser;
use ragdesk::ingest::BatchIngestor;
use ragdesk::llm::build_backends;
use ragdesk::rag::VectorStore;

#[derive(Parser, Debug)]
#[command(name = "ragdesk-ingest")]
#[command(about = "Rebuild the vector store from a directory of documents")]
struct Args {
    /// Directory to index (defaults to `ingest.data_dir`)
    root: Option<PathBuf>,

    /// Snapshot file to write instead of the configured store path
    #[arg(long)]
    store: Option<PathBuf>,

    /// Config file to read instead of the discovered `config.yml`
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_cli();

    let paths = Arc::new(AppPaths::new());
    let config = match args.config {
        Some(path) => ConfigService::with_config_path(paths.clone(), path),
        None => ConfigService::new(paths.clone()),
    };
    let raw = config.load_config().context("Failed to load configuration")?;
    let settings = RagSettings::from_config(&raw, &paths);

    let root = args.root.unwrap_or_else(|| settings.ingest_data_dir.clone());
    let store_path = args.store.unwrap_or_else(|| settings.store_path.clone());

    let (_, embedder) = build_backends(&settings.llm);
    let store = VectorStore::open(store_path.clone(), embedder)
        .await
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;
    let parser = DocumentParser::new(settings.web_fetch_timeout)?;

    let ingestor = BatchIngestor::new(Arc::new(store), parser, &settings.chunking)?;
    let report = ingestor
        .run_with_progress(&root, |file| {
            println!("Indexing {} ({} chunks)", file.path, file.chunks);
        })
        .await
        .with_context(|| format!("Failed to index {}", root.display()))?;

    println!(
        "Indexed {} files; {} chunks in {}",
        report.files.len(),
        report.total,
        store_path.display()
    );
    Ok(())
}
