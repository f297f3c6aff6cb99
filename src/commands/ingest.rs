//! Ingest command implementation

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::Result;
use crate::ingest::{IngestOptions, IngestOutcome, Ingestor};
use crate::registry::{DocType, Registry};
use crate::store::VectorStore;
use std::path::Path;
use std::sync::Arc;

/// CLI-facing metadata for one document
#[derive(Debug, Clone)]
pub struct IngestArgs {
    pub title: String,
    pub source: String,
    pub country: String,
    pub doc_type: DocType,
    pub version: String,
    pub ingested_by: Option<String>,
    pub force: bool,
}

pub async fn cmd_ingest(
    config: &Config,
    registry: &Registry,
    store: &VectorStore,
    embedder: Arc<dyn Embedder>,
    path: &Path,
    args: IngestArgs,
) -> Result<IngestOutcome> {
    store.health_check().await?;
    let ingestor = Ingestor::new(config, registry, store, embedder);
    ingestor
        .ingest_file(
            path,
            IngestOptions {
                title: args.title,
                source: args.source,
                country: args.country,
                doc_type: args.doc_type,
                version: args.version,
                ingested_by: args.ingested_by,
                force: args.force,
            },
        )
        .await
}

pub fn print_ingest_outcome(outcome: &IngestOutcome) {
    println!("\n✓ Document ingested");
    println!("  ID: {}", outcome.document.id);
    println!("  Title: {}", outcome.document.title);
    println!(
        "  Region: {} [{}]",
        outcome.document.country, outcome.document.doc_type
    );
    println!("  Pages: {}", outcome.pages);
    println!("  Chunks: {}", outcome.chunks);
}
