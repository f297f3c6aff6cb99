//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::registry::Registry;
use crate::store::VectorStore;
use serde::Serialize;

/// Snapshot of the whole system for `nutriplan status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub qdrant_url: String,
    pub collection_name: String,
    pub qdrant_connected: bool,
    pub collection_exists: bool,
    pub qdrant_points: u64,
    pub embedding_model: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub ingested_documents: i64,
    pub regions: usize,
}

pub async fn cmd_status(
    config: &Config,
    registry: &Registry,
    store: &VectorStore,
) -> Result<StatusInfo> {
    let (qdrant_connected, collection_exists, qdrant_points) =
        match store.get_collection_info().await {
            Ok(Some(info)) => (true, true, info.points_count),
            Ok(None) => (true, false, 0),
            Err(_) => (false, false, 0),
        };

    let ingested_documents = registry.count_ingested_documents().await?;
    let regions = registry.region_counts(None).await?.len();

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        qdrant_url: config.qdrant_url.clone(),
        collection_name: config.collection_name.clone(),
        qdrant_connected,
        collection_exists,
        qdrant_points,
        embedding_model: config.embedding.model.clone(),
        llm_base_url: config.llm.base_url.clone(),
        llm_model: config.llm.model.clone(),
        ingested_documents,
        regions,
    })
}

pub fn print_status(status: &StatusInfo) {
    println!("\n📊 nutriplan Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!("\nQdrant:");
    println!("  URL: {}", status.qdrant_url);
    println!("  Collection: {}", status.collection_name);

    let connection_status = if status.qdrant_connected {
        if status.collection_exists {
            "✓ Connected"
        } else {
            "⚠ Connected (collection not created - run 'nutriplan db init')"
        }
    } else {
        "✗ Not connected"
    };
    println!("  Status: {}", connection_status);
    println!("  Points: {}", status.qdrant_points);
    println!("\nEmbedding Model: {}", status.embedding_model);
    println!("LLM: {} at {}", status.llm_model, status.llm_base_url);
    println!("\nKnowledge Base:");
    println!("  Ingested documents: {}", status.ingested_documents);
    println!("  Regions covered: {}", status.regions);
}
