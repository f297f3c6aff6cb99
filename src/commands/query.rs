//! Query command implementation

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::Result;
use crate::registry::Registry;
use crate::retrieval::{search_chunks, RetrievalRequest, RetrievedChunk};
use crate::store::{SearchFilter, VectorStore};
use serde::Serialize;
use tracing::info;

/// Query options from the CLI
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub k: Option<usize>,
    pub min_score: Option<f32>,
    pub country: Option<String>,
    pub doc_type: Option<String>,
}

/// Query result for CLI display
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub query: String,
    pub results: Vec<RetrievedChunk>,
}

pub async fn cmd_query(
    config: &Config,
    registry: &Registry,
    store: &VectorStore,
    embedder: &dyn Embedder,
    query: &str,
    options: QueryOptions,
) -> Result<QueryResult> {
    let filter = SearchFilter {
        country: options.country,
        doc_type: options.doc_type,
    };
    let request = RetrievalRequest::new(
        query,
        options.k,
        options.min_score,
        filter,
        &config.query,
    )?;
    let results = search_chunks(registry, store, embedder, &request).await?;
    info!("Returning {} results", results.len());

    Ok(QueryResult {
        query: request.query,
        results,
    })
}

pub fn print_query_results(result: &QueryResult) {
    println!("\n🔍 Results for: {}\n", result.query);

    if result.results.is_empty() {
        println!("No matching chunks. Try a broader query or relax the filters.");
        return;
    }

    for (i, chunk) in result.results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} ({} / {}, p.{})",
            i + 1,
            chunk.similarity,
            chunk.title,
            chunk.country,
            chunk.doc_type,
            chunk.page_no
        );
        let preview: String = chunk.text.chars().take(240).collect();
        println!("   {}\n", preview.replace('\n', " "));
    }
}
