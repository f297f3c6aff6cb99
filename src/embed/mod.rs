//! Embedding generation
//!
//! This module provides an abstraction over embedding models with:
//! - A trait for embedding backends
//! - A process-wide shared embedder (the model loads once)
//! - Strictly sequential batch processing

mod fastembed_impl;

pub use fastembed_impl::*;

use crate::config::EmbeddingConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; output order matches input order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

static SHARED_EMBEDDER: OnceCell<Arc<dyn Embedder>> = OnceCell::const_new();

/// Get the process-wide embedder, loading the model on first use.
///
/// Queries and ingestion must embed with the same model instance so vectors
/// live in the same space. Concurrent first callers initialize exactly once;
/// a failed load is surfaced to every caller rather than retried silently.
pub async fn shared_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let embedder = SHARED_EMBEDDER
        .get_or_try_init(|| async {
            let embedder = FastEmbedder::new(config)?;
            Ok::<Arc<dyn Embedder>, crate::error::Error>(Arc::new(embedder))
        })
        .await?;
    Ok(embedder.clone())
}

/// Embed texts in sequential batches.
///
/// Batch N+1 is not submitted until batch N has completed; any batch failure
/// aborts the whole call. The flattened output preserves input order.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
    mut on_batch: impl FnMut(usize),
) -> Result<Vec<Vec<f32>>> {
    let mut all_embeddings = Vec::with_capacity(texts.len());
    let batch_size = batch_size.max(1);

    for chunk in texts.chunks(batch_size) {
        let batch_texts: Vec<String> = chunk.to_vec();
        let embeddings = embedder.embed(batch_texts).await?;
        on_batch(embeddings.len());
        all_embeddings.extend(embeddings);
    }

    Ok(all_embeddings)
}
