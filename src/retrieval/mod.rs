//! Retrieval over the vector store
//!
//! Validated query requests, query normalization, similarity search with
//! registry enrichment, and multi-query context gathering for plan prompts.

use crate::config::QueryConfig;
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::store::{similarity_from_distance, SearchFilter, VectorStore};
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Characters outside this set are stripped from queries
fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s\-.,?!]").expect("static regex"))
}

/// Normalize a raw query: trim, strip noise characters, collapse whitespace
pub fn normalize_query(query: &str) -> String {
    let stripped = disallowed_chars().replace_all(query.trim(), "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A validated retrieval request
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub query: String,
    pub top_k: usize,
    pub min_score: f32,
    pub filter: SearchFilter,
}

impl RetrievalRequest {
    /// Validate and normalize a raw request
    pub fn new(
        query: &str,
        top_k: Option<usize>,
        min_score: Option<f32>,
        filter: SearchFilter,
        config: &QueryConfig,
    ) -> Result<Self> {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return Err(Error::Validation("query must not be empty".to_string()));
        }

        let top_k = top_k.unwrap_or(config.default_k);
        if top_k < 1 || top_k > config.max_k {
            return Err(Error::Validation(format!(
                "top_k must be between 1 and {}",
                config.max_k
            )));
        }

        let min_score = min_score.unwrap_or(config.min_score);
        if !(0.0..=1.0).contains(&min_score) {
            return Err(Error::Validation(
                "min_score must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(Self {
            query: normalized,
            top_k,
            min_score,
            filter,
        })
    }
}

/// A retrieved chunk with its similarity and document metadata
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    /// Logical chunk id: `{document_id}_chunk_{index}`
    pub id: String,
    pub document_id: String,
    pub chunk_index: i32,
    pub text: String,
    /// Similarity in [0, 1], derived as 1 - cosine distance
    pub similarity: f32,
    pub title: String,
    pub source: String,
    pub country: String,
    pub doc_type: String,
    pub version: String,
    pub page_no: i32,
}

/// Document attribution for a set of retrieved chunks
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContextSource {
    pub title: String,
    pub country: String,
    pub doc_type: String,
}

/// Context chunks plus deduplicated source attributions
#[derive(Debug, Clone, Serialize)]
pub struct ContextBundle {
    pub chunks: Vec<RetrievedChunk>,
    pub sources: Vec<ContextSource>,
}

/// Run a single retrieval request.
///
/// Embeds with the shared model, searches, converts distance to similarity,
/// drops hits under the threshold (an empty result is Ok, not an error) and
/// enriches survivors with registry metadata.
pub async fn search_chunks(
    registry: &Registry,
    store: &VectorStore,
    embedder: &dyn Embedder,
    request: &RetrievalRequest,
) -> Result<Vec<RetrievedChunk>> {
    info!("Querying: {}", request.query);

    let query_embeddings = embedder.embed(vec![request.query.clone()]).await?;
    let query_vector = query_embeddings
        .into_iter()
        .next()
        .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))?;

    let filter = if request.filter == SearchFilter::default() {
        None
    } else {
        Some(request.filter.clone())
    };

    let hits = store.search(query_vector, request.top_k, filter).await?;
    debug!("Got {} raw results from Qdrant", hits.len());

    let mut chunks: Vec<RetrievedChunk> = hits
        .into_iter()
        .filter_map(|hit| {
            let similarity = similarity_from_distance(hit.distance);
            if similarity < request.min_score {
                return None;
            }
            Some(RetrievedChunk {
                id: hit.id,
                document_id: hit.payload.document_id,
                chunk_index: hit.payload.chunk_index,
                text: hit.payload.text,
                similarity,
                title: hit.payload.title,
                source: hit.payload.source,
                country: hit.payload.country,
                doc_type: hit.payload.doc_type,
                version: hit.payload.version,
                page_no: hit.payload.page_no,
            })
        })
        .collect();

    enrich_from_registry(registry, &mut chunks).await?;

    info!("Returning {} results", chunks.len());
    Ok(chunks)
}

/// Overwrite chunk metadata with the registry's copy where available.
///
/// The registry is the metadata authority; payload copies can lag behind
/// (e.g. after a title correction).
async fn enrich_from_registry(registry: &Registry, chunks: &mut [RetrievedChunk]) -> Result<()> {
    let ids: Vec<String> = chunks
        .iter()
        .map(|c| c.document_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let docs = registry.get_documents_by_ids(&ids).await?;
    let by_id: HashMap<String, _> = docs.into_iter().map(|d| (d.id.clone(), d)).collect();

    for chunk in chunks.iter_mut() {
        if let Some(doc) = by_id.get(&chunk.document_id) {
            chunk.title = doc.title.clone();
            chunk.source = doc.source.clone();
            chunk.country = doc.country.clone();
            chunk.doc_type = doc.doc_type.clone();
            chunk.version = doc.version.clone();
        }
    }

    Ok(())
}

/// Gather context for a prompt from several query phrasings.
///
/// Results are merged in query order and deduplicated by the first 100
/// characters of chunk text (an accepted approximation of content identity).
pub async fn gather_context(
    registry: &Registry,
    store: &VectorStore,
    embedder: &dyn Embedder,
    queries: &[String],
    filter: SearchFilter,
    per_query_k: usize,
    min_score: f32,
    config: &QueryConfig,
) -> Result<ContextBundle> {
    let mut seen_prefixes: HashSet<String> = HashSet::new();
    let mut chunks: Vec<RetrievedChunk> = Vec::new();
    let mut sources: Vec<ContextSource> = Vec::new();

    for query in queries {
        let request = RetrievalRequest::new(
            query,
            Some(per_query_k.clamp(1, config.max_k)),
            Some(min_score),
            filter.clone(),
            config,
        )?;

        let results = search_chunks(registry, store, embedder, &request).await?;
        for chunk in results {
            let prefix: String = chunk.text.chars().take(100).collect();
            if !seen_prefixes.insert(prefix) {
                continue;
            }

            let source = ContextSource {
                title: chunk.title.clone(),
                country: chunk.country.clone(),
                doc_type: chunk.doc_type.clone(),
            };
            if !sources.iter().any(|s| s.title == source.title) {
                sources.push(source);
            }

            chunks.push(chunk);
        }
    }

    debug!(
        "Gathered {} context chunks from {} queries",
        chunks.len(),
        queries.len()
    );

    Ok(ContextBundle { chunks, sources })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_config() -> QueryConfig {
        QueryConfig {
            default_k: 5,
            max_k: 50,
            min_score: 0.0,
        }
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(
            normalize_query("  What should  I eat?  "),
            "What should I eat?"
        );
        assert_eq!(
            normalize_query("sugar-free <script>alert(1)</script> snacks!"),
            "sugar-free scriptalert1script snacks!"
        );
        assert_eq!(normalize_query("@#$%^&*"), "");
    }

    #[test]
    fn test_request_validation() {
        let config = query_config();

        let ok = RetrievalRequest::new(
            "low carb breakfast",
            Some(10),
            Some(0.4),
            SearchFilter::default(),
            &config,
        )
        .unwrap();
        assert_eq!(ok.top_k, 10);
        assert_eq!(ok.min_score, 0.4);

        assert!(matches!(
            RetrievalRequest::new("q", Some(0), None, SearchFilter::default(), &config),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            RetrievalRequest::new("q", Some(51), None, SearchFilter::default(), &config),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            RetrievalRequest::new("q", None, Some(1.5), SearchFilter::default(), &config),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            RetrievalRequest::new("   ", None, None, SearchFilter::default(), &config),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_request_defaults_from_config() {
        let config = query_config();
        let req =
            RetrievalRequest::new("snacks", None, None, SearchFilter::default(), &config).unwrap();
        assert_eq!(req.top_k, 5);
        assert_eq!(req.min_score, 0.0);
    }
}
