//! Qdrant vector database integration
//!
//! This module wraps the Qdrant client and provides:
//! - Collection management
//! - Point upsert/delete operations
//! - Vector search with metadata filters
//!
//! Qdrant reports cosine similarity for matches; this adapter converts it to
//! cosine distance at the boundary so every hit carries `distance` and
//! callers derive similarity through [`similarity_from_distance`] alone.

mod payload;

pub use payload::*;

use crate::config::Config;
use crate::error::{Error, Result};
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    ScalarQuantizationBuilder, SearchPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::Value;
use tracing::{debug, info};

/// The one place `distance` becomes `similarity`
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 - distance
}

/// Information about the collection
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub points_count: u64,
    pub indexed_vectors_count: u64,
    pub status: String,
}

/// Qdrant store handle
pub struct VectorStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl VectorStore {
    /// Connect to Qdrant using config
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::new(
            &config.qdrant_url,
            &config.collection_name,
            config.embedding.resolved_dimension(),
        )
        .await
    }

    /// Create a new store connection directly with URL and collection name
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| Error::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    /// Get the expected vector dimension for this store
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Probe the backend, translating an unreachable server into an
    /// actionable connectivity error
    pub async fn health_check(&self) -> Result<()> {
        self.client.health_check().await.map_err(|e| {
            Error::Connectivity(format!(
                "Qdrant is unreachable ({}). Start it with: docker run -p 6333:6333 -p 6334:6334 qdrant/qdrant",
                e
            ))
        })?;
        Ok(())
    }

    /// Ensure the collection exists with correct configuration
    pub async fn ensure_collection(&self) -> Result<()> {
        let exists = self.client.collection_exists(&self.collection).await?;

        if exists {
            debug!("Collection {} already exists", self.collection);

            if let Some(size) = self.collection_vector_size().await? {
                if size != self.dimension {
                    return Err(Error::Qdrant(format!(
                        "Collection '{}' has vector size {}, but the embedding model expects {}. Set a new collection name or reindex with the expected dimension.",
                        self.collection, size, self.dimension
                    )));
                }
            }

            return Ok(());
        }

        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );

        let vectors_config = VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(vectors_config)
                    .quantization_config(ScalarQuantizationBuilder::default()),
            )
            .await?;

        info!("Collection {} created successfully", self.collection);
        Ok(())
    }

    /// Check if the collection exists
    pub async fn collection_exists(&self) -> Result<bool> {
        let exists = self.client.collection_exists(&self.collection).await?;
        Ok(exists)
    }

    /// Reset the collection (delete and recreate)
    pub async fn reset_collection(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            info!("Deleting existing collection {}", self.collection);
            self.client.delete_collection(&self.collection).await?;
        }

        self.ensure_collection().await?;
        Ok(())
    }

    /// Get collection info (point count, etc)
    pub async fn get_collection_info(&self) -> Result<Option<CollectionInfo>> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(None);
        }

        let info = self.client.collection_info(&self.collection).await?;
        if let Some(result) = info.result {
            Ok(Some(CollectionInfo {
                points_count: result.points_count.unwrap_or(0),
                indexed_vectors_count: result.indexed_vectors_count.unwrap_or(0),
                status: format!("{:?}", result.status()),
            }))
        } else {
            Ok(None)
        }
    }

    /// Upsert chunk points (converts to PointStruct internally)
    pub async fn upsert_chunks(&self, points: Vec<ChunkPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        if let Some(mismatch) = points.iter().find(|p| p.vector.len() != self.dimension) {
            return Err(Error::Qdrant(format!(
                "Vector dimension mismatch for collection '{}': expected {} (got {})",
                self.collection,
                self.dimension,
                mismatch.vector.len()
            )));
        }

        debug!(
            "Upserting {} points to collection {}",
            points.len(),
            self.collection
        );

        let point_structs: Vec<_> = points.into_iter().map(|p| p.to_point_struct()).collect();

        self.client
            .upsert_points(qdrant_client::qdrant::UpsertPointsBuilder::new(
                &self.collection,
                point_structs,
            ))
            .await?;

        Ok(())
    }

    /// Delete every point belonging to a document
    pub async fn delete_by_document(&self, document_id: &str) -> Result<()> {
        debug!(
            "Deleting points for document {} from collection {}",
            document_id, self.collection
        );

        let filter = Filter {
            must: vec![Condition::matches("document_id", document_id.to_string())],
            should: vec![],
            must_not: vec![],
            min_should: None,
        };

        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(filter))
            .await?;

        Ok(())
    }

    /// Search for similar vectors.
    ///
    /// Hits carry cosine distance, smaller is closer.
    pub async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: usize,
        filter: Option<SearchFilter>,
    ) -> Result<Vec<SearchHit>> {
        debug!(
            "Searching collection {} with limit {}",
            self.collection, limit
        );

        let mut search_builder =
            SearchPointsBuilder::new(&self.collection, query_vector, limit as u64)
                .with_payload(true);

        if let Some(f) = filter {
            if let Some(qdrant_filter) = f.to_qdrant_filter() {
                search_builder = search_builder.filter(qdrant_filter);
            }
        }

        let response = self.client.search_points(search_builder).await?;

        let results: Vec<SearchHit> = response
            .result
            .into_iter()
            .map(|p| {
                let payload: ChunkPayload = p
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, json_from_qdrant_value(v)))
                    .collect::<serde_json::Map<String, Value>>()
                    .into();

                SearchHit {
                    id: payload.logical_id(),
                    distance: 1.0 - p.score,
                    payload,
                }
            })
            .collect();

        Ok(results)
    }

    async fn collection_vector_size(&self) -> Result<Option<usize>> {
        let info = self.client.collection_info(&self.collection).await?;

        let size = info
            .result
            .as_ref()
            .and_then(|r| r.config.as_ref())
            .and_then(|c| c.params.as_ref())
            .and_then(|p| p.vectors_config.as_ref())
            .and_then(|v| v.config.as_ref())
            .and_then(|c| match c {
                qdrant_client::qdrant::vectors_config::Config::Params(params) => {
                    Some(params.size as usize)
                }
                qdrant_client::qdrant::vectors_config::Config::ParamsMap(_) => None,
            });

        Ok(size)
    }
}

/// A single search match
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Logical chunk id: `{document_id}_chunk_{index}`
    pub id: String,

    /// Cosine distance to the query (similarity = 1 - distance)
    pub distance: f32,

    pub payload: ChunkPayload,
}

/// Metadata filter for searches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub country: Option<String>,
    pub doc_type: Option<String>,
}

impl SearchFilter {
    pub fn to_qdrant_filter(&self) -> Option<Filter> {
        let mut must_conditions: Vec<Condition> = Vec::new();

        if let Some(ref country) = self.country {
            must_conditions.push(Condition::matches("country", country.clone()));
        }

        if let Some(ref doc_type) = self.doc_type {
            must_conditions.push(Condition::matches("doc_type", doc_type.clone()));
        }

        if must_conditions.is_empty() {
            return None;
        }

        Some(Filter {
            must: must_conditions,
            should: vec![],
            must_not: vec![],
            min_should: None,
        })
    }
}

/// Convert Qdrant value to serde_json Value
fn json_from_qdrant_value(v: qdrant_client::qdrant::Value) -> Value {
    use qdrant_client::qdrant::value::Kind;

    match v.kind {
        Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(
            list.values
                .into_iter()
                .map(json_from_qdrant_value)
                .collect(),
        ),
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_contract() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
        assert_eq!(similarity_from_distance(1.0), 0.0);
        assert!((similarity_from_distance(0.25) - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_search_filter_to_qdrant() {
        let filter = SearchFilter {
            country: Some("India".to_string()),
            doc_type: Some("diet_chart".to_string()),
        };
        assert_eq!(filter.to_qdrant_filter().unwrap().must.len(), 2);

        let partial = SearchFilter {
            country: None,
            doc_type: Some("diet_chart".to_string()),
        };
        assert_eq!(partial.to_qdrant_filter().unwrap().must.len(), 1);

        assert!(SearchFilter::default().to_qdrant_filter().is_none());
    }

    #[tokio::test]
    async fn test_upsert_rejects_dimension_mismatch() {
        let store = VectorStore::new("http://127.0.0.1:6334", "test_collection", 3)
            .await
            .expect("store should initialize");

        let payload = ChunkPayload {
            document_id: "doc-1".to_string(),
            chunk_index: 0,
            text: "whole grains".to_string(),
            title: "Guide".to_string(),
            source: "WHO".to_string(),
            country: "Global".to_string(),
            doc_type: "diet_chart".to_string(),
            version: "1.0".to_string(),
            page_no: 1,
        };

        let point = ChunkPoint::new(vec![0.1, 0.2], payload);

        let err = store
            .upsert_chunks(vec![point])
            .await
            .expect_err("should reject mismatched vector length");

        match err {
            Error::Qdrant(message) => assert!(message.contains("dimension mismatch")),
            other => panic!("expected qdrant error, got {other:?}"),
        }
    }
}
