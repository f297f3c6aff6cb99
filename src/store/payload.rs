//! Payload schema for Qdrant points

use crate::chunk::chunk_point_id;
use qdrant_client::qdrant::{PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// A point ready to be upserted to Qdrant
#[derive(Debug, Clone)]
pub struct ChunkPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl ChunkPoint {
    /// Build a point from a chunk and its embedding.
    ///
    /// Qdrant point ids must be UUIDs or integers, so the stable logical id
    /// `{document_id}_chunk_{index}` is hashed to a v5 UUID; the logical id
    /// itself travels in the payload.
    pub fn new(vector: Vec<f32>, payload: ChunkPayload) -> Self {
        let logical = chunk_point_id(&payload.document_id, payload.chunk_index as usize);
        Self {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, logical.as_bytes()),
            vector,
            payload,
        }
    }

    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(self) -> PointStruct {
        let payload_map = self.payload.to_qdrant_payload();
        PointStruct::new(self.id.to_string(), self.vector, payload_map)
    }
}

/// Payload stored with each chunk in Qdrant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Owning document ID
    pub document_id: String,

    /// Chunk index within the document (contiguous from 0)
    pub chunk_index: i32,

    /// Chunk text
    pub text: String,

    /// Document title
    pub title: String,

    /// Publishing source (e.g. "WHO", "ADA")
    pub source: String,

    /// Region/country the document covers
    pub country: String,

    /// Document type ("diet_chart", "exercise_recommendation", ...)
    pub doc_type: String,

    /// Document version
    pub version: String,

    /// Estimated page this chunk starts on
    pub page_no: i32,
}

impl ChunkPayload {
    /// The logical chunk id: `{document_id}_chunk_{index}`
    pub fn logical_id(&self) -> String {
        chunk_point_id(&self.document_id, self.chunk_index as usize)
    }

    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(self) -> HashMap<String, QdrantValue> {
        let mut map = HashMap::new();

        map.insert(
            "document_id".to_string(),
            string_to_qdrant(&self.document_id),
        );
        map.insert(
            "chunk_index".to_string(),
            int_to_qdrant(self.chunk_index as i64),
        );
        map.insert("text".to_string(), string_to_qdrant(&self.text));
        map.insert("title".to_string(), string_to_qdrant(&self.title));
        map.insert("source".to_string(), string_to_qdrant(&self.source));
        map.insert("country".to_string(), string_to_qdrant(&self.country));
        map.insert("doc_type".to_string(), string_to_qdrant(&self.doc_type));
        map.insert("version".to_string(), string_to_qdrant(&self.version));
        map.insert("page_no".to_string(), int_to_qdrant(self.page_no as i64));

        map
    }
}

fn string_to_qdrant(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::StringValue(
            s.to_string(),
        )),
    }
}

fn int_to_qdrant(i: i64) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::IntegerValue(i)),
    }
}

impl From<Map<String, Value>> for ChunkPayload {
    fn from(map: Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(map)).unwrap_or_else(|_| ChunkPayload {
            document_id: String::new(),
            chunk_index: 0,
            text: String::new(),
            title: String::new(),
            source: String::new(),
            country: String::new(),
            doc_type: String::new(),
            version: String::new(),
            page_no: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> ChunkPayload {
        ChunkPayload {
            document_id: "doc-456".to_string(),
            chunk_index: 2,
            text: "Prefer whole grains over refined carbohydrates.".to_string(),
            title: "Diet guidance".to_string(),
            source: "WHO".to_string(),
            country: "Global".to_string(),
            doc_type: "diet_chart".to_string(),
            version: "1.0".to_string(),
            page_no: 1,
        }
    }

    #[test]
    fn test_payload_serialization() {
        let payload = sample_payload();

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("document_id"));
        assert!(json.contains("doc-456"));

        let parsed: ChunkPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.document_id, "doc-456");
        assert_eq!(parsed.logical_id(), "doc-456_chunk_2");
    }

    #[test]
    fn test_point_id_is_stable() {
        let a = ChunkPoint::new(vec![0.0; 3], sample_payload());
        let b = ChunkPoint::new(vec![1.0; 3], sample_payload());
        assert_eq!(a.id, b.id);

        let mut other = sample_payload();
        other.chunk_index = 3;
        let c = ChunkPoint::new(vec![0.0; 3], other);
        assert_ne!(a.id, c.id);
    }
}
