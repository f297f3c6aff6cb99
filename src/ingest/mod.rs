//! Document ingestion pipeline
//!
//! Checksum dedup runs before any expensive work; the registry row moves
//! through pending -> processing -> ingested/failed; and deletion cascades
//! store -> registry -> files so the vector index never outlives the
//! registry entry.

use crate::chunk::{self, ChunkParams};
use crate::config::Config;
use crate::embed::{embed_in_batches, Embedder};
use crate::error::{Error, Result};
use crate::extract::{self, DocumentFormat, WORDS_PER_PAGE};
use crate::progress::counting_bar;
use crate::registry::{DocType, DocumentRecord, DocumentStatus, Registry};
use crate::store::{ChunkPayload, ChunkPoint, VectorStore};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Caller-supplied document metadata
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub title: String,
    pub source: String,
    pub country: String,
    pub doc_type: DocType,
    pub version: String,
    pub ingested_by: Option<String>,
    /// Re-ingest even when the checksum is already known
    pub force: bool,
}

/// What one successful ingestion produced
#[derive(Debug)]
pub struct IngestOutcome {
    pub document: DocumentRecord,
    pub pages: i32,
    pub chunks: usize,
}

pub struct Ingestor<'a> {
    config: &'a Config,
    registry: &'a Registry,
    store: &'a VectorStore,
    embedder: Arc<dyn Embedder>,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        config: &'a Config,
        registry: &'a Registry,
        store: &'a VectorStore,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            embedder,
        }
    }

    /// Ingest one file end to end.
    pub async fn ingest_file(&self, path: &Path, opts: IngestOptions) -> Result<IngestOutcome> {
        let format = DocumentFormat::from_extension(path)?;
        let bytes = std::fs::read(path)?;
        let checksum = hex_sha256(&bytes);

        if let Some(existing) = self.registry.get_document_by_checksum(&checksum).await? {
            if opts.force {
                info!(
                    "Checksum matches document {}; force re-ingest, deleting it first",
                    existing.id
                );
                self.delete_document(&existing.id).await?;
            } else {
                return Err(Error::Duplicate(format!(
                    "Document already ingested as '{}' (id {})",
                    existing.title, existing.id
                )));
            }
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let doc = DocumentRecord::new(
            checksum,
            filename,
            opts.title.clone(),
            opts.source.clone(),
            opts.country.clone(),
            opts.doc_type,
            opts.version.clone(),
            opts.ingested_by.clone(),
        );
        self.registry.insert_document(&doc).await?;

        match self.process(&doc, path, &bytes, format).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("Ingestion of {} failed: {}", doc.id, e);
                self.cleanup_failed(&doc.id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        doc: &DocumentRecord,
        path: &Path,
        bytes: &[u8],
        format: DocumentFormat,
    ) -> Result<IngestOutcome> {
        self.registry
            .update_document_status(&doc.id, DocumentStatus::Processing, None)
            .await?;

        let extracted = extract::extract_text(bytes, format)?;
        let text = extract::normalize_text(&extracted.text);
        if text.trim().is_empty() {
            return Err(Error::Extraction(
                "Document produced no extractable text".into(),
            ));
        }

        let params = ChunkParams::new(
            self.config.chunk.size_words,
            self.config.chunk.overlap_words,
        )?;
        let chunks = chunk::chunk_text(&text, &params);
        if chunks.is_empty() {
            return Err(Error::Extraction("Document produced no chunks".into()));
        }
        info!(
            "Extracted {} pages, {} chunks from '{}'",
            extracted.page_count,
            chunks.len(),
            doc.title
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let pb = counting_bar(texts.len() as u64, "Embedding chunks");
        let vectors = embed_in_batches(
            self.embedder.as_ref(),
            texts,
            self.config.embedding.batch_size,
            |done| pb.inc(done as u64),
        )
        .await;
        let vectors = match vectors {
            Ok(v) => {
                pb.finish_with_message("Chunks embedded");
                v
            }
            Err(e) => {
                pb.abandon_with_message("Embedding failed");
                return Err(e);
            }
        };

        let stride = params.stride();
        let points: Vec<ChunkPoint> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let page_no = ((chunk.index * stride / WORDS_PER_PAGE) as i32 + 1)
                    .min(extracted.page_count as i32);
                ChunkPoint::new(
                    vector,
                    ChunkPayload {
                        document_id: doc.id.clone(),
                        chunk_index: chunk.index as i32,
                        text: chunk.text.clone(),
                        title: doc.title.clone(),
                        source: doc.source.clone(),
                        country: doc.country.clone(),
                        doc_type: doc.doc_type.clone(),
                        version: doc.version.clone(),
                        page_no,
                    },
                )
            })
            .collect();

        self.store.ensure_collection().await?;
        self.store.upsert_chunks(points).await?;

        // Files are written last so a store failure leaves nothing to orphan
        let (original_path, text_path) = self.persist_files(doc, path, &text)?;

        self.registry
            .finalize_document(
                &doc.id,
                extracted.page_count as i32,
                chunks.len() as i32,
                &original_path.to_string_lossy(),
                &text_path.to_string_lossy(),
            )
            .await?;

        let document = self
            .registry
            .get_document(&doc.id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Document {} vanished mid-ingest", doc.id)))?;

        info!("Ingested '{}' as {}", document.title, document.id);
        Ok(IngestOutcome {
            pages: extracted.page_count as i32,
            chunks: chunks.len(),
            document,
        })
    }

    fn persist_files(
        &self,
        doc: &DocumentRecord,
        path: &Path,
        text: &str,
    ) -> Result<(PathBuf, PathBuf)> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_lowercase();
        let original_path = self
            .config
            .paths
            .uploads_dir
            .join(format!("{}.{}", doc.id, ext));
        let text_path = self.config.paths.texts_dir.join(format!("{}.txt", doc.id));

        std::fs::create_dir_all(&self.config.paths.uploads_dir)?;
        std::fs::create_dir_all(&self.config.paths.texts_dir)?;
        std::fs::copy(path, &original_path)?;
        if let Err(e) = std::fs::write(&text_path, text) {
            let _ = std::fs::remove_file(&original_path);
            return Err(e.into());
        }
        Ok((original_path, text_path))
    }

    /// Best-effort cleanup after a failed ingestion: drop any indexed points
    /// and stored file copies, then mark the registry row failed.
    async fn cleanup_failed(&self, document_id: &str, message: &str) {
        if let Err(e) = self.store.delete_by_document(document_id).await {
            warn!("Cleanup: could not delete points for {}: {}", document_id, e);
        }
        self.remove_backing_files(document_id);
        if let Err(e) = self
            .registry
            .update_document_status(document_id, DocumentStatus::Failed, Some(message))
            .await
        {
            warn!("Cleanup: could not mark {} failed: {}", document_id, e);
        }
    }

    /// Delete a document everywhere: vector store, then registry, then files.
    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        delete_document(self.registry, self.store, document_id).await
    }

    fn remove_backing_files(&self, document_id: &str) {
        for dir in [&self.config.paths.uploads_dir, &self.config.paths.texts_dir] {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                if name
                    .to_str()
                    .map(|n| n.starts_with(document_id))
                    .unwrap_or(false)
                {
                    debug!("Removing {}", entry.path().display());
                    let _ = std::fs::remove_file(entry.path());
                }
            }
        }
    }
}

/// Delete a document everywhere, in an order that never leaves indexed points
/// pointing at a missing registry row: store, then registry, then files.
pub async fn delete_document(
    registry: &Registry,
    store: &VectorStore,
    document_id: &str,
) -> Result<()> {
    let doc = registry
        .get_document(document_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No document with id '{}'", document_id)))?;

    store.delete_by_document(document_id).await?;
    registry.delete_document(document_id).await?;
    for stored in [&doc.original_path, &doc.text_path] {
        if let Some(p) = stored.as_deref().filter(|p| !p.is_empty()) {
            let _ = std::fs::remove_file(p);
        }
    }
    info!("Deleted document '{}' ({})", doc.title, doc.id);
    Ok(())
}

/// Lowercase hex SHA-256 of the raw bytes
pub fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Embedder that must never be reached
    struct UnusedEmbedder;

    #[async_trait]
    impl Embedder for UnusedEmbedder {
        async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Err(Error::Embedding("embedder should not be called".to_string()))
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "unused"
        }
    }

    #[tokio::test]
    async fn test_duplicate_checksum_rejected_before_any_indexing() {
        let tmp = TempDir::new().unwrap();
        let config = Config::default();
        let registry = Registry::new(&tmp.path().join("test.db")).await.unwrap();
        // Nothing listens on this port; the dedup path must bail before any
        // store or embedder call
        let store = VectorStore::new("http://127.0.0.1:6399", "test_chunks", 4)
            .await
            .unwrap();

        let body = b"whole grains and legumes daily";
        let file = tmp.path().join("guide.txt");
        std::fs::write(&file, body).unwrap();

        let existing = DocumentRecord::new(
            hex_sha256(body),
            "guide.txt".to_string(),
            "Diet guide".to_string(),
            "WHO".to_string(),
            "Global".to_string(),
            DocType::DietChart,
            "1.0".to_string(),
            None,
        );
        registry.insert_document(&existing).await.unwrap();

        let embedder: Arc<dyn Embedder> = Arc::new(UnusedEmbedder);
        let ingestor = Ingestor::new(&config, &registry, &store, embedder);
        let err = ingestor
            .ingest_file(
                &file,
                IngestOptions {
                    title: "Diet guide again".to_string(),
                    source: "WHO".to_string(),
                    country: "Global".to_string(),
                    doc_type: DocType::DietChart,
                    version: "1.0".to_string(),
                    ingested_by: None,
                    force: false,
                },
            )
            .await
            .unwrap_err();

        match err {
            Error::Duplicate(msg) => assert!(msg.contains(&existing.id)),
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn test_hex_sha256_known_vector() {
        assert_eq!(
            hex_sha256(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hex_sha256(b"abc"), hex_sha256(b"abc"));
        assert_ne!(hex_sha256(b"abc"), hex_sha256(b"abd"));
    }
}
