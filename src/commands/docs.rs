//! Document listing and removal commands

use crate::error::Result;
use crate::ingest;
use crate::registry::{DocType, DocumentRecord, Registry};
use crate::store::VectorStore;

pub async fn cmd_list_documents(
    registry: &Registry,
    doc_type: Option<DocType>,
    country: Option<&str>,
) -> Result<Vec<DocumentRecord>> {
    registry.list_documents(doc_type, country).await
}

/// Remove a document and everything derived from it
pub async fn cmd_remove_document(
    registry: &Registry,
    store: &VectorStore,
    document_id: &str,
) -> Result<()> {
    store.health_check().await?;
    ingest::delete_document(registry, store, document_id).await
}

pub fn print_documents(documents: &[DocumentRecord]) {
    println!("\n📚 Documents\n");

    if documents.is_empty() {
        println!("No documents. Use 'nutriplan ingest' to add guideline documents.");
        return;
    }

    for doc in documents {
        println!(
            "• {} [{} / {}] {} pages, {} chunks, status {}",
            doc.title, doc.country, doc.doc_type, doc.page_count, doc.chunk_count, doc.status
        );
        println!("  id: {}", doc.id);
        if let Some(err) = doc.error_message.as_deref().filter(|e| !e.is_empty()) {
            println!("  error: {}", err);
        }
    }
}
