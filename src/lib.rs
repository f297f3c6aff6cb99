//! nutriplan - RAG-backed diet and exercise plan generation for diabetes care
//!
//! This crate provides:
//! - CLI commands for ingesting regional guideline documents (PDF/DOCX/text)
//! - Semantic retrieval over Qdrant with region and document-type filters
//! - LLM-backed daily diet and exercise plan generation with layered JSON
//!   recovery and calorie-aware sanitization

pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod plan;
pub mod progress;
pub mod region;
pub mod registry;
pub mod retrieval;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
