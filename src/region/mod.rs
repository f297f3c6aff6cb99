//! Region coverage checks and fallback resolution
//!
//! Plan generation is only allowed against regions the knowledge base
//! actually covers. Coverage counts region-specific documents plus documents
//! filed under the "Global" region; when a requested region has nothing, a
//! fixed alias ladder is tried, then any region with documents at all.

use crate::error::{Error, Result};
use crate::registry::{DocType, RegionCount, Registry};
use serde::Serialize;
use tracing::{debug, info};

/// Regions tried, in order, when the requested one has no documents
pub const FALLBACK_REGIONS: &[&str] = &["Global", "International", "WHO", "IDF"];

/// The catch-all region that counts toward every region's coverage
pub const GLOBAL_REGION: &str = "Global";

/// Coverage quality buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageTier {
    Excellent,
    Good,
    Limited,
    None,
}

impl CoverageTier {
    fn from_count(count: i64) -> Self {
        match count {
            c if c >= 5 => CoverageTier::Excellent,
            c if c >= 2 => CoverageTier::Good,
            c if c >= 1 => CoverageTier::Limited,
            _ => CoverageTier::None,
        }
    }
}

impl std::fmt::Display for CoverageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoverageTier::Excellent => write!(f, "excellent"),
            CoverageTier::Good => write!(f, "good"),
            CoverageTier::Limited => write!(f, "limited"),
            CoverageTier::None => write!(f, "none"),
        }
    }
}

/// Coverage report for one region and document type
#[derive(Debug, Clone, Serialize)]
pub struct RegionCoverage {
    pub region: String,
    pub document_count: i64,
    pub region_specific_count: i64,
    pub global_count: i64,
    pub can_generate_plan: bool,
    pub tier: CoverageTier,
}

/// Check how well a region is covered for the given document type
pub async fn check_coverage(
    registry: &Registry,
    region: &str,
    doc_type: DocType,
) -> Result<RegionCoverage> {
    let region_specific = registry.count_region_documents(region, doc_type).await?;
    let global = if region == GLOBAL_REGION {
        0
    } else {
        registry
            .count_region_documents(GLOBAL_REGION, doc_type)
            .await?
    };

    let total = region_specific + global;
    Ok(RegionCoverage {
        region: region.to_string(),
        document_count: total,
        region_specific_count: region_specific,
        global_count: global,
        can_generate_plan: total >= 1,
        tier: CoverageTier::from_count(total),
    })
}

/// Resolve the region plan generation should use.
///
/// Tries the requested region, then the alias ladder, then any region that
/// has documents of this type at all. Fails before any LLM budget is spent
/// when the knowledge base is empty for this type.
pub async fn resolve_region(
    registry: &Registry,
    requested: &str,
    doc_type: DocType,
) -> Result<String> {
    let coverage = check_coverage(registry, requested, doc_type).await?;
    if coverage.can_generate_plan {
        debug!(
            "Region '{}' covered for {} ({} documents, {})",
            requested, doc_type, coverage.document_count, coverage.tier
        );
        return Ok(requested.to_string());
    }

    for alias in FALLBACK_REGIONS {
        if *alias == requested {
            continue;
        }
        let count = registry.count_region_documents(alias, doc_type).await?;
        debug!("Fallback region '{}' for {}: {} documents", alias, doc_type, count);
        if count >= 1 {
            info!(
                "Region '{}' has no {} documents; falling back to '{}'",
                requested, doc_type, alias
            );
            return Ok(alias.to_string());
        }
    }

    let counts = registry.region_counts(Some(doc_type)).await?;
    if let Some(first) = counts.first() {
        info!(
            "Region '{}' has no {} documents; using best-covered region '{}'",
            requested, doc_type, first.country
        );
        return Ok(first.country.clone());
    }

    Err(Error::EmptyResult(format!(
        "No {} documents are available for any region; ingest documents before generating plans",
        doc_type
    )))
}

/// Distinct regions that have at least one ingested document of this type
pub async fn available_regions(
    registry: &Registry,
    doc_type: Option<DocType>,
) -> Result<Vec<String>> {
    let counts = registry.region_counts(doc_type).await?;
    Ok(counts.into_iter().map(|c| c.country).collect())
}

/// Per-region document counts, most-covered first
pub async fn region_stats(
    registry: &Registry,
    doc_type: Option<DocType>,
) -> Result<Vec<RegionCount>> {
    registry.region_counts(doc_type).await
}
