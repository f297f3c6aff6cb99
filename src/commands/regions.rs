//! Region coverage commands

use crate::error::Result;
use crate::region::{self, RegionCoverage};
use crate::registry::{DocType, RegionCount, Registry};

pub async fn cmd_region_stats(
    registry: &Registry,
    doc_type: Option<DocType>,
) -> Result<Vec<RegionCount>> {
    region::region_stats(registry, doc_type).await
}

pub async fn cmd_check_region(
    registry: &Registry,
    region_name: &str,
    doc_type: DocType,
) -> Result<RegionCoverage> {
    region::check_coverage(registry, region_name, doc_type).await
}

pub fn print_region_stats(counts: &[RegionCount], doc_type: Option<DocType>) {
    match doc_type {
        Some(t) => println!("\n🌍 Region coverage ({})\n", t),
        None => println!("\n🌍 Region coverage\n"),
    }

    if counts.is_empty() {
        println!("No ingested documents yet.");
        return;
    }

    for count in counts {
        println!("• {}: {} documents", count.country, count.document_count);
    }
}

pub fn print_region_coverage(coverage: &RegionCoverage) {
    println!("\n🌍 Coverage for {}\n", coverage.region);
    println!("  Tier: {}", coverage.tier);
    println!("  Region-specific documents: {}", coverage.region_specific_count);
    println!("  Global documents: {}", coverage.global_count);
    println!(
        "  Plan generation: {}",
        if coverage.can_generate_plan {
            "available"
        } else {
            "unavailable (ingest documents for this region or Global)"
        }
    );
}
