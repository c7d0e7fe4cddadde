use std::collections::HashMap;

use crate::feature_set::{FeatureSet, RepeatRegion};
use crate::gff::FeatureType;

/// Region length at or above which an element call is considered
/// implausible and dropped.
pub const DEFAULT_MAX_REGION_LENGTH: u64 = 25_000;

/// Why a region was deleted, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Chimeric,
    DuplicatedDomain,
    Oversized,
}

/// Counts of deletions per rule from one filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub chimeric: usize,
    pub duplicated_domain: usize,
    pub oversized: usize,
}

impl FilterStats {
    pub fn total(&self) -> usize {
        self.chimeric + self.duplicated_domain + self.oversized
    }
}

/// Protein-domain names of a region's `protein_match` children, truncated
/// at the first semicolon and lowercased for comparison.
fn domain_names(region: &RepeatRegion) -> Vec<String> {
    region
        .children_of_type(&FeatureType::ProteinMatch)
        .filter_map(|f| f.attr("name"))
        .map(|name| {
            name.split(';')
                .next()
                .unwrap_or("")
                .trim()
                .to_ascii_lowercase()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

fn reject(region: &RepeatRegion, max_region_length: u64) -> Option<Rejection> {
    if region.length() >= max_region_length {
        return Some(Rejection::Oversized);
    }

    let names = domain_names(region);

    // Contradictory superfamily markers: RVT_1/Chromo say Gypsy, RVT_2 says
    // Copia. A region carrying both lineages is a chimeric call.
    let is_gypsy = names.iter().any(|n| n == "rvt_1" || n == "chromo");
    let is_copia = names.iter().any(|n| n == "rvt_2");
    if is_gypsy && is_copia {
        return Some(Rejection::Chimeric);
    }

    // A repeated non-chromo domain means nested or duplicated calls.
    // Chromo legitimately occurs twice in intact Gypsy elements.
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in &names {
        *counts.entry(name.as_str()).or_insert(0) += 1;
    }
    if counts
        .iter()
        .any(|(name, &count)| *name != "chromo" && count > 1)
    {
        return Some(Rejection::DuplicatedDomain);
    }

    None
}

/// Remove chimeric, duplicated-domain, and oversized regions in place.
///
/// Must run on both input sets before any cross-set comparison. Idempotent:
/// a second pass over an already-filtered set deletes nothing.
pub fn filter_compound_elements(set: &mut FeatureSet, max_region_length: u64) -> FilterStats {
    let mut stats = FilterStats::default();
    set.retain(|key, region| match reject(region, max_region_length) {
        None => true,
        Some(why) => {
            log::debug!("dropping {key}: {why:?}");
            match why {
                Rejection::Chimeric => stats.chimeric += 1,
                Rejection::DuplicatedDomain => stats.duplicated_domain += 1,
                Rejection::Oversized => stats.oversized += 1,
            }
            false
        }
    });
    stats
}
