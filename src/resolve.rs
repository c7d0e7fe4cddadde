use anyhow::Result;
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

use crate::error::ReconcileError;
use crate::feature_set::{FeatureSet, RegionKey, RepeatRegion};
use crate::gff::FeatureType;
use crate::interval_index::IntervalIndex;

/// Structural evidence extracted from one repeat region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evidence {
    /// Count of satisfied evidence flags, 0-5: primer binding site,
    /// RR tract, protein match, inverted repeat, equal TSD lengths.
    pub score: u32,
    /// LTR similarity percentage from the element's `ltr_similarity`
    /// attribute.
    pub similarity: f64,
}

/// Score a region. A region without an `LTR_retrotransposon` child or
/// without its `ltr_similarity` attribute cannot be compared to anything
/// and is treated as malformed input.
pub fn evidence(key: &RegionKey, region: &RepeatRegion) -> Result<Evidence> {
    let element = region.retrotransposon().ok_or_else(|| {
        ReconcileError::MalformedInput(format!(
            "region {key} has no LTR_retrotransposon feature; cannot score it"
        ))
    })?;
    let similarity: f64 = element
        .attr("ltr_similarity")
        .ok_or_else(|| {
            ReconcileError::MalformedInput(format!(
                "LTR_retrotransposon in region {key} lacks the ltr_similarity attribute"
            ))
        })?
        .parse()
        .map_err(|_| {
            ReconcileError::MalformedInput(format!(
                "region {key} has an unparseable ltr_similarity value"
            ))
        })?;

    let has_pbs = region
        .children_of_type(&FeatureType::PrimerBindingSite)
        .next()
        .is_some();
    let has_rr_tract = region
        .children_of_type(&FeatureType::RrTract)
        .next()
        .is_some();
    let has_protein_match = region
        .children_of_type(&FeatureType::ProteinMatch)
        .next()
        .is_some();
    let has_inverted_repeat = region
        .children_of_type(&FeatureType::InvertedRepeat)
        .next()
        .is_some();

    // The two target site duplications flanking an intact insertion have
    // equal length; compare the first two seen.
    let mut tsds = region.children_of_type(&FeatureType::TargetSiteDuplication);
    let tsd_lengths_equal = match (tsds.next(), tsds.next()) {
        (Some(a), Some(b)) => a.length() == b.length(),
        _ => false,
    };

    let score = [
        has_pbs,
        has_rr_tract,
        has_protein_match,
        has_inverted_repeat,
        tsd_lengths_equal,
    ]
    .iter()
    .filter(|&&flag| flag)
    .count() as u32;

    Ok(Evidence { score, similarity })
}

/// How a conflict group was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// A single candidate won on both evidence score and similarity.
    Score,
    /// Ambiguous on score; the first similarity winner was taken.
    Similarity,
}

/// Outcome of one resolved overlap group.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub winner: RegionKey,
    pub mode: ResolutionMode,
    /// Every candidate that was consumed, winner included, in key order.
    pub group: Vec<RegionKey>,
}

fn score_table(rows: &[(RegionKey, Evidence)]) -> String {
    let mut table = String::from("region\tscore\tsimilarity\n");
    for (key, ev) in rows {
        table.push_str(&format!("{key}\t{}\t{}\n", ev.score, ev.similarity));
    }
    table
}

/// Resolve every overlap between the secondary (high-precision) set and the
/// primary (high-recall) set.
///
/// For each secondary region the index is queried for overlapping primary
/// regions still unconsumed; the candidate group (secondary region
/// included) is scored and exactly one winner survives into the returned
/// accumulator. All candidates are removed from their owning sets, so both
/// sets shrink monotonically and no region is decided twice. Secondary
/// regions with no surviving overlap are left in place for the merger.
pub fn resolve_conflicts(
    primary: &mut FeatureSet,
    secondary: &mut FeatureSet,
    index: &IntervalIndex,
) -> Result<(BTreeMap<RegionKey, RepeatRegion>, Vec<Resolution>)> {
    let mut winners: BTreeMap<RegionKey, RepeatRegion> = BTreeMap::new();
    let mut resolutions = Vec::new();

    for key in secondary.keys() {
        // Already consumed as a candidate of an earlier resolution
        if !secondary.contains_key(&key) {
            continue;
        }

        let overlaps: Vec<RegionKey> = index
            .query(&key.seqid, key.start, key.end)
            .into_iter()
            .filter(|k| primary.contains_key(k))
            .collect();

        if overlaps.is_empty() {
            continue;
        }

        // Candidate group in ascending key order; "first" below always
        // means first in this order. When the two sets called the same
        // element under the same key the group collapses to one candidate.
        let mut group: Vec<RegionKey> = overlaps;
        group.push(key.clone());
        group.sort();
        group.dedup();

        let mut scored: Vec<(RegionKey, Evidence)> = Vec::with_capacity(group.len());
        for candidate in &group {
            let region = primary
                .get(candidate)
                .or_else(|| secondary.get(candidate))
                .ok_or_else(|| {
                    anyhow::anyhow!("candidate {candidate} vanished mid-resolution; this is a bug")
                })?;
            scored.push((candidate.clone(), evidence(candidate, region)?));
        }

        let max_score = scored.iter().map(|(_, ev)| ev.score).max();
        let max_sim = scored
            .iter()
            .map(|(_, ev)| OrderedFloat(ev.similarity))
            .max();

        let (winner, mode) = match (max_score, max_sim) {
            (Some(max_score), Some(max_sim)) => {
                let score_winners: Vec<&RegionKey> = scored
                    .iter()
                    .filter(|(_, ev)| ev.score == max_score)
                    .map(|(k, _)| k)
                    .collect();
                let sim_winners: Vec<&RegionKey> = scored
                    .iter()
                    .filter(|(_, ev)| OrderedFloat(ev.similarity) == max_sim)
                    .map(|(k, _)| k)
                    .collect();

                if score_winners.len() == 1
                    && sim_winners.len() == 1
                    && score_winners[0] == sim_winners[0]
                {
                    (score_winners[0].clone(), ResolutionMode::Score)
                } else {
                    (sim_winners[0].clone(), ResolutionMode::Similarity)
                }
            }
            _ => {
                // Unreachable: the group always contains the secondary
                // region itself. Dump the table so the defect is visible.
                let table = score_table(&scored);
                log::error!("empty winner group while resolving {key}:\n{table}");
                return Err(ReconcileError::InvariantViolation(format!(
                    "no winner could be chosen for {key}; candidate table:\n{table}"
                ))
                .into());
            }
        };

        log::debug!(
            "resolved {} candidates around {key}: winner {winner} by {mode:?}",
            group.len()
        );

        let mut winning_region = None;
        for candidate in &group {
            // A key present in both sets is consumed from both.
            let from_primary = primary.remove(candidate);
            let from_secondary = secondary.remove(candidate);
            let region = from_primary.or(from_secondary).ok_or_else(|| {
                anyhow::anyhow!("candidate {candidate} vanished mid-resolution; this is a bug")
            })?;
            if candidate == &winner {
                winning_region = Some(region);
            }
        }
        let winning_region = winning_region.ok_or_else(|| {
            anyhow::anyhow!("winner {winner} not found in its own group; this is a bug")
        })?;

        winners.insert(winner.clone(), winning_region);
        resolutions.push(Resolution {
            winner,
            mode,
            group,
        });
    }

    Ok((winners, resolutions))
}
