use anyhow::{anyhow, Result};
use std::collections::BTreeMap;

use crate::feature_set::{FeatureSet, RegionKey, RepeatRegion};

/// Diagnostic counters from one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Primary regions that never took part in a conflict.
    pub total_primary: usize,
    /// Secondary regions that never took part in a conflict.
    pub total_secondary: usize,
    /// Winners emitted by conflict resolution.
    pub total_winners: usize,
    /// Distinct region keys in the merged result.
    pub total_combined: usize,
}

/// Fold resolved winners together with everything the resolver left behind
/// in both sets into one result mapping.
///
/// Inserting an already-present key is a no-op; `total_combined` counts
/// distinct keys. The resolver owns all deletions, so every key snapshotted
/// here must still be present; a miss is a logic defect, not bad input.
pub fn merge(
    winners: BTreeMap<RegionKey, RepeatRegion>,
    mut primary: FeatureSet,
    mut secondary: FeatureSet,
) -> Result<(BTreeMap<RegionKey, RepeatRegion>, MergeStats)> {
    let mut stats = MergeStats {
        total_winners: winners.len(),
        ..Default::default()
    };

    let mut combined = winners;

    for key in primary.keys() {
        let region = primary
            .remove(&key)
            .ok_or_else(|| anyhow!("primary region {key} missing during merge; this is a bug"))?;
        stats.total_primary += 1;
        combined.entry(key).or_insert(region);
    }

    for key in secondary.keys() {
        let region = secondary
            .remove(&key)
            .ok_or_else(|| anyhow!("secondary region {key} missing during merge; this is a bug"))?;
        stats.total_secondary += 1;
        combined.entry(key).or_insert(region);
    }

    stats.total_combined = combined.len();
    Ok((combined, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_set::load_feature_set;
    use crate::gff::GffReader;
    use std::io::Cursor;

    fn load(gff: &str) -> FeatureSet {
        let mut reader = GffReader::new(Cursor::new(gff.as_bytes()));
        load_feature_set(&mut reader).unwrap().0
    }

    #[test]
    fn counts_add_up() {
        let primary = load(
            "chr1\tsrc\trepeat_region\t100\t500\t.\t+\t.\tID=rr1\n\
             chr1\tsrc\trepeat_region\t900\t1400\t.\t+\t.\tID=rr2\n",
        );
        let secondary = load("chr2\tsrc\trepeat_region\t10\t90\t.\t+\t.\tID=rr7\n");

        let winner_set = load("chr3\tsrc\trepeat_region\t5\t50\t.\t+\t.\tID=rr9\n");
        let mut winners = BTreeMap::new();
        for (key, region) in winner_set.iter() {
            winners.insert(key.clone(), region.clone());
        }

        let (combined, stats) = merge(winners, primary, secondary).unwrap();
        assert_eq!(stats.total_primary, 2);
        assert_eq!(stats.total_secondary, 1);
        assert_eq!(stats.total_winners, 1);
        assert_eq!(stats.total_combined, 4);
        assert_eq!(combined.len(), 4);
        assert_eq!(
            stats.total_combined,
            stats.total_winners + stats.total_primary + stats.total_secondary
        );
    }

    #[test]
    fn duplicate_key_insertion_is_a_no_op() {
        // A key present among winners and (pathologically) still in a set
        // counts once and keeps the winner's region.
        let primary = load("chr1\tsrc\trepeat_region\t100\t500\t.\t+\t.\tID=rr1\n");
        let mut winners = BTreeMap::new();
        for (key, region) in primary.iter() {
            winners.insert(key.clone(), region.clone());
        }

        let (combined, stats) = merge(winners, primary, FeatureSet::new()).unwrap();
        assert_eq!(stats.total_combined, 1);
        assert_eq!(combined.len(), 1);
    }
}
