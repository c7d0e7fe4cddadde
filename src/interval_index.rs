use std::collections::HashMap;

use crate::feature_set::{FeatureSet, RegionKey};

#[derive(Debug, Clone)]
struct IndexEntry {
    start: u64,
    end: u64,
    key: RegionKey,
}

/// Per-sequence spatial index over one feature set's repeat-region spans.
///
/// Built once from the filtered primary set, then read-only. Entries are
/// kept sorted by start per sequence; queries scan the slice up to the
/// probe end. Region counts per sequence are small enough that this beats
/// anything fancier.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    by_seq: HashMap<String, Vec<IndexEntry>>,
}

impl IntervalIndex {
    /// Index every region span of `set`, one sub-index per sequence.
    pub fn build(set: &FeatureSet) -> Self {
        let mut by_seq: HashMap<String, Vec<IndexEntry>> = HashMap::new();
        for (key, region) in set.iter() {
            by_seq
                .entry(key.seqid.clone())
                .or_default()
                .push(IndexEntry {
                    start: region.parent.start,
                    end: region.parent.end,
                    key: key.clone(),
                });
        }
        for entries in by_seq.values_mut() {
            entries.sort_by(|a, b| (a.start, &a.key).cmp(&(b.start, &b.key)));
        }
        IntervalIndex { by_seq }
    }

    /// Region keys whose span intersects `[start, end]` (1-based inclusive)
    /// on `seqid`, in ascending key order. Empty if the sequence is
    /// unindexed.
    pub fn query(&self, seqid: &str, start: u64, end: u64) -> Vec<RegionKey> {
        let Some(entries) = self.by_seq.get(seqid) else {
            return Vec::new();
        };

        // Entries are sorted by start; once an entry starts past the probe
        // end, nothing later can overlap.
        let cutoff = entries.partition_point(|e| e.start <= end);
        let mut hits: Vec<RegionKey> = entries[..cutoff]
            .iter()
            .filter(|e| e.end >= start)
            .map(|e| e.key.clone())
            .collect();
        hits.sort();
        hits
    }

    pub fn is_empty(&self) -> bool {
        self.by_seq.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_set::RepeatRegion;
    use crate::gff::parse_feature_line;

    fn set_with(spans: &[(&str, &str, u64, u64)]) -> FeatureSet {
        let mut set = FeatureSet::new();
        for (seqid, id, start, end) in spans {
            let line = format!("{seqid}\tsrc\trepeat_region\t{start}\t{end}\t.\t+\t.\tID={id}");
            let region = RepeatRegion {
                parent: parse_feature_line(&line).unwrap(),
                children: Vec::new(),
            };
            let key = region.key().unwrap();
            set.insert(key, region);
        }
        set
    }

    #[test]
    fn finds_all_overlapping_spans() {
        let set = set_with(&[
            ("chr1", "rr1", 100, 500),
            ("chr1", "rr2", 450, 900),
            ("chr1", "rr3", 1000, 1200),
            ("chr2", "rr4", 100, 500),
        ]);
        let index = IntervalIndex::build(&set);

        let hits = index.query("chr1", 480, 1100);
        let ids: Vec<&str> = hits.iter().map(|k| k.region_id.as_str()).collect();
        assert_eq!(ids, vec!["rr1", "rr2", "rr3"]);
    }

    #[test]
    fn inclusive_boundary_touch_counts_as_overlap() {
        let set = set_with(&[("chr1", "rr1", 100, 500)]);
        let index = IntervalIndex::build(&set);
        assert_eq!(index.query("chr1", 500, 600).len(), 1);
        assert_eq!(index.query("chr1", 1, 100).len(), 1);
        assert!(index.query("chr1", 501, 600).is_empty());
    }

    #[test]
    fn unindexed_sequence_returns_empty() {
        let set = set_with(&[("chr1", "rr1", 100, 500)]);
        let index = IntervalIndex::build(&set);
        assert!(index.query("chrX", 1, 1_000_000).is_empty());
    }
}
