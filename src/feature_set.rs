use anyhow::Result;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::ReconcileError;
use crate::gff::{Feature, FeatureType, GffReader};

/// Identity of one repeat region within a feature set.
///
/// The derived `Ord` (seqid, then region id, then coordinates) is the
/// crate-wide deterministic total order: candidate sets, iteration during
/// conflict resolution, and tie-breaking all use it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionKey {
    pub seqid: String,
    pub region_id: String,
    pub start: u64,
    pub end: u64,
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}[{},{}]",
            self.seqid, self.region_id, self.start, self.end
        )
    }
}

/// One candidate transposable element: the parent `repeat_region` feature
/// plus the child features contained in its span, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatRegion {
    pub parent: Feature,
    pub children: Vec<Feature>,
}

impl RepeatRegion {
    pub fn key(&self) -> Result<RegionKey> {
        let region_id = match self.parent.attr("ID") {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(ReconcileError::MalformedInput(format!(
                    "repeat_region at {}:{}-{} lacks a parseable ID attribute",
                    self.parent.seqid, self.parent.start, self.parent.end
                ))
                .into())
            }
        };
        Ok(RegionKey {
            seqid: self.parent.seqid.clone(),
            region_id,
            start: self.parent.start,
            end: self.parent.end,
        })
    }

    pub fn length(&self) -> u64 {
        self.parent.length()
    }

    pub fn children_of_type<'a>(&'a self, ftype: &'a FeatureType) -> impl Iterator<Item = &'a Feature> {
        self.children.iter().filter(move |f| &f.ftype == ftype)
    }

    /// The `LTR_retrotransposon` child spanning the element body, if any.
    pub fn retrotransposon(&self) -> Option<&Feature> {
        self.children
            .iter()
            .find(|f| f.ftype == FeatureType::LtrRetrotransposon)
    }
}

/// All repeat regions loaded from one annotation file, keyed by `RegionKey`.
///
/// Owned and mutated in place: the compound filter and the conflict
/// resolver delete regions as they consume them, so no region can take
/// part in more than one decision.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    regions: std::collections::BTreeMap<RegionKey, RepeatRegion>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: RegionKey, region: RepeatRegion) {
        self.regions.insert(key, region);
    }

    pub fn get(&self, key: &RegionKey) -> Option<&RepeatRegion> {
        self.regions.get(key)
    }

    pub fn remove(&mut self, key: &RegionKey) -> Option<RepeatRegion> {
        self.regions.remove(key)
    }

    pub fn contains_key(&self, key: &RegionKey) -> bool {
        self.regions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Regions in ascending `RegionKey` order.
    pub fn iter(&self) -> impl Iterator<Item = (&RegionKey, &RepeatRegion)> {
        self.regions.iter()
    }

    /// Snapshot of the keys in ascending order, for iteration that mutates.
    pub fn keys(&self) -> Vec<RegionKey> {
        self.regions.keys().cloned().collect()
    }

    pub fn retain<F: FnMut(&RegionKey, &RepeatRegion) -> bool>(&mut self, mut pred: F) {
        self.regions.retain(|k, r| pred(k, r));
    }
}

/// Group streamed features into repeat-region aggregates for one file.
///
/// A `repeat_region` feature opens a new aggregate; every following
/// non-`repeat_region` feature fully contained in the open parent span (on
/// the same sequence) is appended to it. Features outside the open span, or
/// seen before any region opened, are skipped.
///
/// Returns the loaded set plus every region key seen, for diagnostics.
pub fn load_feature_set<R: std::io::BufRead>(
    reader: &mut GffReader<R>,
) -> Result<(FeatureSet, BTreeSet<RegionKey>)> {
    let mut set = FeatureSet::new();
    let mut seen: BTreeSet<RegionKey> = BTreeSet::new();
    let mut open: Option<RegionKey> = None;

    while let Some(feature) = reader.read_feature()? {
        if feature.ftype == FeatureType::RepeatRegion {
            let region = RepeatRegion {
                parent: feature,
                children: Vec::new(),
            };
            let key = region.key()?;
            seen.insert(key.clone());
            set.insert(key.clone(), region);
            open = Some(key);
            continue;
        }

        match &open {
            Some(key) if feature.contained_in(&key.seqid, key.start, key.end) => {
                // open region is always present until the next repeat_region line
                if let Some(region) = set.regions.get_mut(key) {
                    region.children.push(feature);
                }
            }
            Some(key) => {
                log::debug!(
                    "skipping {} feature at {}:{}-{} outside open region {}",
                    feature.ftype.as_str(),
                    feature.seqid,
                    feature.start,
                    feature.end,
                    key
                );
            }
            None => {
                log::debug!(
                    "skipping {} feature at {}:{}-{} before any repeat_region",
                    feature.ftype.as_str(),
                    feature.seqid,
                    feature.start,
                    feature.end
                );
            }
        }
    }

    Ok((set, seen))
}
