use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::compound_filter::{filter_compound_elements, DEFAULT_MAX_REGION_LENGTH};
use crate::feature_set::load_feature_set;
use crate::gff::{open_gff_input, GffReader};
use crate::interval_index::IntervalIndex;
use crate::merge::{merge, MergeStats};
use crate::output::write_gff;
use crate::resolve::resolve_conflicts;

/// Reconciliation configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileConfig {
    /// Region length at or above which a call is dropped as implausible.
    pub max_region_length: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            max_region_length: DEFAULT_MAX_REGION_LENGTH,
        }
    }
}

/// The full reconciliation pipeline: load both sets, filter each
/// independently, index the primary set, resolve overlaps, merge, and
/// serialize the sorted result.
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Reconciler { config }
    }

    /// Reconcile two annotation files into `out`. The primary path holds
    /// the high-recall calls, the secondary path the high-precision calls.
    pub fn reconcile<P: AsRef<Path>>(
        &self,
        primary_path: P,
        secondary_path: P,
        out: &mut dyn Write,
    ) -> Result<MergeStats> {
        let primary = open_gff_input(primary_path)?;
        let secondary = open_gff_input(secondary_path)?;
        self.reconcile_readers(primary, secondary, out)
    }

    /// Same pipeline over already-opened readers, for callers and tests
    /// that do not go through the filesystem.
    pub fn reconcile_readers<R: BufRead, S: BufRead>(
        &self,
        primary: R,
        secondary: S,
        out: &mut dyn Write,
    ) -> Result<MergeStats> {
        let mut primary_reader = GffReader::new(primary);
        let (mut primary_set, primary_seen) = load_feature_set(&mut primary_reader)?;
        let header = primary_reader.into_header();

        let mut secondary_reader = GffReader::new(secondary);
        let (mut secondary_set, secondary_seen) = load_feature_set(&mut secondary_reader)?;

        log::info!(
            "loaded {} primary and {} secondary regions",
            primary_seen.len(),
            secondary_seen.len()
        );

        let primary_dropped =
            filter_compound_elements(&mut primary_set, self.config.max_region_length);
        let secondary_dropped =
            filter_compound_elements(&mut secondary_set, self.config.max_region_length);
        log::info!(
            "compound filter dropped {} primary ({:?}) and {} secondary ({:?}) regions",
            primary_dropped.total(),
            primary_dropped,
            secondary_dropped.total(),
            secondary_dropped
        );

        let index = IntervalIndex::build(&primary_set);
        let (winners, resolutions) =
            resolve_conflicts(&mut primary_set, &mut secondary_set, &index)?;
        log::info!(
            "resolved {} overlap groups into {} winners",
            resolutions.len(),
            winners.len()
        );

        let (combined, stats) = merge(winners, primary_set, secondary_set)?;
        write_gff(out, &header, &combined)?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_inputs_terminate_normally() {
        let reconciler = Reconciler::new(ReconcileConfig::default());
        let mut buf = Vec::new();
        let stats = reconciler
            .reconcile_readers(
                Cursor::new(b"##gff-version 3\n".as_slice()),
                Cursor::new(b"".as_slice()),
                &mut buf,
            )
            .unwrap();
        assert_eq!(stats, MergeStats::default());
        assert_eq!(String::from_utf8(buf).unwrap(), "##gff-version 3\n");
    }
}
