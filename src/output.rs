use anyhow::Result;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::io::Write;

use crate::feature_set::{RegionKey, RepeatRegion};

/// Natural (alphanumeric-aware) string comparison: digit runs compare as
/// numbers, so `chr2` sorts before `chr10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let mut na = String::new();
                    while let Some(&c) = ai.peek() {
                        if !c.is_ascii_digit() {
                            break;
                        }
                        na.push(c);
                        ai.next();
                    }
                    let mut nb = String::new();
                    while let Some(&c) = bi.peek() {
                        if !c.is_ascii_digit() {
                            break;
                        }
                        nb.push(c);
                        bi.next();
                    }
                    // Compare numerically; leading zeros make the runs
                    // unequal in length, so strip them first.
                    let ta = na.trim_start_matches('0');
                    let tb = nb.trim_start_matches('0');
                    let ord = ta
                        .len()
                        .cmp(&tb.len())
                        .then_with(|| ta.cmp(tb))
                        .then_with(|| na.cmp(&nb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                } else {
                    if ca != cb {
                        return ca.cmp(&cb);
                    }
                    ai.next();
                    bi.next();
                }
            }
        }
    }
}

/// Numeric suffix of a region identifier, e.g. `repeat_region12` -> 12.
fn numeric_suffix(id: &str) -> Option<u64> {
    let digits: String = id
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Output order: natural sequence-name order, then ascending numeric suffix
/// of the region identifier (`repeat_region12` before `repeat_region100`),
/// falling back to lexicographic ids, then coordinates.
pub fn output_cmp(a: &RegionKey, b: &RegionKey) -> Ordering {
    natural_cmp(&a.seqid, &b.seqid)
        .then_with(
            || match (numeric_suffix(&a.region_id), numeric_suffix(&b.region_id)) {
                (Some(na), Some(nb)) => na.cmp(&nb),
                _ => Ordering::Equal,
            },
        )
        .then_with(|| a.region_id.cmp(&b.region_id))
        .then_with(|| (a.start, a.end).cmp(&(b.start, b.end)))
}

/// Write the merged result: the primary file's header verbatim, then each
/// region's parent line followed by its child lines, attribute columns
/// normalized by the `Feature` renderer.
pub fn write_gff(
    out: &mut dyn Write,
    header: &[String],
    combined: &BTreeMap<RegionKey, RepeatRegion>,
) -> Result<()> {
    for line in header {
        writeln!(out, "{line}")?;
    }

    let mut entries: Vec<(&RegionKey, &RepeatRegion)> = combined.iter().collect();
    entries.sort_by(|a, b| output_cmp(a.0, b.0));

    for (_, region) in entries {
        writeln!(out, "{}", region.parent)?;
        for child in &region.children {
            writeln!(out, "{child}")?;
        }
    }

    Ok(())
}
