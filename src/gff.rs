use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use indexmap::IndexMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Open a GFF3 file, transparently decompressing `.gz` input.
pub fn open_gff_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("open annotation file {}", path.display()))?;

    let is_gz = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gz {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Feature types we act on during reconciliation. Anything else is carried
/// through untouched as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureType {
    RepeatRegion,
    LtrRetrotransposon,
    PrimerBindingSite,
    RrTract,
    TargetSiteDuplication,
    InvertedRepeat,
    ProteinMatch,
    Other(String),
}

impl FeatureType {
    pub fn from_column(s: &str) -> FeatureType {
        match s {
            "repeat_region" => FeatureType::RepeatRegion,
            "LTR_retrotransposon" => FeatureType::LtrRetrotransposon,
            "primer_binding_site" => FeatureType::PrimerBindingSite,
            "RR_tract" => FeatureType::RrTract,
            "target_site_duplication" => FeatureType::TargetSiteDuplication,
            "inverted_repeat" => FeatureType::InvertedRepeat,
            "protein_match" => FeatureType::ProteinMatch,
            other => FeatureType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FeatureType::RepeatRegion => "repeat_region",
            FeatureType::LtrRetrotransposon => "LTR_retrotransposon",
            FeatureType::PrimerBindingSite => "primer_binding_site",
            FeatureType::RrTract => "RR_tract",
            FeatureType::TargetSiteDuplication => "target_site_duplication",
            FeatureType::InvertedRepeat => "inverted_repeat",
            FeatureType::ProteinMatch => "protein_match",
            FeatureType::Other(s) => s,
        }
    }
}

/// One parsed GFF3 feature line. Coordinates are 1-based inclusive with
/// `start <= end`, enforced at parse time. Immutable once loaded.
///
/// The score and phase columns are kept verbatim so output lines round-trip
/// them unchanged; only the attribute column is normalized on output.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub seqid: String,
    pub source: String,
    pub ftype: FeatureType,
    pub start: u64,
    pub end: u64,
    pub score: String,
    pub strand: char,
    pub phase: String,
    pub attributes: IndexMap<String, String>,
}

impl Feature {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }

    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Span containment test against a parent span on the same sequence.
    pub fn contained_in(&self, seqid: &str, start: u64, end: u64) -> bool {
        self.seqid == seqid && self.start >= start && self.end <= end
    }
}

impl fmt::Display for Feature {
    /// Renders the nine GFF3 columns with the attribute column normalized:
    /// `key=value` pairs joined by `;`, quotes stripped, no trailing
    /// whitespace.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t",
            self.seqid,
            self.source,
            self.ftype.as_str(),
            self.start,
            self.end,
            self.score,
            self.strand,
            self.phase,
        )?;
        let mut first = true;
        for (key, val) in &self.attributes {
            if !first {
                write!(f, ";")?;
            }
            first = false;
            if val.is_empty() {
                write!(f, "{key}")?;
            } else {
                write!(f, "{key}={val}")?;
            }
        }
        Ok(())
    }
}

/// Parse the attribute column tolerantly. Accepts `key=value` (GFF3),
/// `key value` and `key "value"` (LTR tool output drifts between these),
/// and sloppy `" ; "` separators. Last write wins per key; file order is
/// preserved for re-emission.
pub fn parse_attributes(s: &str) -> IndexMap<String, String> {
    let mut attrs = IndexMap::new();
    for part in split_outside_quotes(s) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, val) = if let Some((k, v)) = part.split_once('=') {
            (k.trim(), v.trim())
        } else if let Some((k, v)) = part.split_once(char::is_whitespace) {
            (k.trim(), v.trim())
        } else {
            (part, "")
        };
        if key.is_empty() {
            continue;
        }
        attrs.insert(key.to_string(), unquote(val));
    }
    attrs
}

/// Split on `;`, but not inside double quotes: protein-domain names like
/// `"RVT_1; Pfam"` carry semicolons in their values.
fn split_outside_quotes(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn unquote(v: &str) -> String {
    v.trim_matches('"').to_string()
}

/// Parse one non-comment GFF3 line into a `Feature`.
pub fn parse_feature_line(line: &str) -> Result<Feature> {
    let fields: Vec<&str> = line.trim_end_matches(&['\n', '\r'][..]).split('\t').collect();

    if fields.len() < 9 {
        bail!(
            "GFF3 line has {} columns, expected 9: {}",
            fields.len(),
            line.trim_end()
        );
    }

    let start: u64 = fields[3]
        .parse()
        .with_context(|| format!("bad start coordinate in line: {}", line.trim_end()))?;
    let end: u64 = fields[4]
        .parse()
        .with_context(|| format!("bad end coordinate in line: {}", line.trim_end()))?;
    if start == 0 || end < start {
        bail!("bad coordinates {start}..{end} in line: {}", line.trim_end());
    }

    Ok(Feature {
        seqid: fields[0].to_string(),
        source: fields[1].to_string(),
        ftype: FeatureType::from_column(fields[2]),
        start,
        end,
        score: fields[5].to_string(),
        strand: fields[6].chars().next().unwrap_or('.'),
        phase: fields[7].to_string(),
        attributes: parse_attributes(fields[8]),
    })
}

/// Streaming GFF3 reader.
///
/// Comment lines preceding the first feature are collected verbatim as the
/// file header (the serializer re-emits the primary file's header); later
/// comments and blank lines are skipped.
pub struct GffReader<R: BufRead> {
    reader: R,
    header: Vec<String>,
    seen_feature: bool,
    buf: String,
}

impl<R: BufRead> GffReader<R> {
    pub fn new(reader: R) -> Self {
        GffReader {
            reader,
            header: Vec::new(),
            seen_feature: false,
            buf: String::new(),
        }
    }

    /// Header comment lines seen so far, without trailing newlines.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn into_header(self) -> Vec<String> {
        self.header
    }

    /// Read the next feature record, or `None` at end of input.
    pub fn read_feature(&mut self) -> Result<Option<Feature>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            let line = self.buf.trim_end_matches(&['\n', '\r'][..]);
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                if !self.seen_feature {
                    self.header.push(line.to_string());
                }
                continue;
            }
            self.seen_feature = true;
            return parse_feature_line(line).map(Some);
        }
    }

    pub fn read_all(&mut self) -> Result<Vec<Feature>> {
        let mut features = Vec::new();
        while let Some(feature) = self.read_feature()? {
            features.push(feature);
        }
        Ok(features)
    }
}
