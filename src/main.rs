use anyhow::Result;
use clap::Parser;
use std::io::Write;

use ltrsweep::reconcile::{ReconcileConfig, Reconciler};

/// Parse a number that may have metric suffix (k/K=1000, m/M=1e6, g/G=1e9)
fn parse_metric_number(s: &str) -> Result<u64, String> {
    if s.is_empty() {
        return Err("Empty string".to_string());
    }

    let (num_part, suffix) = if s.ends_with(|c: char| c.is_ascii_alphabetic()) {
        let last_char = s.chars().last().unwrap();
        (&s[..s.len() - last_char.len_utf8()], Some(last_char))
    } else {
        (s, None)
    };

    let base: f64 = num_part
        .parse()
        .map_err(|e| format!("Invalid number: {e}"))?;

    let multiplier = match suffix {
        Some('k') | Some('K') => 1000.0,
        Some('m') | Some('M') => 1_000_000.0,
        Some('g') | Some('G') => 1_000_000_000.0,
        Some(c) => {
            return Err(format!(
                "Unknown suffix '{c}'. Use k/K (1000), m/M (1e6), or g/G (1e9)"
            ))
        }
        None => 1.0,
    };

    Ok((base * multiplier) as u64)
}

/// ltrsweep - reconcile LTR retrotransposon annotations from two stringency thresholds
///
/// Takes the high-recall (primary) and high-precision (secondary) GFF3 sets
/// produced for the same genome, drops structurally implausible calls, and
/// resolves cross-set overlaps to one best-supported call each.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Primary (high-recall / low-stringency) GFF3 file, .gz accepted
    #[clap(value_name = "PRIMARY")]
    primary: String,

    /// Secondary (high-precision / high-stringency) GFF3 file, .gz accepted
    #[clap(value_name = "SECONDARY")]
    secondary: String,

    /// Output GFF3 file (stdout if not specified)
    #[clap(short = 'o', long = "output")]
    output: Option<String>,

    /// Drop regions at or above this length as implausible element calls
    #[clap(long = "max-region-length", default_value = "25k", value_parser = parse_metric_number)]
    max_region_length: u64,

    /// Quiet mode (no diagnostic output)
    #[clap(long = "quiet")]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.quiet { "error" } else { "info" }),
    )
    .init();

    let config = ReconcileConfig {
        max_region_length: args.max_region_length,
    };
    let reconciler = Reconciler::new(config);

    let mut output: Box<dyn Write> = if let Some(ref path) = args.output {
        Box::new(std::fs::File::create(path)?)
    } else {
        Box::new(std::io::stdout().lock())
    };

    let stats = reconciler.reconcile(&args.primary, &args.secondary, &mut output)?;
    output.flush()?;

    if !args.quiet {
        eprintln!(
            "All part best combined: {} {} {} {}",
            stats.total_primary, stats.total_secondary, stats.total_winners, stats.total_combined
        );
    }

    Ok(())
}
