use std::fmt;

/// Domain errors that terminate a reconciliation run.
///
/// Everything else (plain I/O, column parse failures) travels as
/// `anyhow::Error`; these two get their own type so callers and tests can
/// tell a bad input file apart from a logic defect.
#[derive(Debug)]
pub enum ReconcileError {
    /// The input cannot support scoring: an unparseable region ID, a
    /// missing `ltr_similarity` attribute, or similar. Not recoverable.
    MalformedInput(String),
    /// The resolver decision rule reached a state its cases do not cover.
    /// Indicates a defect in this crate, not a data problem. The message
    /// carries the full score/similarity table for the offending group.
    InvariantViolation(String),
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
            ReconcileError::InvariantViolation(msg) => {
                write!(f, "invariant violation (this is a bug): {msg}")
            }
        }
    }
}

impl std::error::Error for ReconcileError {}
