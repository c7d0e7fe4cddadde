// Library exports for ltrsweep
pub mod compound_filter;
pub mod error;
pub mod feature_set;
pub mod gff;
pub mod interval_index;
pub mod merge;
pub mod output;
pub mod reconcile;
pub mod resolve;
