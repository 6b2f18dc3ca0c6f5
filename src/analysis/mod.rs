//! Analysis modules.
//!
//! Region aggregation lives in `aggregator`; the HTTP layer and the
//! one-shot CLI both call into it.

pub mod aggregator;

pub use aggregator::*;
