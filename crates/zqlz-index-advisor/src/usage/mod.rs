//! Column Usage Module
//!
//! Extracts usage signals (filter, join, sort and group columns) from raw SQL
//! text and aggregates them into per-table frequency counts. Selectivity is
//! derived from optional schema statistics.

mod aggregator;
mod extractor;
mod schema;
mod signal;

pub use aggregator::*;
pub use extractor::*;
pub use schema::*;
pub use signal::*;
