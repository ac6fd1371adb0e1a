//! ZQLZ Index Advisor - Index recommendations from observed SQL workloads
//!
//! This crate provides functionality for:
//! - Extracting column usage (filters, join keys, sort and group columns) from raw SQL text
//! - Aggregating usage into per-table frequencies with optional schema statistics
//! - Estimating the impact of a candidate index with tunable heuristics
//! - Generating ranked `CREATE INDEX` suggestions
//!
//! Extraction is best effort: malformed or unsupported SQL yields fewer usage
//! signals, never an error.

pub mod advisor;
pub mod config;
pub mod error;
pub mod impact;
pub mod suggestions;
pub mod usage;

pub use advisor::*;
pub use config::*;
pub use error::*;
pub use impact::*;
pub use suggestions::*;
pub use usage::*;
