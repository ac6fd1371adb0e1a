//! Index Suggestions Module
//!
//! Turns aggregated column usage into ranked `CREATE INDEX` recommendations.
//! Each candidate is scored by an impact estimator; only candidates observed
//! often enough and scoring above a threshold are suggested.

mod ddl;
mod generator;

pub use ddl::*;
pub use generator::*;
