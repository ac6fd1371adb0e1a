//! Advisor configuration
//!
//! Every heuristic constant used by the impact estimator and the suggestion
//! generator lives here, so thresholds can be tuned (or tested) without
//! touching the scoring code.

use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, AdvisorResult};
use crate::suggestions::DdlDialect;

/// Configuration for the index advisor pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Indexes wider than this many columns are penalized
    pub max_columns_before_penalty: usize,
    /// Score subtracted for every column beyond `max_columns_before_penalty`
    pub width_penalty_per_column: f64,
    /// Score added for each SELECT/WHERE pattern touching the index columns
    pub where_clause_bonus: f64,
    /// Score subtracted for each write pattern targeting the indexed table
    pub write_penalty: f64,
    /// Tables with fewer rows than this get limited benefit from an index
    pub small_table_rows: u64,
    /// Tables with more rows than this benefit more from an index
    pub large_table_rows: u64,
    /// Score adjustment applied for small and large tables
    pub table_size_adjustment: f64,
    /// Scores above this are a high positive impact
    pub high_impact_breakpoint: f64,
    /// Scores above this are a moderate positive impact
    pub moderate_impact_breakpoint: f64,
    /// Candidates observed this many times or fewer are never suggested
    pub min_frequency: u64,
    /// Threshold used by `generate_suggestions_default`
    pub default_min_score: f64,
    /// Filter columns with a known selectivity below this are low cardinality
    pub low_cardinality_threshold: f64,
    /// Feed observed write statements to the estimator as write patterns
    pub penalize_writes: bool,
    /// Identifier quoting used in generated DDL
    pub ddl_dialect: DdlDialect,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            max_columns_before_penalty: 3,
            width_penalty_per_column: 0.5,
            where_clause_bonus: 1.0,
            write_penalty: 0.5,
            small_table_rows: 1_000,
            large_table_rows: 1_000_000,
            table_size_adjustment: 0.5,
            high_impact_breakpoint: 1.5,
            moderate_impact_breakpoint: 0.5,
            min_frequency: 5,
            default_min_score: 0.5,
            low_cardinality_threshold: 0.1,
            penalize_writes: false,
            ddl_dialect: DdlDialect::default(),
        }
    }
}

impl AdvisorConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a config from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(toml_str: &str) -> AdvisorResult<Self> {
        let config: AdvisorConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the thresholds are usable together.
    pub fn validate(&self) -> AdvisorResult<()> {
        let non_negative = [
            ("width_penalty_per_column", self.width_penalty_per_column),
            ("where_clause_bonus", self.where_clause_bonus),
            ("write_penalty", self.write_penalty),
            ("table_size_adjustment", self.table_size_adjustment),
            ("moderate_impact_breakpoint", self.moderate_impact_breakpoint),
            ("high_impact_breakpoint", self.high_impact_breakpoint),
            ("default_min_score", self.default_min_score),
            ("low_cardinality_threshold", self.low_cardinality_threshold),
        ];
        for (name, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(AdvisorError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.high_impact_breakpoint < self.moderate_impact_breakpoint {
            return Err(AdvisorError::InvalidConfig(format!(
                "high_impact_breakpoint ({}) is below moderate_impact_breakpoint ({})",
                self.high_impact_breakpoint, self.moderate_impact_breakpoint
            )));
        }

        if self.large_table_rows <= self.small_table_rows {
            return Err(AdvisorError::InvalidConfig(format!(
                "large_table_rows ({}) must exceed small_table_rows ({})",
                self.large_table_rows, self.small_table_rows
            )));
        }

        Ok(())
    }

    /// Sets the minimum candidate frequency
    pub fn with_min_frequency(mut self, min_frequency: u64) -> Self {
        self.min_frequency = min_frequency;
        self
    }

    /// Sets the default minimum score
    pub fn with_default_min_score(mut self, score: f64) -> Self {
        self.default_min_score = score;
        self
    }

    /// Sets the small and large table row thresholds
    pub fn with_table_size_thresholds(mut self, small: u64, large: u64) -> Self {
        self.small_table_rows = small;
        self.large_table_rows = large;
        self
    }

    /// Sets the low cardinality threshold
    pub fn with_low_cardinality_threshold(mut self, threshold: f64) -> Self {
        self.low_cardinality_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Sets whether observed write statements lower candidate scores
    pub fn with_penalize_writes(mut self, penalize: bool) -> Self {
        self.penalize_writes = penalize;
        self
    }

    /// Sets the identifier quoting used in generated DDL
    pub fn with_ddl_dialect(mut self, dialect: DdlDialect) -> Self {
        self.ddl_dialect = dialect;
        self
    }
}

#[cfg(test)]
mod tests;
