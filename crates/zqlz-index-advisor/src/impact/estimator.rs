//! Heuristic index impact estimator

use super::{ImpactAssessment, ImpactResult, IndexCandidate, PatternClause, QueryPatternHint};
use crate::config::AdvisorConfig;
use crate::usage::{SchemaStatistics, StatementKind};

/// Scores a candidate index against a set of query pattern hints
pub trait ImpactEstimate {
    fn estimate(&self, table: &str, columns: &[String], context: &[QueryPatternHint])
    -> ImpactResult;

    fn estimate_candidate(
        &self,
        candidate: &IndexCandidate,
        context: &[QueryPatternHint],
    ) -> ImpactResult {
        self.estimate(&candidate.table, &candidate.columns, context)
    }
}

/// Default estimator: column width, WHERE usage, write pressure and table size
#[derive(Debug, Clone, Default)]
pub struct IndexImpactEstimator {
    config: AdvisorConfig,
    schema: Option<SchemaStatistics>,
}

impl IndexImpactEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: AdvisorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the schema statistics providing table row counts
    pub fn with_schema_stats(mut self, schema: SchemaStatistics) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    fn assess(&self, score: f64) -> ImpactAssessment {
        let high = self.config.high_impact_breakpoint;
        let moderate = self.config.moderate_impact_breakpoint;

        if score > high {
            ImpactAssessment::HighPositive
        } else if score > moderate {
            ImpactAssessment::ModeratePositive
        } else if score < -high {
            ImpactAssessment::HighOverhead
        } else if score < -moderate {
            ImpactAssessment::ModerateOverhead
        } else {
            ImpactAssessment::Neutral
        }
    }
}

impl ImpactEstimate for IndexImpactEstimator {
    fn estimate(
        &self,
        table: &str,
        columns: &[String],
        context: &[QueryPatternHint],
    ) -> ImpactResult {
        if table.is_empty() || columns.is_empty() {
            tracing::warn!(table, "impact estimation needs a table and at least one column");
            return ImpactResult {
                score: 0.0,
                assessment: ImpactAssessment::Neutral,
                positive_factors: Vec::new(),
                negative_factors: vec![
                    "Insufficient data: table name and index columns are required.".to_string(),
                ],
            };
        }

        let config = &self.config;
        let mut score = 0.0;
        let mut positive_factors = Vec::new();
        let mut negative_factors = Vec::new();

        // Width
        let width = columns.len();
        if width > config.max_columns_before_penalty {
            score -= (width - config.max_columns_before_penalty) as f64
                * config.width_penalty_per_column;
            negative_factors.push(format!(
                "Index has {} columns (potential overhead for wide index).",
                width
            ));
        } else if width == 1 {
            positive_factors.push(format!("Single-column index on '{}'.", columns[0]));
        } else {
            positive_factors.push(format!("Composite index with {} columns.", width));
        }

        // Query patterns
        for hint in context {
            if hint.kind == StatementKind::Select
                && hint.clause == Some(PatternClause::Where)
                && columns.iter().any(|c| hint.columns.contains(c))
            {
                score += config.where_clause_bonus;
                positive_factors
                    .push("Index columns used in WHERE clause of a SELECT pattern.".to_string());
            }

            if hint.kind.is_write() && hint.table.as_deref() == Some(table) {
                score -= config.write_penalty;
                negative_factors.push(format!("Index on frequently modified table '{}'.", table));
            }
        }

        // Table size
        match self.schema.as_ref().and_then(|s| s.row_count(table)) {
            Some(rows) if rows < config.small_table_rows => {
                score -= config.table_size_adjustment;
                negative_factors.push(format!(
                    "Table '{}' is small ({} rows), index benefit may be limited.",
                    table, rows
                ));
            }
            Some(rows) if rows > config.large_table_rows => {
                score += config.table_size_adjustment;
                positive_factors.push(format!(
                    "Table '{}' is large ({} rows), a good index can be impactful.",
                    table, rows
                ));
            }
            Some(_) => {}
            None => {
                negative_factors.push(format!("Row count for table '{}' is unknown.", table));
            }
        }

        let assessment = self.assess(score);
        tracing::debug!(
            table,
            columns = %columns.join(", "),
            score,
            assessment = assessment.as_str(),
            "estimated index impact"
        );

        ImpactResult {
            score,
            assessment,
            positive_factors,
            negative_factors,
        }
    }
}
