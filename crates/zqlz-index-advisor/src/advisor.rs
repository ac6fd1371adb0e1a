//! Index advisor facade
//!
//! Wires the usage analyzer, the impact estimator and the suggestion
//! generator together behind one owner with a shared configuration.

use crate::config::AdvisorConfig;
use crate::error::AdvisorResult;
use crate::impact::{ImpactEstimate, ImpactResult, IndexImpactEstimator, QueryPatternHint};
use crate::suggestions::{IndexSuggestionGenerator, Suggestion};
use crate::usage::{ColumnUsageAnalyzer, SchemaStatistics, UsageStats};

/// Owns one usage aggregate and produces index suggestions from it
#[derive(Debug, Clone, Default)]
pub struct IndexAdvisor {
    analyzer: ColumnUsageAnalyzer,
    estimator: IndexImpactEstimator,
    config: AdvisorConfig,
}

impl IndexAdvisor {
    /// Creates an advisor after validating the config
    pub fn new(config: AdvisorConfig) -> AdvisorResult<Self> {
        config.validate()?;
        tracing::info!(
            min_frequency = config.min_frequency,
            default_min_score = config.default_min_score,
            penalize_writes = config.penalize_writes,
            "index advisor created"
        );
        Ok(Self {
            analyzer: ColumnUsageAnalyzer::new()
                .with_low_cardinality_threshold(config.low_cardinality_threshold),
            estimator: IndexImpactEstimator::new().with_config(config.clone()),
            config,
        })
    }

    /// Creates an advisor from a TOML config document
    pub fn from_toml_str(toml_str: &str) -> AdvisorResult<Self> {
        Self::new(AdvisorConfig::from_toml_str(toml_str)?)
    }

    /// Supplies schema statistics to both the analyzer and the estimator
    pub fn with_schema_stats(mut self, schema: SchemaStatistics) -> Self {
        self.analyzer = self.analyzer.with_schema_stats(schema.clone());
        self.estimator = self.estimator.with_schema_stats(schema);
        self
    }

    /// Parses schema statistics from JSON and supplies them
    pub fn with_schema_stats_json(self, json: &str) -> AdvisorResult<Self> {
        let schema = SchemaStatistics::from_json_str(json)?;
        Ok(self.with_schema_stats(schema))
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &ColumnUsageAnalyzer {
        &self.analyzer
    }

    pub fn estimator(&self) -> &IndexImpactEstimator {
        &self.estimator
    }

    pub fn analyze(&mut self, query: &str) {
        self.analyzer.analyze(query);
    }

    pub fn analyze_batch<I, S>(&mut self, queries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.analyzer.analyze_batch(queries);
    }

    pub fn analyze_batch_parallel<S>(&mut self, queries: &[S])
    where
        S: AsRef<str> + Sync,
    {
        self.analyzer.analyze_batch_parallel(queries);
    }

    /// Analyzes every statement of a script, returning the statement count
    pub fn analyze_script(&mut self, script: &str) -> usize {
        self.analyzer.analyze_script(script)
    }

    pub fn usage_stats(&self) -> UsageStats {
        self.analyzer.get_usage_stats()
    }

    /// Scores a hypothetical index without touching the aggregate
    pub fn estimate(
        &self,
        table: &str,
        columns: &[String],
        context: &[QueryPatternHint],
    ) -> ImpactResult {
        self.estimator.estimate(table, columns, context)
    }

    fn generator(&self) -> IndexSuggestionGenerator<'_> {
        IndexSuggestionGenerator::new()
            .with_usage_source(&self.analyzer)
            .with_estimator(&self.estimator)
            .with_config(self.config.clone())
    }

    pub fn generate_suggestions(&self, min_score_threshold: f64) -> AdvisorResult<Vec<Suggestion>> {
        self.generator().generate_suggestions(min_score_threshold)
    }

    pub fn generate_suggestions_default(&self) -> AdvisorResult<Vec<Suggestion>> {
        self.generator().generate_suggestions_default()
    }

    /// Clears all recorded usage, keeping config and schema statistics
    pub fn reset(&mut self) {
        self.analyzer.reset();
    }
}

#[cfg(test)]
mod tests;
