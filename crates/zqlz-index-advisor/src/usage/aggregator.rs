//! Column Usage Aggregator
//!
//! Folds per-query usage signals into cumulative per-table counts. Counts
//! only ever grow: repeated `analyze` calls add to what is already there, and
//! the aggregate is cleared only by an explicit `reset`.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::extractor::{QueryUsage, extract_usage, split_statements};
use super::schema::SchemaStatistics;
use super::signal::UsageRole;

/// Usage counts collected for one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableUsageStats {
    pub column_filter_counts: BTreeMap<String, u64>,
    pub column_join_counts: BTreeMap<String, u64>,
    pub column_order_counts: BTreeMap<String, u64>,
    pub column_group_counts: BTreeMap<String, u64>,
    /// Keyed by the sorted column list
    pub composite_filter_counts: BTreeMap<Vec<String>, u64>,
    /// Number of queries that reference the table at all
    pub query_reference_count: u64,
    /// Number of UPDATE, INSERT or DELETE statements targeting the table
    pub write_statement_count: u64,
}

impl TableUsageStats {
    /// Returns the per-column counts for a role
    pub fn counts_for(&self, role: UsageRole) -> &BTreeMap<String, u64> {
        match role {
            UsageRole::Filter => &self.column_filter_counts,
            UsageRole::JoinKey => &self.column_join_counts,
            UsageRole::OrderBy => &self.column_order_counts,
            UsageRole::GroupBy => &self.column_group_counts,
        }
    }

    fn counts_for_mut(&mut self, role: UsageRole) -> &mut BTreeMap<String, u64> {
        match role {
            UsageRole::Filter => &mut self.column_filter_counts,
            UsageRole::JoinKey => &mut self.column_join_counts,
            UsageRole::OrderBy => &mut self.column_order_counts,
            UsageRole::GroupBy => &mut self.column_group_counts,
        }
    }

    /// Sum of a column's counts across every role
    pub fn total_column_count(&self, column: &str) -> u64 {
        [
            UsageRole::Filter,
            UsageRole::JoinKey,
            UsageRole::OrderBy,
            UsageRole::GroupBy,
        ]
        .iter()
        .filter_map(|role| self.counts_for(*role).get(column))
        .sum()
    }

    /// Returns true if no column usage was recorded
    pub fn has_column_usage(&self) -> bool {
        !(self.column_filter_counts.is_empty()
            && self.column_join_counts.is_empty()
            && self.column_order_counts.is_empty()
            && self.column_group_counts.is_empty()
            && self.composite_filter_counts.is_empty())
    }

    /// Adds another table's counts to this one
    pub fn merge(&mut self, other: TableUsageStats) {
        fn add_all<K: Ord>(into: &mut BTreeMap<K, u64>, from: BTreeMap<K, u64>) {
            for (key, count) in from {
                *into.entry(key).or_insert(0) += count;
            }
        }

        add_all(&mut self.column_filter_counts, other.column_filter_counts);
        add_all(&mut self.column_join_counts, other.column_join_counts);
        add_all(&mut self.column_order_counts, other.column_order_counts);
        add_all(&mut self.column_group_counts, other.column_group_counts);
        add_all(&mut self.composite_filter_counts, other.composite_filter_counts);
        self.query_reference_count += other.query_reference_count;
        self.write_statement_count += other.write_statement_count;
    }
}

/// Cumulative usage counts for every table seen so far.
///
/// Table names are matched case-insensitively; a table is reported under the
/// spelling it was first seen with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageAggregate {
    tables: BTreeMap<String, TableUsageStats>,
    /// Lowercased name to reported spelling
    canonical_names: HashMap<String, String>,
    queries_analyzed: u64,
}

impl UsageAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one query's extraction result into the counts
    pub fn record(&mut self, usage: QueryUsage) {
        self.queries_analyzed += 1;

        for table in usage.tables {
            self.table_entry(table).query_reference_count += 1;
        }

        if let Some(target) = usage.write_target {
            self.table_entry(target).write_statement_count += 1;
        }

        for signal in usage.signals {
            let stats = self.table_entry(signal.table);
            *stats
                .counts_for_mut(signal.role)
                .entry(signal.column)
                .or_insert(0) += 1;
        }

        for composite in usage.composite_filters {
            let stats = self.table_entry(composite.table);
            *stats
                .composite_filter_counts
                .entry(composite.columns)
                .or_insert(0) += 1;
        }
    }

    /// Adds every count of `other` to this aggregate
    pub fn merge(&mut self, other: UsageAggregate) {
        self.queries_analyzed += other.queries_analyzed;
        for (table, stats) in other.tables {
            self.table_entry(table).merge(stats);
        }
    }

    fn table_entry(&mut self, table: String) -> &mut TableUsageStats {
        let name = self
            .canonical_names
            .entry(table.to_ascii_lowercase())
            .or_insert(table)
            .clone();
        self.tables.entry(name).or_default()
    }

    pub fn table(&self, table: &str) -> Option<&TableUsageStats> {
        let name = self.canonical_names.get(&table.to_ascii_lowercase())?;
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&String, &TableUsageStats)> {
        self.tables.iter()
    }

    pub fn queries_analyzed(&self) -> u64 {
        self.queries_analyzed
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Usage classification reported to consumers of the usage stats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageType {
    /// Filter column with unknown or high selectivity
    FilterHighCardinality,
    /// Filter column whose selectivity is below the low cardinality threshold
    FilterLowCardinality,
    JoinKey,
    OrderBy,
    GroupBy,
    /// Several columns of one table filtered together
    CompositeFilter,
}

impl UsageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FilterHighCardinality => "FILTER_HIGH_CARDINALITY",
            Self::FilterLowCardinality => "FILTER_LOW_CARDINALITY",
            Self::JoinKey => "JOIN_KEY",
            Self::OrderBy => "ORDER_BY",
            Self::GroupBy => "GROUP_BY",
            Self::CompositeFilter => "COMPOSITE_FILTER",
        }
    }

    /// Source label attached to entries of this type
    pub fn source(&self) -> &'static str {
        match self {
            Self::FilterHighCardinality | Self::FilterLowCardinality => "WHERE_CLAUSE (single)",
            Self::JoinKey => "JOIN_ON",
            Self::OrderBy => "ORDER_BY",
            Self::GroupBy => "GROUP_BY",
            Self::CompositeFilter => "WHERE_CLAUSE (composite)",
        }
    }
}

/// Usage of a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnUsage {
    pub column: String,
    pub usage_type: UsageType,
    pub frequency: u64,
    pub selectivity: Option<f64>,
    pub source: String,
}

/// Usage of a set of columns filtered together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeUsage {
    pub columns: Vec<String>,
    pub usage_type: UsageType,
    pub frequency: u64,
    /// Minimum of the member selectivities, unknown if any member is unknown
    pub selectivity: Option<f64>,
    pub source: String,
}

/// One entry of the usage stats read view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UsageEntry {
    Composite(CompositeUsage),
    Single(ColumnUsage),
}

impl UsageEntry {
    /// Columns covered by the entry, in index order
    pub fn columns(&self) -> &[String] {
        match self {
            Self::Composite(usage) => &usage.columns,
            Self::Single(usage) => std::slice::from_ref(&usage.column),
        }
    }

    pub fn usage_type(&self) -> UsageType {
        match self {
            Self::Composite(usage) => usage.usage_type,
            Self::Single(usage) => usage.usage_type,
        }
    }

    pub fn frequency(&self) -> u64 {
        match self {
            Self::Composite(usage) => usage.frequency,
            Self::Single(usage) => usage.frequency,
        }
    }

    pub fn selectivity(&self) -> Option<f64> {
        match self {
            Self::Composite(usage) => usage.selectivity,
            Self::Single(usage) => usage.selectivity,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Composite(usage) => &usage.source,
            Self::Single(usage) => &usage.source,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }
}

/// Usage entries per table
pub type UsageStats = BTreeMap<String, Vec<UsageEntry>>;

/// Provider of aggregated usage, consumed by the suggestion generator
pub trait UsageSource {
    /// Returns the current usage entries per table
    fn usage_stats(&self) -> UsageStats;

    /// Number of write statements observed against a table
    fn write_statement_count(&self, _table: &str) -> u64 {
        0
    }
}

/// Cumulative column usage analyzer.
///
/// One instance owns one aggregate. Independent analyses use independent
/// instances and can be combined with [`ColumnUsageAnalyzer::merge`].
#[derive(Debug, Clone)]
pub struct ColumnUsageAnalyzer {
    aggregate: UsageAggregate,
    schema: Option<SchemaStatistics>,
    low_cardinality_threshold: f64,
}

impl Default for ColumnUsageAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnUsageAnalyzer {
    pub fn new() -> Self {
        Self {
            aggregate: UsageAggregate::default(),
            schema: None,
            low_cardinality_threshold: 0.1,
        }
    }

    /// Sets the schema statistics used to derive selectivity
    pub fn with_schema_stats(mut self, schema: SchemaStatistics) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the selectivity below which a filter column is low cardinality
    pub fn with_low_cardinality_threshold(mut self, threshold: f64) -> Self {
        self.low_cardinality_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn schema_stats(&self) -> Option<&SchemaStatistics> {
        self.schema.as_ref()
    }

    /// Analyzes one query and adds its usage to the aggregate
    pub fn analyze(&mut self, query: &str) {
        let usage = extract_usage(query);
        tracing::debug!(
            tables = usage.tables.len(),
            signals = usage.signals.len(),
            composites = usage.composite_filters.len(),
            "analyzed query"
        );
        self.aggregate.record(usage);
    }

    /// Analyzes queries one after another
    pub fn analyze_batch<I, S>(&mut self, queries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let before = self.aggregate.queries_analyzed();
        for query in queries {
            self.analyze(query.as_ref());
        }
        tracing::info!(
            queries = self.aggregate.queries_analyzed() - before,
            tables = self.aggregate.tables.len(),
            "analyzed query batch"
        );
    }

    /// Analyzes queries on the rayon pool.
    ///
    /// Every worker folds into a private aggregate; the partial aggregates
    /// are merged and then added to this analyzer in one step.
    pub fn analyze_batch_parallel<S>(&mut self, queries: &[S])
    where
        S: AsRef<str> + Sync,
    {
        let partial = queries
            .par_iter()
            .fold(UsageAggregate::default, |mut aggregate, query| {
                aggregate.record(extract_usage(query.as_ref()));
                aggregate
            })
            .reduce(UsageAggregate::default, |mut left, right| {
                left.merge(right);
                left
            });

        tracing::info!(
            queries = partial.queries_analyzed(),
            tables = partial.tables.len(),
            "analyzed query batch in parallel"
        );
        self.aggregate.merge(partial);
    }

    /// Splits a multi-statement script or query log and analyzes every statement
    pub fn analyze_script(&mut self, script: &str) -> usize {
        let statements = split_statements(script);
        let count = statements.len();
        self.analyze_batch(statements);
        count
    }

    /// Adds another analyzer's counts to this one
    pub fn merge(&mut self, other: ColumnUsageAnalyzer) {
        self.aggregate.merge(other.aggregate);
    }

    /// Clears every count
    pub fn reset(&mut self) {
        self.aggregate = UsageAggregate::default();
    }

    pub fn aggregate(&self) -> &UsageAggregate {
        &self.aggregate
    }

    pub fn table_stats(&self, table: &str) -> Option<&TableUsageStats> {
        self.aggregate.table(table)
    }

    /// Names of every table referenced so far
    pub fn tables(&self) -> Vec<&str> {
        self.aggregate
            .tables()
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn queries_analyzed(&self) -> u64 {
        self.aggregate.queries_analyzed()
    }

    fn selectivity(&self, table: &str, column: &str) -> Option<f64> {
        self.schema.as_ref()?.selectivity(table, column)
    }

    fn composite_selectivity(&self, table: &str, columns: &[String]) -> Option<f64> {
        columns
            .iter()
            .map(|column| self.selectivity(table, column))
            .collect::<Option<Vec<f64>>>()?
            .into_iter()
            .reduce(f64::min)
    }

    /// Builds the usage entries for every table with column usage.
    ///
    /// Per table the order is: composite filters, filters, join keys, order
    /// by, group by; each group sorted by column name.
    pub fn get_usage_stats(&self) -> UsageStats {
        let mut stats = UsageStats::new();

        for (table, usage) in self.aggregate.tables() {
            if !usage.has_column_usage() {
                continue;
            }
            let mut entries = Vec::new();

            for (columns, frequency) in &usage.composite_filter_counts {
                entries.push(UsageEntry::Composite(CompositeUsage {
                    columns: columns.clone(),
                    usage_type: UsageType::CompositeFilter,
                    frequency: *frequency,
                    selectivity: self.composite_selectivity(table, columns),
                    source: UsageType::CompositeFilter.source().to_string(),
                }));
            }

            let roles = [
                UsageRole::Filter,
                UsageRole::JoinKey,
                UsageRole::OrderBy,
                UsageRole::GroupBy,
            ];
            for role in roles {
                for (column, frequency) in usage.counts_for(role) {
                    let selectivity = self.selectivity(table, column);
                    let usage_type = match role {
                        UsageRole::Filter => match selectivity {
                            Some(s) if s < self.low_cardinality_threshold => {
                                UsageType::FilterLowCardinality
                            }
                            _ => UsageType::FilterHighCardinality,
                        },
                        UsageRole::JoinKey => UsageType::JoinKey,
                        UsageRole::OrderBy => UsageType::OrderBy,
                        UsageRole::GroupBy => UsageType::GroupBy,
                    };
                    entries.push(UsageEntry::Single(ColumnUsage {
                        column: column.clone(),
                        usage_type,
                        frequency: *frequency,
                        selectivity,
                        source: usage_type.source().to_string(),
                    }));
                }
            }

            stats.insert(table.clone(), entries);
        }

        if stats.is_empty() && !self.aggregate.is_empty() {
            tracing::warn!(
                tables = self.aggregate.tables.len(),
                "tables were referenced but no column usage could be attributed"
            );
        }

        stats
    }
}

impl UsageSource for ColumnUsageAnalyzer {
    fn usage_stats(&self) -> UsageStats {
        self.get_usage_stats()
    }

    fn write_statement_count(&self, table: &str) -> u64 {
        self.table_stats(table)
            .map(|stats| stats.write_statement_count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests;
