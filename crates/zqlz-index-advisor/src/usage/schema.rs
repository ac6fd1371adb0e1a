//! Schema statistics supplied by an external provider
//!
//! Statistics are read-only inputs. A table or column without statistics is
//! reported as unknown; no default selectivity is ever invented for it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::AdvisorResult;

/// Row and distinct-value counts for one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaStat {
    pub table: String,
    pub row_count: u64,
    pub column_distinct_values: HashMap<String, u64>,
}

impl SchemaStat {
    pub fn new(table: impl Into<String>, row_count: u64) -> Self {
        Self {
            table: table.into(),
            row_count,
            column_distinct_values: HashMap::new(),
        }
    }

    /// Adds a distinct-value count for a column
    pub fn with_column(mut self, column: impl Into<String>, distinct_values: u64) -> Self {
        self.column_distinct_values
            .insert(column.into(), distinct_values);
        self
    }

    /// Returns `distinct / row_count` clamped to `(0, 1]`, or `None` if unknown.
    ///
    /// A zero distinct count on a non-empty table is treated as a single
    /// distinct value.
    pub fn selectivity(&self, column: &str) -> Option<f64> {
        if self.row_count == 0 {
            return None;
        }
        let distinct = *self.column_distinct_values.get(column)?;
        let rows = self.row_count as f64;
        let ratio = distinct.max(1) as f64 / rows;
        Some(ratio.min(1.0))
    }
}

/// Wire shape of one table in the nested statistics document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableStatsDocument {
    row_count: u64,
    #[serde(default)]
    columns: BTreeMap<String, u64>,
}

/// Statistics for every known table.
///
/// Serializes as `{table: {row_count, columns: {column: distinct_values}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, TableStatsDocument>",
    into = "BTreeMap<String, TableStatsDocument>"
)]
pub struct SchemaStatistics {
    tables: HashMap<String, SchemaStat>,
}

impl From<BTreeMap<String, TableStatsDocument>> for SchemaStatistics {
    fn from(document: BTreeMap<String, TableStatsDocument>) -> Self {
        let tables = document
            .into_iter()
            .map(|(table, stats)| {
                let stat = SchemaStat {
                    table: table.clone(),
                    row_count: stats.row_count,
                    column_distinct_values: stats.columns.into_iter().collect(),
                };
                (table, stat)
            })
            .collect();
        Self { tables }
    }
}

impl From<SchemaStatistics> for BTreeMap<String, TableStatsDocument> {
    fn from(stats: SchemaStatistics) -> Self {
        stats
            .tables
            .into_iter()
            .map(|(table, stat)| {
                let document = TableStatsDocument {
                    row_count: stat.row_count,
                    columns: stat.column_distinct_values.into_iter().collect(),
                };
                (table, document)
            })
            .collect()
    }
}

impl SchemaStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the nested JSON statistics document
    pub fn from_json_str(json: &str) -> AdvisorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Adds or replaces the statistics of a table
    pub fn insert(&mut self, stat: SchemaStat) {
        self.tables.insert(stat.table.clone(), stat);
    }

    /// Builder variant of `insert`
    pub fn with_table(mut self, stat: SchemaStat) -> Self {
        self.insert(stat);
        self
    }

    /// Looks up a table, falling back to a case-insensitive match
    pub fn table(&self, table: &str) -> Option<&SchemaStat> {
        self.tables.get(table).or_else(|| {
            self.tables
                .values()
                .find(|stat| stat.table.eq_ignore_ascii_case(table))
        })
    }

    pub fn row_count(&self, table: &str) -> Option<u64> {
        self.table(table).map(|stat| stat.row_count)
    }

    pub fn selectivity(&self, table: &str, column: &str) -> Option<f64> {
        self.table(table)?.selectivity(column)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }
}
