//! Usage signals produced by the extractor

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Clause role a column plays in a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageRole {
    /// Column appears in a WHERE predicate
    Filter,
    /// Column appears on one side of a JOIN ... ON equality
    JoinKey,
    /// Column appears in ORDER BY
    OrderBy,
    /// Column appears in GROUP BY
    GroupBy,
}

impl UsageRole {
    /// Returns the role as a display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filter => "FILTER",
            Self::JoinKey => "JOIN_KEY",
            Self::OrderBy => "ORDER_BY",
            Self::GroupBy => "GROUP_BY",
        }
    }
}

/// One observed use of a column within a single query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSignal {
    /// Resolved table name
    pub table: String,
    /// Column name as written
    pub column: String,
    /// Clause role
    pub role: UsageRole,
    /// Other filter columns of the same table in the same conjunctive WHERE
    pub co_filtered_columns: BTreeSet<String>,
}

impl UsageSignal {
    /// Creates a signal with no co-filtered columns
    pub fn new(table: impl Into<String>, column: impl Into<String>, role: UsageRole) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            role,
            co_filtered_columns: BTreeSet::new(),
        }
    }
}

/// Kind of statement a query is, judged by its leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    #[default]
    Other,
}

impl StatementKind {
    /// Returns true for statements that modify table data
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Delete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Other => "OTHER",
        }
    }
}

/// Columns of one table filtered together in a conjunctive WHERE clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeFilter {
    pub table: String,
    /// Sorted, deduplicated, at least two entries
    pub columns: Vec<String>,
}
