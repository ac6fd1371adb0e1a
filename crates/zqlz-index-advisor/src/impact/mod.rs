//! Index Impact Module
//!
//! Heuristic scoring of a candidate index against the query patterns it would
//! serve. Scores are positive for likely benefit and negative for likely
//! overhead; the magnitude carries the strength.

mod estimator;

pub use estimator::*;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AdvisorError, AdvisorResult};
use crate::usage::StatementKind;

/// A table and the ordered columns a new index would cover
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexCandidate {
    pub table: String,
    /// Column order is the index key order
    pub columns: Vec<String>,
}

impl IndexCandidate {
    /// Creates a candidate, rejecting an empty table, an empty column list or
    /// an empty column name.
    pub fn new<S: Into<String>>(
        table: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> AdvisorResult<Self> {
        let table = table.into();
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();

        if table.trim().is_empty() {
            return Err(AdvisorError::InvalidCandidate(
                "table name is empty".to_string(),
            ));
        }
        if columns.is_empty() {
            return Err(AdvisorError::InvalidCandidate(format!(
                "no columns given for table '{}'",
                table
            )));
        }
        if columns.iter().any(|c| c.trim().is_empty()) {
            return Err(AdvisorError::InvalidCandidate(format!(
                "empty column name for table '{}'",
                table
            )));
        }

        Ok(Self { table, columns })
    }

    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }
}

impl fmt::Display for IndexCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.table, self.columns.join(", "))
    }
}

/// Clause a query pattern uses its columns in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternClause {
    Where,
    Join,
    OrderBy,
    GroupBy,
}

/// Description of a query shape the candidate index would interact with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPatternHint {
    pub kind: StatementKind,
    pub clause: Option<PatternClause>,
    /// Table the pattern targets. Write patterns only apply to their own
    /// table; SELECT patterns are matched on columns alone.
    pub table: Option<String>,
    pub columns: Vec<String>,
}

impl QueryPatternHint {
    /// A SELECT filtering on `columns` of `table`
    pub fn select_where<S: Into<String>>(
        table: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            kind: StatementKind::Select,
            clause: Some(PatternClause::Where),
            table: Some(table.into()),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// A write statement of `kind` against `table`
    pub fn write(kind: StatementKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            clause: None,
            table: Some(table.into()),
            columns: Vec::new(),
        }
    }
}

/// Qualitative reading of an impact score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactAssessment {
    HighPositive,
    ModeratePositive,
    Neutral,
    ModerateOverhead,
    HighOverhead,
}

impl ImpactAssessment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighPositive => "High positive impact",
            Self::ModeratePositive => "Moderate positive impact",
            Self::Neutral => "Neutral impact",
            Self::ModerateOverhead => "Moderate potential overhead",
            Self::HighOverhead => "High potential overhead",
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::HighPositive | Self::ModeratePositive)
    }
}

impl fmt::Display for ImpactAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of estimating one candidate index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactResult {
    pub score: f64,
    pub assessment: ImpactAssessment,
    pub positive_factors: Vec<String>,
    pub negative_factors: Vec<String>,
}
