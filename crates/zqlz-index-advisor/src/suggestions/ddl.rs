//! CREATE INDEX statement rendering

use serde::{Deserialize, Serialize};

use crate::impact::IndexCandidate;

/// Identifier quoting style for generated DDL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DdlDialect {
    /// `"name"`, used by PostgreSQL, SQLite and standard SQL
    #[default]
    Ansi,
    /// `` `name` ``
    #[serde(rename = "mysql")]
    MySql,
    /// `[name]`
    #[serde(rename = "mssql")]
    MsSql,
    /// Identifiers emitted exactly as observed
    Unquoted,
}

impl DdlDialect {
    /// Returns the opening and closing quote characters, if the dialect quotes
    fn quote_chars(&self) -> Option<(char, char)> {
        match self {
            DdlDialect::Ansi => Some(('"', '"')),
            DdlDialect::MySql => Some(('`', '`')),
            DdlDialect::MsSql => Some(('[', ']')),
            DdlDialect::Unquoted => None,
        }
    }

    /// Quotes an identifier, doubling any embedded closing quote
    pub fn quote_identifier(&self, name: &str) -> String {
        match self.quote_chars() {
            Some((open, close)) => {
                let escaped = name.replace(close, &format!("{}{}", close, close));
                format!("{}{}{}", open, escaped, close)
            }
            None => name.to_string(),
        }
    }
}

/// Builds `idx_<table>_<col1>_<col2>...`, lower-cased, with every character
/// outside `[a-z0-9_]` replaced by `_`.
pub fn index_name(candidate: &IndexCandidate) -> String {
    let raw = format!("idx_{}_{}", candidate.table, candidate.columns.join("_"));
    raw.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Renders `CREATE INDEX <name> ON <table> (<columns>);`
pub fn create_index_ddl(candidate: &IndexCandidate, dialect: DdlDialect) -> String {
    let columns = candidate
        .columns
        .iter()
        .map(|c| dialect.quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE INDEX {} ON {} ({});",
        index_name(candidate),
        dialect.quote_identifier(&candidate.table),
        columns
    )
}
