//! SQL Usage Extractor
//!
//! Best-effort extraction of column usage from raw SQL text. No grammar is
//! built: each clause type is found with an independent pattern search, and a
//! clause that does not match simply contributes no signals. Malformed SQL
//! never produces an error.
//!
//! # Example
//!
//! ```
//! use zqlz_index_advisor::{extract_usage, UsageRole};
//!
//! let usage = extract_usage("SELECT * FROM orders o WHERE o.status = 'paid' ORDER BY o.created_at");
//! assert_eq!(usage.tables, vec!["orders".to_string()]);
//! assert!(usage.signals.iter().any(|s| s.column == "status" && s.role == UsageRole::Filter));
//! assert!(usage.signals.iter().any(|s| s.column == "created_at" && s.role == UsageRole::OrderBy));
//! ```

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use super::signal::{CompositeFilter, StatementKind, UsageRole, UsageSignal};

/// Everything extracted from a single query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryUsage {
    /// Leading statement keyword
    pub kind: StatementKind,
    /// Referenced tables in order of first appearance
    pub tables: Vec<String>,
    /// Target of an UPDATE, INSERT or DELETE statement
    pub write_target: Option<String>,
    /// Column usage signals
    pub signals: Vec<UsageSignal>,
    /// Conjunctive multi-column filters, one per table at most
    pub composite_filters: Vec<CompositeFilter>,
}

impl QueryUsage {
    /// Returns the signals with the given role
    pub fn signals_with_role(&self, role: UsageRole) -> impl Iterator<Item = &UsageSignal> {
        self.signals.iter().filter(move |s| s.role == role)
    }
}

// Words that can follow a table name without being an alias, or precede an
// operator without being a column
const RESERVED_WORDS: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CROSS", "DEFAULT", "DESC",
    "DISTINCT", "ELSE", "END", "EXCEPT", "EXISTS", "FALSE", "FETCH", "FOR", "FROM", "FULL",
    "GROUP", "HAVING", "IN", "INNER", "INTERSECT", "INTO", "IS", "JOIN", "LATERAL", "LEFT",
    "LIKE", "LIMIT", "NATURAL", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER",
    "RETURNING", "RIGHT", "SELECT", "SET", "SOME", "TABLESAMPLE", "THEN", "TRUE", "UNION",
    "USING", "VALUES", "WHEN", "WHERE", "WINDOW", "WITH",
];

static MASK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'(?:[^'\\]|\\.)*'|--[^\n]*|/\*[\s\S]*?\*/").expect("valid regex")
});

static QUOTED_IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]*)"|`([^`]*)`|\[([^\]]*)\]"#).expect("valid regex")
});

static FROM_KEYWORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bFROM\b").expect("valid regex"));

// End of a FROM list: any keyword that starts the next clause or a join
static FROM_END_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:WHERE|GROUP|ORDER|HAVING|LIMIT|OFFSET|UNION|INTERSECT|EXCEPT|INNER|LEFT|RIGHT|FULL|CROSS|NATURAL|OUTER|JOIN|ON|USING|RETURNING|WINDOW|SET)\b|[;()]",
    )
    .expect("valid regex")
});

static TABLE_REF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*([A-Za-z_][\w$]*(?:\s*\.\s*[A-Za-z_][\w$]*)*)(?:\s+(?:AS\s+)?([A-Za-z_]\w*))?")
        .expect("valid regex")
});

static JOIN_TABLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bJOIN\s+([A-Za-z_][\w$]*(?:\s*\.\s*[A-Za-z_][\w$]*)*)(?:\s+(?:AS\s+)?([A-Za-z_]\w*))?")
        .expect("valid regex")
});

static WRITE_TARGET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[\s(]*(UPDATE|INSERT|DELETE)\s+(?:ONLY\s+|IGNORE\s+|LOW_PRIORITY\s+)?(?:INTO\s+|FROM\s+)?([A-Za-z_][\w$]*(?:\s*\.\s*[A-Za-z_][\w$]*)*)(?:\s+(?:AS\s+)?([A-Za-z_]\w*))?",
    )
    .expect("valid regex")
});

static STATEMENT_KIND_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s(]*(SELECT|WITH|INSERT|UPDATE|DELETE)\b").expect("valid regex")
});

static WHERE_REGION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bWHERE\b(.*?)(?:\bGROUP\s+BY\b|\bORDER\s+BY\b|\bHAVING\b|\bLIMIT\b|;|$)")
        .expect("valid regex")
});

static FILTER_ATOM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b([A-Za-z_]\w*)\s*\.\s*)?\b([A-Za-z_]\w*)\s*(?:!=|<>|>=|<=|=|>|<|(?:\bNOT\s+)?(?:\bLIKE\b|\bIN\b|\bBETWEEN\b))",
    )
    .expect("valid regex")
});

static AND_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bAND\b").expect("valid regex"));

static ON_KEYWORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bON\b").expect("valid regex"));

static JOIN_KEYWORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bJOIN\b").expect("valid regex"));

static ON_END_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:INNER|LEFT|RIGHT|FULL|CROSS|NATURAL|JOIN|WHERE|GROUP|ORDER|HAVING|LIMIT|UNION)\b|;",
    )
    .expect("valid regex")
});

static JOIN_EQUALITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\b([A-Za-z_]\w*)\s*\.\s*)?\b([A-Za-z_]\w*)\s*=\s*(?:([A-Za-z_]\w*)\s*\.\s*)?([A-Za-z_]\w*)\b",
    )
    .expect("valid regex")
});

static ORDER_BY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bORDER\s+BY\s+(.*?)(?:\bLIMIT\b|\bOFFSET\b|\bFETCH\b|\bFOR\b|\bUNION\b|;|\)|$)")
        .expect("valid regex")
});

static GROUP_BY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)\bGROUP\s+BY\s+(.*?)(?:\bHAVING\b|\bORDER\s+BY\b|\bLIMIT\b|\bWINDOW\b|\bUNION\b|;|\)|$)",
    )
    .expect("valid regex")
});

static COLUMN_REF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([A-Za-z_]\w*)\s*\.\s*)?([A-Za-z_]\w*)$").expect("valid regex")
});

fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(word))
}

/// Tables referenced by one query and the aliases that point at them
#[derive(Debug, Default)]
struct QueryScope {
    tables: Vec<String>,
    // lower-cased alias -> table
    aliases: HashMap<String, String>,
}

impl QueryScope {
    /// Registers a `[schema.]table [alias]` reference and returns the table name
    fn add_reference(&mut self, qualified_name: &str, alias: Option<&str>) -> Option<String> {
        let table = qualified_name.rsplit('.').next()?.trim();
        if table.is_empty() || is_reserved(table) {
            return None;
        }

        let table = match self
            .tables
            .iter()
            .find(|known| known.eq_ignore_ascii_case(table))
        {
            Some(known) => known.clone(),
            None => {
                self.tables.push(table.to_string());
                table.to_string()
            }
        };

        if let Some(alias) = alias.filter(|alias| !is_reserved(alias)) {
            self.aliases
                .insert(alias.to_ascii_lowercase(), table.clone());
        }

        Some(table)
    }

    /// Resolves a column qualifier to its table.
    ///
    /// A qualifier is looked up as an alias first, then as a referenced table
    /// name. An unqualified column belongs to the sole referenced table, and
    /// is unattributable when the query references several.
    fn resolve(&self, qualifier: Option<&str>) -> Option<&str> {
        match qualifier {
            Some(qualifier) => self
                .aliases
                .get(&qualifier.to_ascii_lowercase())
                .map(String::as_str)
                .or_else(|| {
                    self.tables
                        .iter()
                        .find(|table| table.eq_ignore_ascii_case(qualifier))
                        .map(String::as_str)
                }),
            None if self.tables.len() == 1 => self.tables.first().map(String::as_str),
            None => None,
        }
    }
}

/// Extracts all usage signals from one query.
pub fn extract_usage(sql: &str) -> QueryUsage {
    let text = normalize(sql);

    let kind = statement_kind(&text);
    let mut scope = QueryScope::default();
    let write_target = collect_tables(&text, kind, &mut scope);

    let mut usage = QueryUsage {
        kind,
        write_target,
        ..QueryUsage::default()
    };

    extract_filters(&text, &scope, &mut usage);
    extract_join_keys(&text, &scope, &mut usage);

    for caps in ORDER_BY_REGEX.captures_iter(&text) {
        extract_column_list(&caps[1], UsageRole::OrderBy, &scope, &mut usage);
    }
    for caps in GROUP_BY_REGEX.captures_iter(&text) {
        extract_column_list(&caps[1], UsageRole::GroupBy, &scope, &mut usage);
    }

    usage.tables = scope.tables;
    usage
}

/// Replaces string literals with `?`, blanks out comments, then drops
/// identifier quoting.
fn normalize(sql: &str) -> String {
    let masked = MASK_REGEX.replace_all(sql, |caps: &regex::Captures| {
        if caps[0].starts_with('\'') {
            "?".to_string()
        } else {
            " ".repeat(caps[0].len())
        }
    });
    QUOTED_IDENTIFIER_REGEX
        .replace_all(&masked, |caps: &regex::Captures| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim().replace(char::is_whitespace, "_"))
                .unwrap_or_default()
        })
        .into_owned()
}

fn statement_kind(text: &str) -> StatementKind {
    let Some(caps) = STATEMENT_KIND_REGEX.captures(text) else {
        return StatementKind::Other;
    };
    match caps[1].to_ascii_uppercase().as_str() {
        "SELECT" | "WITH" => StatementKind::Select,
        "INSERT" => StatementKind::Insert,
        "UPDATE" => StatementKind::Update,
        "DELETE" => StatementKind::Delete,
        _ => StatementKind::Other,
    }
}

/// Fills the scope from FROM lists, JOIN clauses and the write target.
fn collect_tables(text: &str, kind: StatementKind, scope: &mut QueryScope) -> Option<String> {
    let mut write_target = None;
    if kind.is_write() {
        if let Some(caps) = WRITE_TARGET_REGEX.captures(text) {
            write_target = scope.add_reference(&caps[2], caps.get(3).map(|m| m.as_str()));
        }
    }

    for from in FROM_KEYWORD_REGEX.find_iter(text) {
        if inside_function_call(text, from.start()) {
            continue;
        }
        let rest = &text[from.end()..];
        let end = FROM_END_REGEX
            .find(rest)
            .map(|m| m.start())
            .unwrap_or(rest.len());
        for item in rest[..end].split(',') {
            if let Some(caps) = TABLE_REF_REGEX.captures(item) {
                scope.add_reference(&caps[1], caps.get(2).map(|m| m.as_str()));
            }
        }
    }

    for caps in JOIN_TABLE_REGEX.captures_iter(text) {
        scope.add_reference(&caps[1], caps.get(2).map(|m| m.as_str()));
    }

    write_target
}

/// True when `pos` sits inside an open parenthesis that is not a subquery,
/// as in `EXTRACT(YEAR FROM created_at)`.
fn inside_function_call(text: &str, pos: usize) -> bool {
    let before = &text[..pos];
    let mut depth = 0usize;
    for (idx, ch) in before.char_indices().rev() {
        match ch {
            ')' => depth += 1,
            '(' if depth == 0 => {
                let inner = before[idx + 1..].to_ascii_uppercase();
                return !inner.contains("SELECT") && !inner.contains("DELETE");
            }
            '(' => depth -= 1,
            _ => {}
        }
    }
    false
}

/// FILTER signals and composite observations from every WHERE region.
fn extract_filters(text: &str, scope: &QueryScope, usage: &mut QueryUsage) {
    for region in WHERE_REGION_REGEX.captures_iter(text) {
        let region = &region[1];
        let conjunctive = AND_REGEX.is_match(region);
        let first_signal = usage.signals.len();
        let mut columns_by_table: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for caps in FILTER_ATOM_REGEX.captures_iter(region) {
            let column = &caps[2];
            if is_reserved(column) {
                continue;
            }
            let qualifier = caps.get(1).map(|m| m.as_str());
            let Some(table) = scope.resolve(qualifier) else {
                tracing::trace!(column, ?qualifier, "dropping unattributable filter column");
                continue;
            };

            usage
                .signals
                .push(UsageSignal::new(table, column, UsageRole::Filter));
            if conjunctive {
                columns_by_table
                    .entry(table.to_string())
                    .or_default()
                    .insert(column.to_string());
            }
        }

        for (table, columns) in columns_by_table {
            if columns.len() < 2 {
                continue;
            }
            for signal in &mut usage.signals[first_signal..] {
                if signal.table == table {
                    signal.co_filtered_columns = columns
                        .iter()
                        .filter(|c| **c != signal.column)
                        .cloned()
                        .collect();
                }
            }
            usage.composite_filters.push(CompositeFilter {
                table,
                columns: columns.into_iter().collect(),
            });
        }
    }
}

/// JOIN_KEY signals from `JOIN ... ON a.x = b.y` conditions.
///
/// Only column-to-column equalities count. Unqualified columns in a join
/// condition are never guessed.
fn extract_join_keys(text: &str, scope: &QueryScope, usage: &mut QueryUsage) {
    let Some(first_join) = JOIN_KEYWORD_REGEX.find(text) else {
        return;
    };

    for on in ON_KEYWORD_REGEX.find_iter(text) {
        if on.start() < first_join.end() {
            continue;
        }
        let rest = &text[on.end()..];
        let end = ON_END_REGEX
            .find(rest)
            .map(|m| m.start())
            .unwrap_or(rest.len());

        for caps in JOIN_EQUALITY_REGEX.captures_iter(&rest[..end]) {
            // `b.active = TRUE` compares against a constant
            if is_reserved(&caps[2]) || is_reserved(&caps[4]) {
                continue;
            }
            let sides = [(caps.get(1), &caps[2]), (caps.get(3), &caps[4])];
            for (qualifier, column) in sides {
                let Some(qualifier) = qualifier else {
                    continue;
                };
                if let Some(table) = scope.resolve(Some(qualifier.as_str())) {
                    usage
                        .signals
                        .push(UsageSignal::new(table, column, UsageRole::JoinKey));
                }
            }
        }
    }
}

/// ORDER BY / GROUP BY items. Expressions and positional references are
/// skipped; only `[qualifier.]column` with an optional direction counts.
fn extract_column_list(list: &str, role: UsageRole, scope: &QueryScope, usage: &mut QueryUsage) {
    for item in split_top_level(list, ',') {
        let mut tokens = item.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };
        let modifiers_ok = tokens.all(|token| {
            ["ASC", "DESC", "NULLS", "FIRST", "LAST"]
                .iter()
                .any(|m| m.eq_ignore_ascii_case(token))
        });
        if !modifiers_ok {
            continue;
        }
        let Some(caps) = COLUMN_REF_REGEX.captures(first) else {
            continue;
        };
        let column = &caps[2];
        if is_reserved(column) {
            continue;
        }
        if let Some(table) = scope.resolve(caps.get(1).map(|m| m.as_str())) {
            usage.signals.push(UsageSignal::new(table, column, role));
        }
    }
}

/// Splits on `separator` outside parentheses.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Splits a script or query log into statements on top-level semicolons.
///
/// Semicolons inside string literals, quoted identifiers and comments do not
/// split. Empty statements are dropped.
pub fn split_statements(script: &str) -> Vec<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        SingleQuote,
        DoubleQuote,
        LineComment,
        BlockComment,
    }

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Code;
    let mut chars = script.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            State::Code => match ch {
                ';' => {
                    let statement = current.trim();
                    if !statement.is_empty() {
                        statements.push(statement.to_string());
                    }
                    current.clear();
                    continue;
                }
                '\'' => state = State::SingleQuote,
                '"' => state = State::DoubleQuote,
                '-' if chars.peek() == Some(&'-') => state = State::LineComment,
                '/' if chars.peek() == Some(&'*') => {
                    current.push(ch);
                    if let Some(star) = chars.next() {
                        current.push(star);
                    }
                    state = State::BlockComment;
                    continue;
                }
                _ => {}
            },
            State::SingleQuote if ch == '\\' => {
                current.push(ch);
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
                continue;
            }
            State::SingleQuote if ch == '\'' => state = State::Code,
            State::DoubleQuote if ch == '"' => state = State::Code,
            State::LineComment if ch == '\n' => state = State::Code,
            State::BlockComment if ch == '*' && chars.peek() == Some(&'/') => {
                current.push(ch);
                if let Some(slash) = chars.next() {
                    current.push(slash);
                }
                state = State::Code;
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    let statement = current.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
    statements
}
