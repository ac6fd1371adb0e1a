//! Index suggestion generator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ddl::{create_index_ddl, index_name};
use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, AdvisorResult};
use crate::impact::{ImpactEstimate, ImpactResult, IndexCandidate, QueryPatternHint};
use crate::usage::{StatementKind, UsageEntry, UsageSource, UsageType};

/// A recommended index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub candidate: IndexCandidate,
    pub impact: ImpactResult,
    /// Observations backing the candidate
    pub frequency: u64,
    pub selectivity: Option<f64>,
    pub usage_types: Vec<UsageType>,
    pub index_name: String,
    pub ddl: String,
    pub reasoning: String,
}

impl Suggestion {
    pub fn table(&self) -> &str {
        &self.candidate.table
    }

    pub fn columns(&self) -> &[String] {
        &self.candidate.columns
    }

    pub fn score(&self) -> f64 {
        self.impact.score
    }
}

/// A candidate index with the usage that produced it
#[derive(Debug, Clone)]
struct CandidateUsage {
    columns: Vec<String>,
    frequency: u64,
    selectivity: Option<f64>,
    usage_types: Vec<UsageType>,
}

/// Builds one candidate per composite entry and one per distinct single
/// column. A single column's frequency is the sum over its usage types.
fn collect_candidates(entries: &[UsageEntry]) -> Vec<CandidateUsage> {
    let mut candidates = Vec::new();
    let mut singles: BTreeMap<&str, CandidateUsage> = BTreeMap::new();

    for entry in entries {
        match entry {
            UsageEntry::Composite(usage) => candidates.push(CandidateUsage {
                columns: usage.columns.clone(),
                frequency: usage.frequency,
                selectivity: usage.selectivity,
                usage_types: vec![usage.usage_type],
            }),
            UsageEntry::Single(usage) => {
                let candidate =
                    singles
                        .entry(usage.column.as_str())
                        .or_insert_with(|| CandidateUsage {
                            columns: vec![usage.column.clone()],
                            frequency: 0,
                            selectivity: None,
                            usage_types: Vec::new(),
                        });
                candidate.frequency += usage.frequency;
                candidate.selectivity = candidate.selectivity.or(usage.selectivity);
                if !candidate.usage_types.contains(&usage.usage_type) {
                    candidate.usage_types.push(usage.usage_type);
                }
            }
        }
    }

    candidates.extend(singles.into_values());
    candidates
}

fn reasoning(impact: &ImpactResult, usage: &CandidateUsage) -> String {
    let usage_types = usage
        .usage_types
        .iter()
        .map(UsageType::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut parts = vec![
        format!(
            "Potential positive impact based on heuristic score ({:.2}).",
            impact.score
        ),
        format!(
            "Usage Type: {} (Frequency: {}).",
            usage_types, usage.frequency
        ),
    ];
    if !impact.positive_factors.is_empty() {
        parts.push(format!(
            "Positive Factors: {}.",
            impact.positive_factors.join(", ")
        ));
    }
    parts.join(" ")
}

/// Generates index suggestions from a usage source and an impact estimator.
///
/// Both collaborators are borrowed; the generator keeps no state between
/// calls and recomputes every suggestion from scratch.
pub struct IndexSuggestionGenerator<'a> {
    usage: Option<&'a dyn UsageSource>,
    estimator: Option<&'a dyn ImpactEstimate>,
    config: AdvisorConfig,
}

impl Default for IndexSuggestionGenerator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IndexSuggestionGenerator<'a> {
    pub fn new() -> Self {
        Self {
            usage: None,
            estimator: None,
            config: AdvisorConfig::default(),
        }
    }

    pub fn with_usage_source(mut self, usage: &'a dyn UsageSource) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_estimator(mut self, estimator: &'a dyn ImpactEstimate) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn with_config(mut self, config: AdvisorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Generates suggestions using `config.default_min_score` as threshold
    pub fn generate_suggestions_default(&self) -> AdvisorResult<Vec<Suggestion>> {
        self.generate_suggestions(self.config.default_min_score)
    }

    /// Generates suggestions scoring at least `min_score_threshold`, sorted
    /// by descending score, then table, then columns.
    ///
    /// A negative or NaN threshold is an error. A missing collaborator or
    /// empty usage yields an empty list.
    pub fn generate_suggestions(&self, min_score_threshold: f64) -> AdvisorResult<Vec<Suggestion>> {
        if min_score_threshold.is_nan() || min_score_threshold < 0.0 {
            return Err(AdvisorError::InvalidThreshold(min_score_threshold));
        }

        let Some(estimator) = self.estimator else {
            tracing::warn!("no impact estimator configured, nothing to suggest");
            return Ok(Vec::new());
        };
        let Some(usage) = self.usage else {
            tracing::warn!("no usage source configured, nothing to suggest");
            return Ok(Vec::new());
        };

        let stats = usage.usage_stats();
        if stats.is_empty() {
            tracing::warn!("no column usage recorded yet, nothing to suggest");
            return Ok(Vec::new());
        }

        let mut suggestions = Vec::new();

        for (table, entries) in &stats {
            let writes = usage.write_statement_count(table);

            for candidate_usage in collect_candidates(entries) {
                if candidate_usage.frequency <= self.config.min_frequency {
                    tracing::debug!(
                        table = %table,
                        columns = %candidate_usage.columns.join(", "),
                        frequency = candidate_usage.frequency,
                        "skipping candidate below minimum frequency"
                    );
                    continue;
                }

                let candidate =
                    match IndexCandidate::new(table.as_str(), candidate_usage.columns.clone()) {
                        Ok(candidate) => candidate,
                        Err(err) => {
                            tracing::warn!(error = %err, "skipping invalid candidate");
                            continue;
                        }
                    };

                let mut context = vec![QueryPatternHint::select_where(
                    table.as_str(),
                    candidate.columns.iter().cloned(),
                )];
                if self.config.penalize_writes && writes > 0 {
                    context.push(QueryPatternHint::write(StatementKind::Update, table.as_str()));
                }

                let impact = estimator.estimate_candidate(&candidate, &context);
                if impact.score < min_score_threshold {
                    tracing::debug!(
                        candidate = %candidate,
                        score = impact.score,
                        threshold = min_score_threshold,
                        "candidate scored below threshold"
                    );
                    continue;
                }

                suggestions.push(Suggestion {
                    index_name: index_name(&candidate),
                    ddl: create_index_ddl(&candidate, self.config.ddl_dialect),
                    reasoning: reasoning(&impact, &candidate_usage),
                    frequency: candidate_usage.frequency,
                    selectivity: candidate_usage.selectivity,
                    usage_types: candidate_usage.usage_types,
                    candidate,
                    impact,
                });
            }
        }

        suggestions.sort_by(|a, b| {
            b.impact
                .score
                .total_cmp(&a.impact.score)
                .then_with(|| a.candidate.table.cmp(&b.candidate.table))
                .then_with(|| a.candidate.columns.cmp(&b.candidate.columns))
        });

        tracing::info!(
            suggestions = suggestions.len(),
            tables = stats.len(),
            threshold = min_score_threshold,
            "generated index suggestions"
        );
        Ok(suggestions)
    }
}
