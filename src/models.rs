use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One evaluation scenario: a prompt plus the substrings a good answer should mention
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TestCase {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub expected_elements: Vec<String>,
}

impl TestCase {
    pub fn new(id: &str, prompt: &str, expected_elements: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            prompt: prompt.to_string(),
            expected_elements: expected_elements.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// The closed set of answer-generation approaches under comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// A: retrieval context plus the CRM ontology description
    OntologyRag,
    /// B: domain fine-tuned model
    FineTuned,
    /// C: general-purpose model without domain framing
    Vanilla,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [Self::OntologyRag, Self::FineTuned, Self::Vanilla];

    /// Short letter used in progress logs and the summary
    pub fn code(self) -> &'static str {
        match self {
            Self::OntologyRag => "A",
            Self::FineTuned => "B",
            Self::Vanilla => "C",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::OntologyRag => "Ontology + RAG",
            Self::FineTuned => "Fine-tuned LLM",
            Self::Vanilla => "Vanilla LLM",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.display_name())
    }
}

/// Output of one strategy invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub latency_ms: f64,
    pub token_count: u64,
}

/// Record of one (test case, strategy) execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub strategy_id: StrategyKind,
    pub case_id: String,
    pub prompt: String,
    pub response_text: String,
    pub latency_ms: f64,
    pub token_count: u64,
    /// Fraction of expected elements found (0.0 to 1.0)
    pub relevance_score: f64,
    /// Fraction of answer-quality heuristics satisfied (0.0 to 1.0)
    pub accuracy_score: f64,
    pub timestamp: DateTime<Utc>,
    /// Set only when generation failed; numeric fields are zero in that case
    pub error: Option<String>,
}

impl ExperimentResult {
    pub fn failed(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// Aggregated figures for one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub display_name: String,
    pub avg_latency_ms: f64,
    pub avg_relevance_score: f64,
    pub avg_accuracy_score: f64,
    pub error_count: usize,
    pub test_count: usize,
}

impl StrategySummary {
    /// Weighted blend used to rank strategies
    pub fn combined_score(&self) -> f64 {
        0.6 * self.avg_relevance_score + 0.4 * self.avg_accuracy_score
    }
}

/// Snapshot of a run: per-strategy summaries plus the declared winner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub timestamp: DateTime<Utc>,
    pub total_tests: usize,
    /// Strategies in order of first appearance in the results
    pub strategies: IndexMap<StrategyKind, StrategySummary>,
    pub winner: Option<StrategyKind>,
}
