use crate::models::{ExperimentReport, ExperimentResult, StrategyKind, StrategySummary};
use chrono::Utc;
use indexmap::IndexMap;

/// Reduce a result collection into per-strategy summaries and a winner.
///
/// Strategies without results are left out. The winner is the strategy with
/// the highest combined score; on an exact tie the one appearing first in
/// the results wins.
pub fn build_report(results: &[ExperimentResult]) -> ExperimentReport {
    let mut groups: IndexMap<StrategyKind, Vec<&ExperimentResult>> = IndexMap::new();
    for result in results {
        groups.entry(result.strategy_id).or_default().push(result);
    }

    let strategies: IndexMap<StrategyKind, StrategySummary> = groups
        .into_iter()
        .map(|(kind, group)| (kind, summarize(kind, &group)))
        .collect();

    let winner = pick_winner(&strategies);

    ExperimentReport {
        timestamp: Utc::now(),
        total_tests: results.len(),
        strategies,
        winner,
    }
}

/// Means and error count for one non-empty group
fn summarize(kind: StrategyKind, group: &[&ExperimentResult]) -> StrategySummary {
    let count = group.len() as f64;
    let mean = |field: fn(&ExperimentResult) -> f64| group.iter().map(|r| field(r)).sum::<f64>() / count;

    StrategySummary {
        display_name: kind.display_name().to_string(),
        avg_latency_ms: mean(|r| r.latency_ms),
        avg_relevance_score: mean(|r| r.relevance_score),
        avg_accuracy_score: mean(|r| r.accuracy_score),
        error_count: group.iter().filter(|r| r.failed()).count(),
        test_count: group.len(),
    }
}

fn pick_winner(strategies: &IndexMap<StrategyKind, StrategySummary>) -> Option<StrategyKind> {
    let mut best: Option<(StrategyKind, f64)> = None;

    for (&kind, summary) in strategies {
        let score = summary.combined_score();
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((kind, score)),
        }
    }

    best.map(|(kind, _)| kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(kind: StrategyKind, relevance: f64, accuracy: f64, latency_ms: f64) -> ExperimentResult {
        ExperimentResult {
            strategy_id: kind,
            case_id: "case".to_string(),
            prompt: "prompt".to_string(),
            response_text: "response".to_string(),
            latency_ms,
            token_count: 10,
            relevance_score: relevance,
            accuracy_score: accuracy,
            timestamp: Utc::now(),
            error: None,
        }
    }

    fn failure(kind: StrategyKind) -> ExperimentResult {
        ExperimentResult {
            response_text: String::new(),
            token_count: 0,
            error: Some("API error: HTTP 500".to_string()),
            ..result(kind, 0.0, 0.0, 0.0)
        }
    }

    #[test]
    fn test_empty_results_have_no_winner() {
        let report = build_report(&[]);
        assert_eq!(report.total_tests, 0);
        assert!(report.strategies.is_empty());
        assert_eq!(report.winner, None);
    }

    #[test]
    fn test_means_and_counts() {
        let results = vec![
            result(StrategyKind::OntologyRag, 1.0, 0.5, 100.0),
            result(StrategyKind::OntologyRag, 0.5, 0.25, 300.0),
            failure(StrategyKind::OntologyRag),
        ];

        let report = build_report(&results);
        let summary = &report.strategies[&StrategyKind::OntologyRag];

        assert_eq!(summary.display_name, "Ontology + RAG");
        assert_eq!(summary.test_count, 3);
        assert_eq!(summary.error_count, 1);
        assert!((summary.avg_latency_ms - 400.0 / 3.0).abs() < 1e-9);
        assert!((summary.avg_relevance_score - 0.5).abs() < 1e-9);
        assert!((summary.avg_accuracy_score - 0.25).abs() < 1e-9);
        assert_eq!(report.total_tests, 3);
    }

    #[test]
    fn test_strategies_without_results_are_omitted() {
        let results = vec![
            result(StrategyKind::Vanilla, 0.2, 0.2, 10.0),
            failure(StrategyKind::FineTuned),
        ];

        let report = build_report(&results);
        assert_eq!(report.strategies.len(), 2);
        assert!(!report.strategies.contains_key(&StrategyKind::OntologyRag));
        // All-failing strategies stay in the report
        assert_eq!(report.strategies[&StrategyKind::FineTuned].error_count, 1);
    }

    #[test]
    fn test_strategies_keep_first_appearance_order() {
        let results = vec![
            result(StrategyKind::Vanilla, 0.0, 0.0, 1.0),
            result(StrategyKind::OntologyRag, 0.0, 0.0, 1.0),
            result(StrategyKind::Vanilla, 0.0, 0.0, 1.0),
        ];

        let report = build_report(&results);
        let order: Vec<_> = report.strategies.keys().copied().collect();
        assert_eq!(order, vec![StrategyKind::Vanilla, StrategyKind::OntologyRag]);
    }

    #[test]
    fn test_winner_uses_weighted_score() {
        // A: 0.6*0.5 + 0.4*1.0 = 0.70, B: 0.6*0.9 + 0.4*0.25 = 0.64
        let results = vec![
            result(StrategyKind::OntologyRag, 0.5, 1.0, 1.0),
            result(StrategyKind::FineTuned, 0.9, 0.25, 1.0),
        ];
        assert_eq!(build_report(&results).winner, Some(StrategyKind::OntologyRag));
    }

    #[test]
    fn test_winner_follows_strict_improvement() {
        let mut results = vec![
            result(StrategyKind::OntologyRag, 0.5, 0.5, 1.0),
            result(StrategyKind::FineTuned, 0.6, 0.5, 1.0),
            result(StrategyKind::Vanilla, 0.4, 0.5, 1.0),
        ];
        assert_eq!(build_report(&results).winner, Some(StrategyKind::FineTuned));

        results[2].relevance_score = 1.0;
        assert_eq!(build_report(&results).winner, Some(StrategyKind::Vanilla));
    }

    #[test]
    fn test_tie_resolves_to_first_encountered() {
        let results = vec![
            result(StrategyKind::FineTuned, 0.5, 0.5, 1.0),
            result(StrategyKind::OntologyRag, 0.5, 0.5, 1.0),
        ];
        assert_eq!(build_report(&results).winner, Some(StrategyKind::FineTuned));
    }

    #[test]
    fn test_all_failures_still_produce_a_winner() {
        let results = vec![failure(StrategyKind::Vanilla), failure(StrategyKind::Vanilla)];
        let report = build_report(&results);

        let summary = &report.strategies[&StrategyKind::Vanilla];
        assert_eq!(summary.error_count, 2);
        assert_eq!(summary.avg_relevance_score, 0.0);
        assert_eq!(report.winner, Some(StrategyKind::Vanilla));
    }

    #[test]
    fn test_report_is_a_fresh_snapshot() {
        let mut results = vec![result(StrategyKind::Vanilla, 1.0, 1.0, 1.0)];
        let first = build_report(&results);

        results.push(failure(StrategyKind::FineTuned));
        let second = build_report(&results);

        assert_eq!(first.total_tests, 1);
        assert_eq!(first.strategies.len(), 1);
        assert_eq!(second.total_tests, 2);
        assert_eq!(second.strategies.len(), 2);
    }
}
