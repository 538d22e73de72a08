/// Heuristic scores for one response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub relevance: f64,
    pub accuracy: f64,
}

/// Number of answer-quality signals checked by [`accuracy`]
const ACCURACY_SIGNALS: usize = 4;

/// Score a response against the elements a good answer should mention
pub fn score(response: &str, expected_elements: &[String]) -> Scores {
    Scores {
        relevance: relevance(response, expected_elements),
        accuracy: accuracy(response),
    }
}

/// Fraction of expected elements found as case-insensitive substrings; 0 when none are expected
pub fn relevance(response: &str, expected_elements: &[String]) -> f64 {
    if expected_elements.is_empty() {
        return 0.0;
    }

    let response_lower = response.to_lowercase();
    let found = expected_elements
        .iter()
        .filter(|element| response_lower.contains(&element.to_lowercase()))
        .count();

    found as f64 / expected_elements.len() as f64
}

/// Fraction of "looks like a technical answer" signals present in the response
pub fn accuracy(response: &str) -> f64 {
    let response_lower = response.to_lowercase();

    let signals = [
        response_lower.contains("http"),
        response_lower.contains("api"),
        response.contains("```"),
        response.contains("def ") || response_lower.contains("function"),
    ];

    let present = signals.iter().filter(|&&signal| signal).count();
    present as f64 / ACCURACY_SIGNALS as f64
}
