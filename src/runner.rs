use crate::models::{ExperimentResult, TestCase};
use crate::pacing::Pacer;
use crate::scoring::{self, Scores};
use crate::strategy::AnswerProvider;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Execute one strategy against one test case.
///
/// Never fails: a generation error becomes a zero-scored result whose
/// `error` field carries the description, so one bad case cannot abort
/// the batch.
pub async fn run_case<P>(test_case: &TestCase, provider: &P) -> ExperimentResult
where
    P: AnswerProvider + ?Sized,
{
    let strategy_id = provider.kind();

    match provider.generate(&test_case.prompt).await {
        Ok(generation) => {
            let Scores { relevance, accuracy } = scoring::score(&generation.text, &test_case.expected_elements);

            ExperimentResult {
                strategy_id,
                case_id: test_case.id.clone(),
                prompt: test_case.prompt.clone(),
                response_text: generation.text,
                latency_ms: generation.latency_ms,
                token_count: generation.token_count,
                relevance_score: relevance,
                accuracy_score: accuracy,
                timestamp: Utc::now(),
                error: None,
            }
        }
        Err(e) => {
            warn!(strategy = strategy_id.code(), case = %test_case.id, error = %e, "generation failed");

            ExperimentResult {
                strategy_id,
                case_id: test_case.id.clone(),
                prompt: test_case.prompt.clone(),
                response_text: String::new(),
                latency_ms: 0.0,
                token_count: 0,
                relevance_score: 0.0,
                accuracy_score: 0.0,
                timestamp: Utc::now(),
                error: Some(e.to_string()),
            }
        }
    }
}

/// Results of one pass over the case × strategy matrix
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Results in execution order (case-major, strategy-minor)
    pub results: Vec<ExperimentResult>,
    /// True when the run stopped early; collected results remain valid
    pub cancelled: bool,
}

/// Sequential driver over test cases and strategies
pub struct Experiment {
    pacer: Pacer,
    cancel: CancellationToken,
}

impl Experiment {
    /// Create a driver that spaces gateway calls with `pacer`
    pub fn new(pacer: Pacer) -> Self {
        Self {
            pacer,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between calls once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run every strategy against every test case, one call at a time
    pub async fn run_all<P>(&mut self, test_cases: &[TestCase], providers: &[P]) -> RunOutcome
    where
        P: AnswerProvider,
    {
        let total = test_cases.len() * providers.len();
        let mut results = Vec::with_capacity(total);

        for test_case in test_cases {
            for provider in providers {
                if !self.pacer.wait(&self.cancel).await {
                    info!(completed = results.len(), total, "experiment cancelled");
                    return RunOutcome {
                        results,
                        cancelled: true,
                    };
                }

                info!(
                    "Running {} for {}... ({}/{})",
                    provider.kind().code(),
                    test_case.id,
                    results.len() + 1,
                    total
                );

                let result = run_case(test_case, provider).await;
                debug!(
                    relevance = result.relevance_score,
                    accuracy = result.accuracy_score,
                    latency_ms = result.latency_ms,
                    "case finished"
                );
                results.push(result);
            }
        }

        RunOutcome {
            results,
            cancelled: false,
        }
    }
}
