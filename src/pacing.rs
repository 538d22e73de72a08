use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// How consecutive gateway calls are spaced
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacingPolicy {
    /// No delay; used by tests and local gateways
    Unpaced,
    /// Sleep a fixed interval before every call but the first
    FixedDelay(Duration),
    /// Keep at least this much time between call starts
    MinInterval(Duration),
}

/// Rate limiter applied by the experiment driver between calls
#[derive(Debug)]
pub struct Pacer {
    policy: PacingPolicy,
    last_call: Option<Instant>,
}

impl Pacer {
    pub fn new(policy: PacingPolicy) -> Self {
        Self {
            policy,
            last_call: None,
        }
    }

    pub fn none() -> Self {
        Self::new(PacingPolicy::Unpaced)
    }

    pub fn fixed(delay: Duration) -> Self {
        if delay.is_zero() {
            return Self::none();
        }
        Self::new(PacingPolicy::FixedDelay(delay))
    }

    /// Minimum-interval pacing expressed as requests per second; non-positive disables pacing.
    ///
    /// `None` when the rate has no representable interval (NaN, or so small the interval overflows).
    pub fn per_second(rate_limit_rps: f64) -> Option<Self> {
        if rate_limit_rps <= 0.0 {
            return Some(Self::none());
        }
        let interval = Duration::try_from_secs_f64(1.0 / rate_limit_rps).ok()?;
        Some(Self::new(PacingPolicy::MinInterval(interval)))
    }

    pub fn policy(&self) -> PacingPolicy {
        self.policy
    }

    /// How long the next call has to wait
    fn pending_delay(&self) -> Duration {
        let Some(last_time) = self.last_call else {
            return Duration::ZERO;
        };

        match self.policy {
            PacingPolicy::Unpaced => Duration::ZERO,
            PacingPolicy::FixedDelay(delay) => delay,
            PacingPolicy::MinInterval(min_interval) => min_interval.saturating_sub(last_time.elapsed()),
        }
    }

    /// Wait until the next call may start. Returns `false` if cancelled while waiting.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> bool {
        let delay = self.pending_delay();

        if !delay.is_zero() {
            tokio::select! {
                _ = sleep(delay) => {}
                _ = cancel.cancelled() => return false,
            }
        }

        self.last_call = Some(Instant::now());
        !cancel.is_cancelled()
    }
}
