//! Retry configuration, the per-call attempt state machine, and the
//! injectable sleep used for throttling and backoff.
//!
//! A `generate()` call moves through three phases:
//!
//! ```text
//! Attempting ──ok / non-malformed error──▶ Terminal
//!     │ ▲
//!     │ └──────── delay elapsed, attempts left
//!     ▼
//! SoftFailRetry ──delay elapsed, budget spent──▶ Terminal
//! ```
//!
//! Only malformed failures (`invalid_response`, `user_id_response`) enter
//! `SoftFailRetry`. Everything else ends the call on first occurrence.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::client::log_snippet;
use crate::error::{CopysmithError, Result};
use crate::telemetry;

/// Configuration for the direct-API attempt loop.
///
/// Uses linear backoff: the wait after attempt `n` is `n * backoff_step`.
///
/// ```rust
/// # use copysmith::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(3)
///     .backoff_step(Duration::from_millis(200));
/// assert_eq!(config.delay_for_attempt(3), Duration::from_millis(600));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// Default: 5.
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `n` units. Default: 1s.
    pub backoff_step: Duration,
    /// Unconditional pause before every call. Default: 500ms.
    pub throttle: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_step: Duration::from_secs(1),
            throttle: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the linear backoff unit.
    pub fn backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    /// Set the pre-call throttle pause.
    pub fn throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Delay after the given (1-indexed) attempt fails softly.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

// ============================================================================
// Sleep
// ============================================================================

/// Blocking delay on the calling task.
///
/// Injected into the client so tests can record delays instead of waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real delays via `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ============================================================================
// Attempt state machine
// ============================================================================

/// Where a call currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// A request for the current attempt is due.
    Attempting,
    /// The last attempt failed softly; wait `delay` before going on.
    SoftFailRetry { delay: Duration },
    /// The call is over; see [`AttemptState::finish`].
    Terminal,
}

/// What the driver should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Request { attempt: u32 },
    Backoff { attempt: u32, delay: Duration },
    Done,
}

/// Per-call attempt bookkeeping. Lives only for one `generate()` call.
#[derive(Debug)]
pub struct AttemptState {
    attempt: u32,
    max_attempts: u32,
    backoff_step: Duration,
    phase: Phase,
    last: Option<Result<String>>,
}

impl AttemptState {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 1,
            max_attempts: config.max_attempts.max(1),
            backoff_step: config.backoff_step,
            phase: Phase::Attempting,
            last: None,
        }
    }

    /// Current attempt number (1-indexed).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn next_step(&self) -> Step {
        match self.phase {
            Phase::Attempting => Step::Request {
                attempt: self.attempt,
            },
            Phase::SoftFailRetry { delay } => Step::Backoff {
                attempt: self.attempt,
                delay,
            },
            Phase::Terminal => Step::Done,
        }
    }

    /// Feed the result of the current attempt.
    pub fn record(&mut self, result: Result<String>) {
        debug_assert_eq!(self.phase, Phase::Attempting);
        self.phase = match &result {
            Ok(_) => Phase::Terminal,
            Err(e) if !e.is_malformed() => {
                debug!(attempt = self.attempt, error = %e, "non-retryable failure");
                Phase::Terminal
            }
            Err(e) => {
                let delay = self.backoff_step.saturating_mul(self.attempt);
                warn!(
                    attempt = self.attempt,
                    max_attempts = self.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "malformed API response, backing off"
                );
                Phase::SoftFailRetry { delay }
            }
        };
        self.last = Some(result);
    }

    /// Signal that the backoff delay has passed.
    pub fn backoff_elapsed(&mut self) {
        debug_assert!(matches!(self.phase, Phase::SoftFailRetry { .. }));
        if self.attempt < self.max_attempts {
            let reason = self
                .last
                .as_ref()
                .and_then(|r| r.as_ref().err())
                .map_or("unknown", |e| e.kind().as_str());
            metrics::counter!(telemetry::RETRIES_TOTAL, "reason" => reason).increment(1);
            self.attempt += 1;
            self.phase = Phase::Attempting;
        } else {
            self.phase = Phase::Terminal;
        }
    }

    /// Resolve the call.
    ///
    /// When the attempt budget ran out on identifier-shaped content text,
    /// that text is returned as a success: best-effort content is preferred
    /// over none.
    pub fn finish(self) -> Result<String> {
        match self.last {
            Some(Ok(text)) => Ok(text),
            Some(Err(CopysmithError::UserIdResponse { raw: Some(text) })) => {
                warn!(
                    attempts = self.attempt,
                    text = log_snippet(&text),
                    "retries exhausted, returning identifier-shaped text as content"
                );
                Ok(text)
            }
            Some(Err(e)) => Err(e),
            None => Err(CopysmithError::ApiFailed {
                attempts: self.attempt,
            }),
        }
    }
}

/// Drive an attempt loop to completion.
///
/// `attempt_fn` receives the 1-indexed attempt number. Backoff delays go
/// through `sleeper`.
pub async fn with_retry<F, Fut>(
    config: &RetryConfig,
    sleeper: &dyn Sleeper,
    mut attempt_fn: F,
) -> Result<String>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut state = AttemptState::new(config);
    loop {
        match state.next_step() {
            Step::Request { attempt } => {
                let result = attempt_fn(attempt).await;
                state.record(result);
            }
            Step::Backoff { delay, .. } => {
                sleeper.sleep(delay).await;
                state.backoff_elapsed();
            }
            Step::Done => return state.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_starts_attempting() {
        let state = AttemptState::new(&RetryConfig::default());
        assert_eq!(state.attempt(), 1);
        assert_eq!(state.phase(), Phase::Attempting);
        assert_eq!(state.next_step(), Step::Request { attempt: 1 });
    }

    #[test]
    fn success_is_terminal() {
        let mut state = AttemptState::new(&RetryConfig::default());
        state.record(Ok("text".into()));
        assert_eq!(state.next_step(), Step::Done);
        assert_eq!(state.finish().unwrap(), "text");
    }

    #[test]
    fn malformed_enters_soft_fail_with_linear_delay() {
        let mut state = AttemptState::new(&RetryConfig::default());
        state.record(Err(CopysmithError::InvalidResponse));
        assert_eq!(
            state.phase(),
            Phase::SoftFailRetry {
                delay: Duration::from_secs(1)
            }
        );
        state.backoff_elapsed();
        assert_eq!(state.next_step(), Step::Request { attempt: 2 });
        state.record(Err(CopysmithError::InvalidResponse));
        assert_eq!(
            state.next_step(),
            Step::Backoff {
                attempt: 2,
                delay: Duration::from_secs(2)
            }
        );
    }

    #[test]
    fn zero_attempts_clamps_to_one() {
        let mut state = AttemptState::new(&RetryConfig::new().max_attempts(0));
        assert_eq!(state.max_attempts(), 1);
        state.record(Err(CopysmithError::InvalidResponse));
        state.backoff_elapsed();
        assert_eq!(state.phase(), Phase::Terminal);
        assert_eq!(state.finish().unwrap_err(), CopysmithError::InvalidResponse);
    }

    #[test]
    fn finish_without_attempts_is_api_failed() {
        let state = AttemptState::new(&RetryConfig::default());
        assert!(matches!(
            state.finish(),
            Err(CopysmithError::ApiFailed { attempts: 1 })
        ));
    }
}
