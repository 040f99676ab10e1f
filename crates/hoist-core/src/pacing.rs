//! Rate limiting between remote calls.
//!
//! The engine never sleeps on its own. At each step boundary it asks the
//! injected [`PacingPolicy`] to wait, and after a failed call it asks whether
//! the same call should be issued again.

use crate::client::RemoteCreationError;
use std::thread;
use std::time::Duration;

/// Default wait after each child creation call.
pub const DEFAULT_BETWEEN_CHILDREN: Duration = Duration::from_millis(200);
/// Default wait after each parent subtree.
pub const DEFAULT_BETWEEN_PARENTS: Duration = Duration::from_millis(500);

/// The step boundary at which the engine yields to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// After a child creation call, successful or not.
    BetweenChildren,
    /// After a parent and all of its children were processed or skipped.
    BetweenParents,
    /// Before reissuing a failed call. `attempt` is the attempt that failed,
    /// starting at 1.
    BeforeRetry { attempt: u32 },
}

/// Strategy governing delays and retries between remote calls.
pub trait PacingPolicy {
    /// How long to wait at `pause`.
    fn delay(&self, pause: Pause) -> Duration;

    /// Block the calling thread for [`delay`](Self::delay).
    fn wait(&mut self, pause: Pause) {
        let delay = self.delay(pause);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    /// Whether a call that failed on `attempt` (1-based) should be reissued.
    fn should_retry(&self, _attempt: u32, _error: &RemoteCreationError) -> bool {
        false
    }
}

impl<P: PacingPolicy + ?Sized> PacingPolicy for &mut P {
    fn delay(&self, pause: Pause) -> Duration {
        (**self).delay(pause)
    }

    fn wait(&mut self, pause: Pause) {
        (**self).wait(pause);
    }

    fn should_retry(&self, attempt: u32, error: &RemoteCreationError) -> bool {
        (**self).should_retry(attempt, error)
    }
}

/// Constant delays, no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPacing {
    pub between_children: Duration,
    pub between_parents: Duration,
}

impl FixedPacing {
    #[must_use]
    pub const fn new(between_children: Duration, between_parents: Duration) -> Self {
        Self {
            between_children,
            between_parents,
        }
    }

    /// No waiting at all.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

impl Default for FixedPacing {
    fn default() -> Self {
        Self::new(DEFAULT_BETWEEN_CHILDREN, DEFAULT_BETWEEN_PARENTS)
    }
}

impl PacingPolicy for FixedPacing {
    fn delay(&self, pause: Pause) -> Duration {
        match pause {
            Pause::BetweenChildren => self.between_children,
            Pause::BetweenParents => self.between_parents,
            Pause::BeforeRetry { .. } => Duration::ZERO,
        }
    }
}

/// Fixed step delays plus bounded exponential backoff on rate limiting.
///
/// Only calls rejected with HTTP 429 or 503 are retried, at most
/// `max_retries` times per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPacing {
    pub steps: FixedPacing,
    pub max_retries: u32,
    pub base: Duration,
    pub max_delay: Duration,
}

impl BackoffPacing {
    #[must_use]
    pub const fn new(steps: FixedPacing, max_retries: u32) -> Self {
        Self {
            steps,
            max_retries,
            base: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub const fn with_backoff(mut self, base: Duration, max_delay: Duration) -> Self {
        self.base = base;
        self.max_delay = max_delay;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }
}

impl PacingPolicy for BackoffPacing {
    fn delay(&self, pause: Pause) -> Duration {
        match pause {
            Pause::BeforeRetry { attempt } => self.backoff(attempt),
            step => self.steps.delay(step),
        }
    }

    fn should_retry(&self, attempt: u32, error: &RemoteCreationError) -> bool {
        attempt <= self.max_retries && error.is_rate_limited()
    }
}
