//! Backoff strategies.
//!
//! A [`Backoff`] maps the 1-based index of the attempt that just completed to
//! the time to wait before the next one.

use std::time::Duration;

use rand::Rng;
use tracing::trace;

/// Wait schedule between attempts.
///
/// Implemented for any `Fn(u32) -> Duration + Send + Sync`, so a closure can
/// be passed wherever a `Backoff` is expected.
pub trait Backoff: Send + Sync {
    /// Time to wait after attempt `attempt` (1-based) before the next send.
    fn backoff(&self, attempt: u32) -> Duration;
}

impl<F> Backoff for F
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn backoff(&self, attempt: u32) -> Duration {
        self(attempt)
    }
}

/// Exponential backoff with full jitter.
///
/// The ceiling for attempt `k` is `min(base * 2^k, cap)` and the wait is drawn
/// uniformly from `[0, ceiling)`. A zero ceiling yields no wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialJitter {
    /// Base delay.
    pub base: Duration,
    /// Upper bound on the ceiling.
    pub cap: Duration,
}

impl ExponentialJitter {
    /// Create a new schedule.
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Create a schedule from millisecond values.
    pub fn from_millis(base_ms: u64, cap_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(cap_ms))
    }

    /// Upper bound of the wait drawn for `attempt`.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u128.checked_shl(attempt).unwrap_or(u128::MAX);
        let nanos = self
            .base
            .as_nanos()
            .saturating_mul(factor)
            .min(self.cap.as_nanos());
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl Default for ExponentialJitter {
    fn default() -> Self {
        Self::from_millis(1000, 10_000)
    }
}

impl Backoff for ExponentialJitter {
    fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        let ceiling_nanos = ceiling.as_nanos() as u64;
        let wait = if ceiling_nanos == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(rand::rng().random_range(0..ceiling_nanos))
        };
        trace!(attempt, ceiling = ?ceiling, wait = ?wait, "Computed backoff");
        wait
    }
}

/// Deterministic backoff schedules.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// No delay between attempts.
    None,
    /// Constant delay between attempts.
    Constant(Duration),
    /// Linear backoff: delay grows by a fixed amount per attempt.
    Linear {
        /// Delay increment per attempt.
        delay: Duration,
        /// Maximum delay.
        max: Duration,
    },
    /// Exponential backoff without jitter.
    Exponential {
        /// Delay after the first attempt.
        initial: Duration,
        /// Maximum delay.
        max: Duration,
        /// Multiplier (typically 2.0).
        multiplier: f64,
    },
}

impl Backoff for BackoffStrategy {
    fn backoff(&self, attempt: u32) -> Duration {
        let step = attempt.saturating_sub(1);
        match self {
            Self::None => Duration::ZERO,
            Self::Constant(d) => *d,
            Self::Linear { delay, max } => delay.saturating_mul(step.saturating_add(1)).min(*max),
            Self::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let factor = multiplier.powi(i32::try_from(step).unwrap_or(i32::MAX));
                let nanos = initial.as_nanos() as f64 * factor;
                if !nanos.is_finite() || nanos >= max.as_nanos() as f64 {
                    *max
                } else {
                    Duration::from_nanos(nanos.max(0.0) as u64)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_doubles_until_cap() {
        let backoff = ExponentialJitter::from_millis(1000, 10_000);
        assert_eq!(backoff.ceiling(1), Duration::from_millis(2000));
        assert_eq!(backoff.ceiling(2), Duration::from_millis(4000));
        assert_eq!(backoff.ceiling(3), Duration::from_millis(8000));
        assert_eq!(backoff.ceiling(4), Duration::from_millis(10_000));
        assert_eq!(backoff.ceiling(200), Duration::from_millis(10_000));
    }

    #[test]
    fn test_jitter_stays_below_ceiling() {
        let backoff = ExponentialJitter::from_millis(10, 100);
        for attempt in 1..8 {
            let ceiling = backoff.ceiling(attempt);
            for _ in 0..50 {
                assert!(backoff.backoff(attempt) < ceiling);
            }
        }
    }

    #[test]
    fn test_zero_ceiling_means_no_wait() {
        let backoff = ExponentialJitter::from_millis(0, 10_000);
        assert_eq!(backoff.backoff(3), Duration::ZERO);

        let capped = ExponentialJitter::from_millis(1000, 0);
        assert_eq!(capped.backoff(1), Duration::ZERO);
    }

    #[test]
    fn test_closure_is_backoff() {
        let backoff = |attempt: u32| Duration::from_millis(u64::from(attempt) * 10);
        assert_eq!(Backoff::backoff(&backoff, 3), Duration::from_millis(30));
    }

    #[test]
    fn test_exponential_strategy_is_one_based() {
        let strategy = BackoffStrategy::Exponential {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(10),
            multiplier: 2.0,
        };

        assert_eq!(strategy.backoff(1), Duration::from_millis(100));
        assert_eq!(strategy.backoff(2), Duration::from_millis(200));
        assert_eq!(strategy.backoff(4), Duration::from_millis(800));
        assert_eq!(strategy.backoff(64), Duration::from_secs(10));
    }

    #[test]
    fn test_linear_strategy() {
        let strategy = BackoffStrategy::Linear {
            delay: Duration::from_millis(100),
            max: Duration::from_secs(1),
        };

        assert_eq!(strategy.backoff(1), Duration::from_millis(100));
        assert_eq!(strategy.backoff(2), Duration::from_millis(200));
        assert_eq!(strategy.backoff(10), Duration::from_secs(1));
        assert_eq!(strategy.backoff(50), Duration::from_secs(1));
    }

    #[test]
    fn test_constant_and_none() {
        let constant = BackoffStrategy::Constant(Duration::from_millis(500));
        assert_eq!(constant.backoff(1), Duration::from_millis(500));
        assert_eq!(constant.backoff(6), Duration::from_millis(500));
        assert_eq!(BackoffStrategy::None.backoff(3), Duration::ZERO);
    }
}
