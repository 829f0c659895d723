//! Alarm notification delivery
//!
//! Notifiers push a [`DetectionEvent`] to an external channel. Delivery
//! is retried with exponential backoff and never blocks detection when
//! routed through a [`Dispatcher`].

mod manager;
mod ntfy;

use std::time::Duration;

pub use manager::{Dispatcher, NotificationManager};
pub use ntfy::NtfyNotifier;

use crate::detection::DetectionEvent;

/// Upper bound on any single backoff delay
pub const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

/// Retry schedule for a notifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_secs: f64) -> Self {
        Self {
            max_retries,
            base_delay: clamp_delay(Duration::try_from_secs_f64(base_delay_secs.max(0.0)).ok()),
        }
    }

    /// Delay after the failed attempt with zero-based index `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        clamp_delay(self.base_delay.checked_mul(2u32.saturating_pow(attempt)))
    }
}

// Out-of-range and overflowed delays saturate at the maximum
fn clamp_delay(delay: Option<Duration>) -> Duration {
    let max = Duration::from_secs_f64(MAX_RETRY_DELAY_SECS);
    delay.map_or(max, |d| d.min(max))
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1.0)
    }
}

/// A notification channel
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Deliver one notification, once
    fn send(&self, event: &DetectionEvent, is_test: bool) -> anyhow::Result<()>;

    /// Deliver with retries. Disabled notifiers report success.
    fn notify_with_retry(&self, event: &DetectionEvent, is_test: bool) -> bool {
        if !self.is_enabled() {
            log::debug!("Notifier {} is disabled, skipping", self.name());
            return true;
        }

        let policy = self.retry_policy();
        for attempt in 0..=policy.max_retries {
            match self.send(event, is_test) {
                Ok(()) => {
                    if attempt > 0 {
                        log::info!(
                            "{}: notification sent on attempt {}",
                            self.name(),
                            attempt + 1
                        );
                    }
                    return true;
                }
                Err(e) => {
                    log::warn!("{}: attempt {} failed: {:#}", self.name(), attempt + 1, e);
                }
            }

            if attempt < policy.max_retries {
                let delay = policy.delay_for(attempt);
                log::info!("{}: retrying in {:.1}s", self.name(), delay.as_secs_f64());
                std::thread::sleep(delay);
            }
        }

        log::error!(
            "{}: all {} notification attempts failed",
            self.name(),
            policy.max_retries + 1
        );
        false
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FlakyNotifier;
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, 1.0);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_saturates_at_max() {
        let max = Duration::from_secs_f64(MAX_RETRY_DELAY_SECS);
        assert_eq!(RetryPolicy::new(3, 1e30).base_delay, max);
        assert_eq!(RetryPolicy::new(3, f64::INFINITY).base_delay, max);
        assert_eq!(RetryPolicy::new(3, f64::NAN).base_delay, Duration::ZERO);

        let policy = RetryPolicy::new(3, 1.0);
        assert_eq!(policy.delay_for(40), max);
        assert_eq!(policy.delay_for(u32::MAX), max);
        assert_eq!(RetryPolicy::new(3, 3000.0).delay_for(1), max);
    }

    #[test]
    fn test_retry_until_success() {
        let notifier = FlakyNotifier::new("flaky", 2, 3);
        assert!(notifier.notify_with_retry(&DetectionEvent::test_event(0.0), true));
        assert_eq!(notifier.attempts(), 3);
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let notifier = FlakyNotifier::new("broken", 10, 3);
        assert!(!notifier.notify_with_retry(&DetectionEvent::test_event(0.0), false));
        assert_eq!(notifier.attempts(), 4);
    }

    #[test]
    fn test_disabled_notifier_is_skipped() {
        let mut notifier = FlakyNotifier::new("off", 10, 3);
        notifier.enabled = false;
        assert!(notifier.notify_with_retry(&DetectionEvent::test_event(0.0), false));
        assert_eq!(notifier.attempts(), 0);
    }
}
