// src/rate.rs

//! Adaptive rate limit handling.
//!
//! The limiter inspects each API response and tells the work loop what to
//! do next. Keeping this as an owned value with no HTTP types in its
//! interface makes the backoff policy testable without a live server.

use std::time::Duration;

use crate::models::RateConfig;

/// What the work loop should do after a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Normalize and persist the payload, then advance.
    Proceed,
    /// Sleep, then retry the same identifier.
    Wait(Duration),
    /// Consume the item without persisting; the release is gone upstream.
    Skip,
    /// The credential is rejected; terminate the process.
    Abort,
}

/// The response fields the limiter cares about.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseMeta {
    pub status: u16,
    /// Remaining-request budget header, when present
    pub remaining: Option<u64>,
    /// Retry-After header in seconds, when present and integral
    pub retry_after: Option<u64>,
}

/// Process-local rate limit state, mutated once per response.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    remaining: u64,
    backoff_secs: u64,
    floor_secs: u64,
    ceiling_secs: u64,
    default_wait_secs: u64,
}

impl RateLimiter {
    pub fn new(config: &RateConfig) -> Self {
        Self {
            // Assume budget is available until the first response says
            // otherwise.
            remaining: config.initial_remaining,
            backoff_secs: config.floor_secs,
            floor_secs: config.floor_secs,
            ceiling_secs: config.ceiling_secs,
            default_wait_secs: config.default_wait_secs,
        }
    }

    /// Update state from a response and decide the next step.
    pub fn observe(&mut self, meta: &ResponseMeta) -> Directive {
        match meta.status {
            200 => {
                if let Some(remaining) = meta.remaining {
                    self.remaining = remaining;
                }
                if self.remaining == 0 {
                    // Budget exhausted even though the request succeeded:
                    // wait adaptively before the next one.
                    let wait = self.backoff_secs;
                    self.backoff_secs = (self.backoff_secs * 2).min(self.ceiling_secs);
                    Directive::Wait(Duration::from_secs(wait))
                } else {
                    self.backoff_secs = self.floor_secs;
                    Directive::Proceed
                }
            }
            401 => Directive::Abort,
            404 => Directive::Skip,
            429 => {
                // An explicit Retry-After overrides the adaptive backoff and
                // leaves its state untouched.
                let wait = meta.retry_after.unwrap_or(self.default_wait_secs);
                Directive::Wait(Duration::from_secs(wait))
            }
            // Unrecognized status: conservative sleep-and-retry so the item
            // is never lost.
            _ => Directive::Wait(Duration::from_secs(self.default_wait_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(&RateConfig::default())
    }

    fn ok_with_remaining(remaining: u64) -> ResponseMeta {
        ResponseMeta {
            status: 200,
            remaining: Some(remaining),
            retry_after: None,
        }
    }

    #[test]
    fn proceeds_while_budget_remains() {
        let mut limiter = limiter();
        assert_eq!(limiter.observe(&ok_with_remaining(42)), Directive::Proceed);
    }

    #[test]
    fn zero_budget_waits_and_doubles_up_to_ceiling() {
        let mut limiter = limiter();

        let mut waits = Vec::new();
        for _ in 0..6 {
            match limiter.observe(&ok_with_remaining(0)) {
                Directive::Wait(d) => waits.push(d.as_secs()),
                other => panic!("expected Wait, got {other:?}"),
            }
        }
        assert_eq!(waits, vec![5, 10, 20, 40, 60, 60]);
    }

    #[test]
    fn success_with_budget_resets_backoff_to_floor() {
        let mut limiter = limiter();

        limiter.observe(&ok_with_remaining(0));
        limiter.observe(&ok_with_remaining(0));
        assert_eq!(limiter.observe(&ok_with_remaining(10)), Directive::Proceed);

        // Backoff is back at the floor after the reset.
        assert_eq!(
            limiter.observe(&ok_with_remaining(0)),
            Directive::Wait(Duration::from_secs(5))
        );
    }

    #[test]
    fn retry_after_header_overrides_adaptive_backoff() {
        let mut limiter = limiter();

        // Grow the adaptive backoff first.
        limiter.observe(&ok_with_remaining(0));
        limiter.observe(&ok_with_remaining(0));

        let meta = ResponseMeta {
            status: 429,
            remaining: None,
            retry_after: Some(30),
        };
        assert_eq!(
            limiter.observe(&meta),
            Directive::Wait(Duration::from_secs(30))
        );

        // The 429 left the adaptive state untouched: 5 -> 10 -> next is 20.
        assert_eq!(
            limiter.observe(&ok_with_remaining(0)),
            Directive::Wait(Duration::from_secs(20))
        );
    }

    #[test]
    fn throttled_without_header_waits_default() {
        let mut limiter = limiter();
        let meta = ResponseMeta {
            status: 429,
            ..ResponseMeta::default()
        };
        assert_eq!(
            limiter.observe(&meta),
            Directive::Wait(Duration::from_secs(60))
        );
    }

    #[test]
    fn unrecognized_status_is_treated_like_throttling() {
        let mut limiter = limiter();
        let meta = ResponseMeta {
            status: 502,
            ..ResponseMeta::default()
        };
        assert_eq!(
            limiter.observe(&meta),
            Directive::Wait(Duration::from_secs(60))
        );
    }

    #[test]
    fn unauthorized_aborts_and_missing_release_skips() {
        let mut limiter = limiter();
        let unauthorized = ResponseMeta {
            status: 401,
            ..ResponseMeta::default()
        };
        let missing = ResponseMeta {
            status: 404,
            ..ResponseMeta::default()
        };
        assert_eq!(limiter.observe(&unauthorized), Directive::Abort);
        assert_eq!(limiter.observe(&missing), Directive::Skip);
    }

    #[test]
    fn budget_carries_across_responses_without_header() {
        let mut limiter = limiter();

        limiter.observe(&ok_with_remaining(0));

        // No header on the next 200: the carried zero still throttles.
        let meta = ResponseMeta {
            status: 200,
            remaining: None,
            retry_after: None,
        };
        assert!(matches!(limiter.observe(&meta), Directive::Wait(_)));
    }
}
