//! Token-bucket rate limiter for outbound operations
//!
//! One limiter is shared by every visit in a crawl and gates both page
//! navigations and summarizer calls.

use crate::config::RateLimitConfig;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Slowest refill rate used when given a rate that cannot produce tokens
const MIN_REFILL_RATE: f64 = 0.001;

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    max_tokens: u32,
    refill_rate: f64,
}

impl RateLimiter {
    /// Creates a full bucket
    ///
    /// # Arguments
    ///
    /// * `max_tokens` - Burst capacity
    /// * `refill_rate` - Tokens added per second; zero, negative and NaN
    ///   rates are raised to a minimum instead of stalling forever
    pub fn new(max_tokens: u32, refill_rate: f64) -> Self {
        let refill_rate = if refill_rate.is_finite() && refill_rate > 0.0 {
            refill_rate.max(MIN_REFILL_RATE)
        } else {
            MIN_REFILL_RATE
        };
        Self {
            bucket: Mutex::new(Bucket {
                tokens: max_tokens,
                last_refill: Instant::now(),
            }),
            max_tokens,
            refill_rate,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_tokens, config.refill_rate)
    }

    fn bucket(&self) -> MutexGuard<'_, Bucket> {
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Time to wait before a refill can produce the next token
    fn wait_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refill_rate)
    }

    /// Adds `floor(elapsed_ms * rate / 1000)` tokens, capped at capacity
    ///
    /// `last_refill` only moves forward by the time that actually produced
    /// tokens, so frequent callers cannot starve the bucket by resetting
    /// the clock with zero-token refills.
    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed_ms = now.saturating_duration_since(bucket.last_refill).as_millis() as f64;
        let added = (elapsed_ms * self.refill_rate / 1000.0).floor();
        if added < 1.0 {
            return;
        }

        let room = self.max_tokens.saturating_sub(bucket.tokens);
        if added >= room as f64 {
            bucket.tokens = self.max_tokens;
            bucket.last_refill = now;
        } else {
            bucket.tokens += added as u32;
            bucket.last_refill += Duration::from_secs_f64(added / self.refill_rate);
        }
    }

    /// Takes a token if one is available right now
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket();
        self.refill(&mut bucket, Instant::now());

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Waits until a token is available and consumes it
    pub async fn acquire(&self) {
        while !self.try_acquire() {
            tokio::time::sleep(self.wait_interval()).await;
        }
    }

    /// Tokens currently in the bucket
    pub fn available(&self) -> u32 {
        let mut bucket = self.bucket();
        self.refill(&mut bucket, Instant::now());
        bucket.tokens
    }
}
