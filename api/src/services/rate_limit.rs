//! Per-user rate limiting for upload-credential endpoints
//!
//! Token bucket with in-memory storage keyed by user_id. Auth endpoints use
//! IP-based limiting (tower_governor) instead; this limiter covers the
//! authenticated paths where every request creates a CDN resource.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use std::time::{Duration, Instant};

pub struct RateLimitConfig {
    /// Maximum tokens (burst capacity)
    pub max_tokens: u32,
    /// Tokens added per second
    pub refill_rate: f64,
}

struct UserBucket {
    tokens: f64,
    last_update: Instant,
}

pub struct UserRateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<i64, UserBucket>>,
}

impl UserRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true if the request is allowed, false if rate limited.
    pub fn check(&self, user_id: i64) -> bool {
        let mut buckets = self.buckets.lock().unwrap();
        let now = Instant::now();

        let bucket = buckets.entry(user_id).or_insert_with(|| UserBucket {
            tokens: self.config.max_tokens as f64,
            last_update: now,
        });

        let elapsed = now.duration_since(bucket.last_update);
        let refill = elapsed.as_secs_f64() * self.config.refill_rate;
        bucket.tokens = (bucket.tokens + refill).min(self.config.max_tokens as f64);
        bucket.last_update = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets idle longer than max_age to bound memory
    #[allow(dead_code)]
    pub fn cleanup(&self, max_age: Duration) {
        let mut buckets = self.buckets.lock().unwrap();
        let now = Instant::now();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_update) < max_age);
    }
}

/// Limiter for upload-credential endpoints: each allowed request creates a
/// CDN video container, so the sustained rate is kept low.
/// Burst of 10, refill 1 token every 2 seconds.
pub static UPLOAD_RATE_LIMITER: LazyLock<UserRateLimiter> = LazyLock::new(|| {
    UserRateLimiter::new(RateLimitConfig {
        max_tokens: 10,
        refill_rate: 0.5,
    })
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_limited() {
        let limiter = UserRateLimiter::new(RateLimitConfig {
            max_tokens: 3,
            refill_rate: 0.0,
        });
        assert!(limiter.check(1));
        assert!(limiter.check(1));
        assert!(limiter.check(1));
        assert!(!limiter.check(1));
        // Other users are unaffected
        assert!(limiter.check(2));
    }
}
