//! Per-client rate limiting for submissions.
//!
//! Token bucket per client address. Clients that submit for a registered
//! sequencer get the configured limits; anything else (unknown or missing
//! sequencer ids) gets a smaller bucket so probing cannot crowd out real
//! sequencers.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Configuration for rate limiting.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Sustained submissions per second for registered sequencers.
    pub requests_per_sec: u32,
    /// Bucket capacity for registered sequencers.
    pub burst: u32,
    /// Sustained submissions per second for unregistered senders.
    pub unregistered_requests_per_sec: u32,
    /// Bucket capacity for unregistered senders.
    pub unregistered_burst: u32,
    /// Forget a client after this long without requests.
    pub client_ttl: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_sec: 200,
            burst: 400,
            unregistered_requests_per_sec: 5,
            unregistered_burst: 10,
            client_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, refill_rate: u32) -> Self {
        Self {
            tokens: capacity as f64,
            capacity: capacity as f64,
            refill_rate: refill_rate as f64,
            last_update: Instant::now(),
        }
    }

    fn try_consume(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token buckets keyed by client address and registration class.
#[derive(Debug)]
pub struct SubmitRateLimiter {
    config: RateLimitConfig,
    buckets: HashMap<(IpAddr, bool), TokenBucket>,
    last_cleanup: Instant,
}

impl SubmitRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: HashMap::new(),
            last_cleanup: Instant::now(),
        }
    }

    /// Returns `true` if a submission from `client` may proceed.
    pub fn check(&mut self, client: IpAddr, registered: bool) -> bool {
        let now = Instant::now();
        if now.saturating_duration_since(self.last_cleanup) > Duration::from_secs(60) {
            self.cleanup(now);
        }

        let config = &self.config;
        self.buckets
            .entry((client, registered))
            .or_insert_with(|| {
                if registered {
                    TokenBucket::new(config.burst, config.requests_per_sec)
                } else {
                    TokenBucket::new(config.unregistered_burst, config.unregistered_requests_per_sec)
                }
            })
            .try_consume(now)
    }

    fn cleanup(&mut self, now: Instant) {
        let ttl = self.config.client_ttl;
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_update) <= ttl);
        self.last_cleanup = now;
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn limiter() -> SubmitRateLimiter {
        SubmitRateLimiter::new(RateLimitConfig {
            requests_per_sec: 1,
            burst: 5,
            unregistered_requests_per_sec: 1,
            unregistered_burst: 2,
            client_ttl: Duration::from_secs(60),
        })
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_registered_burst() {
        let mut limiter = limiter();
        for _ in 0..5 {
            assert!(limiter.check(ip(1), true));
        }
        assert!(!limiter.check(ip(1), true));
    }

    #[test]
    fn test_unregistered_gets_smaller_bucket() {
        let mut limiter = limiter();
        assert!(limiter.check(ip(1), false));
        assert!(limiter.check(ip(1), false));
        assert!(!limiter.check(ip(1), false));

        // Separate bucket for registered traffic from the same address.
        assert!(limiter.check(ip(1), true));
    }

    #[test]
    fn test_clients_are_independent() {
        let mut limiter = limiter();
        for _ in 0..5 {
            limiter.check(ip(1), true);
        }
        assert!(!limiter.check(ip(1), true));
        assert!(limiter.check(ip(2), true));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_tokens_refill() {
        let mut bucket = TokenBucket::new(1, 10);
        let start = bucket.last_update;
        assert!(bucket.try_consume(start));
        assert!(!bucket.try_consume(start));
        assert!(bucket.try_consume(start + Duration::from_millis(150)));
    }
}
