use std::time::{Duration, Instant};

/// Token bucket guarding one connection. Games like pickle pop click fast,
/// so the bucket refills several times per second.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_rate: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::new_with_limits(40, Duration::from_millis(100))
    }

    pub fn new_with_limits(max_tokens: u32, refill_rate: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    pub fn check_rate_limit(&mut self) -> bool {
        self.refill_tokens();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_tokens(&mut self) {
        let elapsed = self.last_refill.elapsed();
        let rate = self.refill_rate.as_millis().max(1);
        let earned = elapsed.as_millis() / rate;

        if earned > 0 {
            let earned = earned.min(self.max_tokens as u128) as u32;
            self.tokens = (self.tokens + earned).min(self.max_tokens);
            // keep the fractional remainder for the next refill
            self.last_refill += self.refill_rate * earned;
        }
    }

    pub fn get_remaining_tokens(&mut self) -> u32 {
        self.refill_tokens();
        self.tokens
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_drains() {
        let mut limiter = RateLimiter::new_with_limits(3, Duration::from_secs(60));
        assert!(limiter.check_rate_limit());
        assert!(limiter.check_rate_limit());
        assert!(limiter.check_rate_limit());
        assert!(!limiter.check_rate_limit());
    }

    #[test]
    fn test_bucket_refills() {
        let mut limiter = RateLimiter::new_with_limits(2, Duration::from_millis(10));
        assert!(limiter.check_rate_limit());
        assert!(limiter.check_rate_limit());
        assert!(!limiter.check_rate_limit());

        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(limiter.get_remaining_tokens(), 2);
    }
}
