use std::{
    env,
    net::IpAddr,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};
use tracing::debug;

#[derive(Debug)]
struct TokenBucket {
    last_refill: Instant,
    tokens: u32,
}

/// Per-address token buckets guarding session creation. Every bucket refills
/// to `capacity` once per `refill_interval`.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<IpAddr, TokenBucket>,
    capacity: u32,
    refill_interval: Duration,
}

impl RateLimiter {
    pub fn from_env() -> Self {
        let capacity = env::var("RATE_LIMIT_SESSIONS_PER_MINUTE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(10);

        Self::new(capacity, Duration::from_secs(60))
    }

    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_interval,
        }
    }

    pub fn check(&self, client_ip: &ClientIp) -> Result<(), Status> {
        let mut bucket = self.buckets.entry(client_ip.0).or_insert_with(|| TokenBucket {
            last_refill: Instant::now(),
            tokens: self.capacity,
        });

        if bucket.last_refill.elapsed() >= self.refill_interval {
            bucket.tokens = self.capacity;
            bucket.last_refill = Instant::now();
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            Ok(())
        } else {
            debug!("rate limit exhausted for {}", client_ip.0);
            Err(Status::TooManyRequests)
        }
    }
}

pub struct ClientIp(pub IpAddr);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        // first address in X-Forwarded-For when behind a proxy
        let ip = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|header| header.split(',').next())
            .and_then(|ip| ip.trim().parse().ok())
            .or_else(|| req.client_ip())
            .unwrap_or_else(|| IpAddr::from([127, 0, 0, 1]));

        request::Outcome::Success(ClientIp(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_empties_after_capacity_checks() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let ip = ClientIp(IpAddr::from([10, 0, 0, 1]));

        assert!(limiter.check(&ip).is_ok());
        assert!(limiter.check(&ip).is_ok());
        assert_eq!(limiter.check(&ip), Err(Status::TooManyRequests));
    }

    #[test]
    fn buckets_are_tracked_per_address() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let first = ClientIp(IpAddr::from([10, 0, 0, 1]));
        let second = ClientIp(IpAddr::from([10, 0, 0, 2]));

        assert!(limiter.check(&first).is_ok());
        assert!(limiter.check(&second).is_ok());
        assert_eq!(limiter.check(&first), Err(Status::TooManyRequests));
    }
}
