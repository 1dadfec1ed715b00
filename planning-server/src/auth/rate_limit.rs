//! Login brute-force protection
//!
//! Every failed login bumps three counters: per (ip, username, station),
//! per (ip, username) across stations, and per ip. Blocking is decided on the
//! cross-station counter, but a block on any of the three keys rejects the
//! attempt.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const MAX_ATTEMPTS: u32 = 5;
const WINDOW: Duration = Duration::from_secs(15 * 60);
const BLOCK_DURATION: Duration = Duration::from_secs(15 * 60);

struct AttemptEntry {
    count: u32,
    first_attempt: Instant,
    last_attempt: Instant,
    blocked_until: Option<Instant>,
}

/// Outcome of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Attempts left before the block kicks in
    Remaining(u32),
    /// Now blocked for this many minutes
    Blocked(i64),
}

#[derive(Clone)]
pub struct LoginRateLimiter {
    inner: Arc<Mutex<HashMap<String, AttemptEntry>>>,
}

fn station_key(ip: &str, username: &str, station_id: i64) -> String {
    format!("{ip}:{}:{}", normalize(username), station_id.max(0))
}

fn global_key(ip: &str, username: &str) -> String {
    format!("global:{ip}:{}", normalize(username))
}

fn ip_key(ip: &str) -> String {
    format!("ip:{ip}")
}

fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

fn ceil_minutes(d: Duration) -> i64 {
    d.as_secs().div_ceil(60).max(1) as i64
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// `Err(remaining_minutes)` when any key is blocked
    pub async fn check(&self, ip: &str, username: &str, station_id: i64) -> Result<(), i64> {
        self.check_at(ip, username, station_id, Instant::now()).await
    }

    async fn check_at(
        &self,
        ip: &str,
        username: &str,
        station_id: i64,
        now: Instant,
    ) -> Result<(), i64> {
        let mut map = self.inner.lock().await;
        for key in [
            station_key(ip, username, station_id),
            global_key(ip, username),
            ip_key(ip),
        ] {
            let Some(until) = map.get(&key).and_then(|e| e.blocked_until) else {
                continue;
            };
            if now < until {
                return Err(ceil_minutes(until - now));
            }
            map.remove(&key);
        }
        Ok(())
    }

    pub async fn record_failure(&self, ip: &str, username: &str, station_id: i64) -> FailureOutcome {
        self.record_failure_at(ip, username, station_id, Instant::now())
            .await
    }

    async fn record_failure_at(
        &self,
        ip: &str,
        username: &str,
        station_id: i64,
        now: Instant,
    ) -> FailureOutcome {
        let mut map = self.inner.lock().await;
        bump(&mut map, station_key(ip, username, station_id), now);
        bump(&mut map, ip_key(ip), now);
        let global = bump(&mut map, global_key(ip, username), now);

        if global.count >= MAX_ATTEMPTS {
            global.blocked_until = Some(now + BLOCK_DURATION);
            tracing::warn!(
                ip = %ip,
                username = %normalize(username),
                attempts = global.count,
                "Login blocked after repeated failures"
            );
            FailureOutcome::Blocked(ceil_minutes(BLOCK_DURATION))
        } else {
            FailureOutcome::Remaining(MAX_ATTEMPTS - global.count)
        }
    }

    /// Clear the station and cross-station counters (the ip counter stays)
    pub async fn record_success(&self, ip: &str, username: &str, station_id: i64) {
        let mut map = self.inner.lock().await;
        map.remove(&station_key(ip, username, station_id));
        map.remove(&global_key(ip, username));
    }

    /// Drop entries whose block or window expired
    pub async fn cleanup(&self) {
        self.cleanup_at(Instant::now()).await;
    }

    async fn cleanup_at(&self, now: Instant) {
        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|_, entry| {
            let block_expired = entry.blocked_until.is_some_and(|until| now > until);
            let window_expired = now.duration_since(entry.last_attempt) > WINDOW;
            !(block_expired || window_expired)
        });
        let cleaned = before - map.len();
        if cleaned > 0 {
            tracing::debug!(cleaned, "Login rate limiter cleanup");
        }
    }
}

fn bump(map: &mut HashMap<String, AttemptEntry>, key: String, now: Instant) -> &mut AttemptEntry {
    let entry = map.entry(key).or_insert(AttemptEntry {
        count: 0,
        first_attempt: now,
        last_attempt: now,
        blocked_until: None,
    });
    if now.duration_since(entry.first_attempt) > WINDOW {
        entry.count = 0;
        entry.first_attempt = now;
        entry.blocked_until = None;
    }
    entry.count += 1;
    entry.last_attempt = now;
    entry
}

/// Client IP: first X-Forwarded-For entry, then X-Real-IP, then peer address.
pub fn client_ip(headers: &http::HeaderMap, peer: Option<std::net::SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
    {
        let ip = first.trim();
        if !ip.is_empty() {
            return ip.to_owned();
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(val) = real_ip.to_str()
    {
        let ip = val.trim();
        if !ip.is_empty() {
            return ip.to_owned();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blocks_after_five_failures() {
        let limiter = LoginRateLimiter::new();
        let t0 = Instant::now();
        for i in 0..4 {
            let outcome = limiter.record_failure_at("1.2.3.4", "Jan", 1, t0).await;
            assert_eq!(outcome, FailureOutcome::Remaining(4 - i));
        }
        assert!(limiter.check_at("1.2.3.4", "jan", 1, t0).await.is_ok());

        let outcome = limiter.record_failure_at("1.2.3.4", "jan", 1, t0).await;
        assert_eq!(outcome, FailureOutcome::Blocked(15));
        assert_eq!(limiter.check_at("1.2.3.4", "jan", 1, t0).await, Err(15));
    }

    #[tokio::test]
    async fn test_block_applies_across_stations() {
        let limiter = LoginRateLimiter::new();
        let t0 = Instant::now();
        for station in 1..=5 {
            limiter.record_failure_at("1.2.3.4", "jan", station, t0).await;
        }
        // Different station, same ip + username
        assert!(limiter.check_at("1.2.3.4", "jan", 9, t0).await.is_err());
        // Other user from same ip is not blocked
        assert!(limiter.check_at("1.2.3.4", "piet", 1, t0).await.is_ok());
    }

    #[tokio::test]
    async fn test_block_expires() {
        let limiter = LoginRateLimiter::new();
        let t0 = Instant::now();
        for _ in 0..5 {
            limiter.record_failure_at("10.0.0.1", "jan", 1, t0).await;
        }
        let later = t0 + Duration::from_secs(10 * 60);
        assert_eq!(limiter.check_at("10.0.0.1", "jan", 1, later).await, Err(5));
        let after = t0 + BLOCK_DURATION + Duration::from_secs(1);
        assert!(limiter.check_at("10.0.0.1", "jan", 1, after).await.is_ok());
    }

    #[tokio::test]
    async fn test_success_clears_counters() {
        let limiter = LoginRateLimiter::new();
        let t0 = Instant::now();
        for _ in 0..4 {
            limiter.record_failure_at("10.0.0.1", "jan", 1, t0).await;
        }
        limiter.record_success("10.0.0.1", "jan", 1).await;
        let outcome = limiter.record_failure_at("10.0.0.1", "jan", 1, t0).await;
        assert_eq!(outcome, FailureOutcome::Remaining(4));
    }

    #[tokio::test]
    async fn test_window_resets_count() {
        let limiter = LoginRateLimiter::new();
        let t0 = Instant::now();
        for _ in 0..4 {
            limiter.record_failure_at("10.0.0.1", "jan", 1, t0).await;
        }
        let later = t0 + WINDOW + Duration::from_secs(1);
        let outcome = limiter.record_failure_at("10.0.0.1", "jan", 1, later).await;
        assert_eq!(outcome, FailureOutcome::Remaining(4));
    }

    #[tokio::test]
    async fn test_cleanup_drops_stale_entries() {
        let limiter = LoginRateLimiter::new();
        let t0 = Instant::now();
        limiter.record_failure_at("10.0.0.1", "jan", 1, t0).await;
        limiter.cleanup_at(t0 + Duration::from_secs(60)).await;
        assert_eq!(limiter.inner.lock().await.len(), 3);
        limiter.cleanup_at(t0 + WINDOW + Duration::from_secs(1)).await;
        assert!(limiter.inner.lock().await.is_empty());
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer: std::net::SocketAddr = "192.168.1.5:4000".parse().unwrap();
        let mut headers = http::HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)), "192.168.1.5");
        assert_eq!(client_ip(&headers, None), "unknown");

        headers.insert("x-real-ip", "172.16.0.9".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(peer)), "172.16.0.9");

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.7");
    }
}
