use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sliding window in-memory rate limiter (pod local).
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            enabled,
        }
    }

    /// Returns true if allowed, false if limited.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled {
            return true;
        }
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() < limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Per-action limits derived from env. Posting is throttled harder than
/// commenting; likes are not limited.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub post_limit: usize,
    pub post_window: Duration,
    pub comment_limit: usize,
    pub comment_window: Duration,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        fn usize_env(name: &str, default: usize) -> usize {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
        fn dur_env(name: &str, default: u64) -> Duration {
            Duration::from_secs(
                std::env::var(name)
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default),
            )
        }
        Self {
            post_limit: usize_env("HAVEN_RL_POST_LIMIT", 5),
            post_window: dur_env("HAVEN_RL_POST_WINDOW", 300),
            comment_limit: usize_env("HAVEN_RL_COMMENT_LIMIT", 20),
            comment_window: dur_env("HAVEN_RL_COMMENT_WINDOW", 60),
        }
    }
}

/// High level guard used by handlers, keyed by the acting user id.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self {
        Self { limiter, cfg }
    }

    pub fn allow_post(&self, user_id: &str) -> bool {
        self.limiter
            .check(&format!("post:{user_id}"), self.cfg.post_limit, self.cfg.post_window)
    }

    pub fn allow_comment(&self, user_id: &str) -> bool {
        self.limiter.check(
            &format!("comment:{user_id}"),
            self.cfg.comment_limit,
            self.cfg.comment_window,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliding_window_basic() {
        let rl = InMemoryRateLimiter::new(true);
        let window = Duration::from_millis(50);
        for _ in 0..3 {
            assert!(rl.check("k", 3, window));
        }
        assert!(!rl.check("k", 3, window));
    }

    #[test]
    fn disabled_limiter_always_allows() {
        let rl = InMemoryRateLimiter::new(false);
        for _ in 0..10 {
            assert!(rl.check("k", 1, Duration::from_secs(60)));
        }
    }

    #[test]
    fn actions_use_separate_keys() {
        let cfg = RateLimitConfig {
            post_limit: 1,
            post_window: Duration::from_secs(60),
            comment_limit: 1,
            comment_window: Duration::from_secs(60),
        };
        let facade = RateLimiterFacade::new(InMemoryRateLimiter::new(true), cfg);
        assert!(facade.allow_post("u1"));
        assert!(facade.allow_comment("u1"));
        assert!(!facade.allow_post("u1"));
        assert!(facade.allow_post("u2"));
    }
}
