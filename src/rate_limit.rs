// fixed window per client key, sliding window when asked for.
// check does its lookup-then-mutate under the dashmap shard lock.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::ValueEnum;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::interval;
use tracing::{debug, info};

use crate::metrics::TRACKED_CLIENTS;

// swappable so tests can drive time
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// denials are rejected, never queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str) -> Decision;

    // returns how many keys were dropped
    fn sweep(&self) -> usize;

    fn tracked_keys(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LimiterKind {
    /// Counter reset at window boundaries (default)
    FixedWindow,
    /// Exact rolling window over request timestamps
    SlidingWindow,
}

/// Rate limit entry - tracks requests per client key
#[derive(Debug, Clone, Copy)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

pub struct FixedWindowLimiter {
    entries: DashMap<String, RateLimitEntry>,
    limit: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
            clock,
        }
    }

    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|e| *e)
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, key: &str) -> Decision {
        let now = self.clock.now();

        match self.entries.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(RateLimitEntry {
                    count: 1,
                    window_start: now,
                });
                Decision::Allow
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();

                // window expired..? restart it
                if now.saturating_duration_since(entry.window_start) > self.window {
                    entry.count = 1;
                    entry.window_start = now;
                    return Decision::Allow;
                }

                if entry.count >= self.limit {
                    return Decision::Deny;
                }

                entry.count += 1;
                Decision::Allow
            }
        }
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.window_start) <= self.window);
        before.saturating_sub(self.entries.len())
    }

    fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

// keeps a timestamp per accepted request inside the window
pub struct SlidingWindowLimiter {
    entries: DashMap<String, VecDeque<Instant>>,
    limit: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
            clock,
        }
    }

    fn prune(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while log
            .front()
            .is_some_and(|&t| now.saturating_duration_since(t) >= window)
        {
            log.pop_front();
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, key: &str) -> Decision {
        let now = self.clock.now();
        let mut log = self.entries.entry(key.to_string()).or_default();

        Self::prune(&mut log, now, self.window);

        if log.len() >= self.limit as usize {
            return Decision::Deny;
        }

        log.push_back(now);
        Decision::Allow
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, log| {
            Self::prune(log, now, self.window);
            !log.is_empty()
        });
        before.saturating_sub(self.entries.len())
    }

    fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

pub fn build_limiter(
    kind: LimiterKind,
    limit: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
) -> Arc<dyn RateLimiter> {
    match kind {
        LimiterKind::FixedWindow => Arc::new(FixedWindowLimiter::new(limit, window, clock)),
        LimiterKind::SlidingWindow => Arc::new(SlidingWindowLimiter::new(limit, window, clock)),
    }
}

// drop expired entries so the map stays bounded
pub async fn sweeper(limiter: Arc<dyn RateLimiter>, every: Duration) {
    let mut interval = interval(every);

    info!(interval = ?every, "Rate limit sweeper started");

    loop {
        interval.tick().await;

        let removed = limiter.sweep();
        let tracked = limiter.tracked_keys();
        TRACKED_CLIENTS.set(tracked as f64);

        if removed > 0 {
            debug!(removed, tracked, "Swept expired rate limit entries");
        }
    }
}
