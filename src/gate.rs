//! Request pacing for outbound provider calls.
//!
//! Each provider (search, reader, generation) has an independent
//! [`RequestGate`] that spaces request starts at a fixed sustained rate.
//! Callers `acquire().await` a slot before sending. Waiters are served
//! in arrival order, and a caller that gives up mid-wait does not burn
//! its slot — the schedule only advances once a wait completes.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::ScryConfig;

/// Evidence that a rate slot was granted.
///
/// Pacing applies to request starts, so the permit carries no release
/// step; the holder sends exactly one request and lets it drop.
#[derive(Debug)]
#[must_use = "acquire a permit before sending the request"]
pub struct Permit(());

/// Paces request starts at a fixed sustained rate.
#[derive(Debug)]
pub struct RequestGate {
    provider: &'static str,
    interval: Duration,
    /// Earliest start time of the next request. `None` until the first
    /// acquisition. Guarded by a fair mutex so waiters queue in arrival
    /// order.
    next_free: Mutex<Option<Instant>>,
}

impl RequestGate {
    /// Gate allowing `requests_per_second` sustained request starts.
    ///
    /// Non-positive or non-finite rates disable pacing entirely.
    pub fn per_second(provider: &'static str, requests_per_second: f64) -> Self {
        let interval = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            provider,
            interval,
            next_free: Mutex::new(None),
        }
    }

    /// Gate allowing `requests_per_minute` sustained request starts.
    pub fn per_minute(provider: &'static str, requests_per_minute: u32) -> Self {
        Self::per_second(provider, f64::from(requests_per_minute) / 60.0)
    }

    /// Wait for the next free slot, then claim it.
    ///
    /// The schedule is advanced only after the wait completes: if the
    /// caller is cancelled while waiting, the slot stays available and
    /// goes to the next waiter instead.
    pub async fn acquire(&self) -> Permit {
        let mut next_free = self.next_free.lock().await;
        let now = Instant::now();
        let slot = match *next_free {
            Some(at) if at > now => at,
            _ => now,
        };
        if slot > now {
            tracing::debug!(
                provider = self.provider,
                wait_ms = (slot - now).as_millis() as u64,
                "waiting for rate slot"
            );
            tokio::time::sleep_until(slot).await;
        }
        *next_free = Some(slot + self.interval);
        Permit(())
    }

    /// Spacing between consecutive request starts.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Independent gates for the three outbound providers.
#[derive(Debug)]
pub struct ProviderGates {
    /// Search queries (SearXNG / DuckDuckGo).
    pub search: RequestGate,
    /// Document fetches (direct or reader proxy).
    pub reader: RequestGate,
    /// Generation calls.
    pub llm: RequestGate,
}

impl ProviderGates {
    /// Build gates from the configured provider rates.
    pub fn from_config(config: &ScryConfig) -> Self {
        Self {
            search: RequestGate::per_minute("search", config.search.requests_per_minute),
            reader: RequestGate::per_second("reader", config.reader.requests_per_second),
            llm: RequestGate::per_second("llm", config.llm.requests_per_second),
        }
    }
}
