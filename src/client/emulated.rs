//! Latency-emulating test double.

use super::{ClientError, PromptClient};
use crate::types::RequestId;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_MIN_DELAY_MS: u64 = 50;
pub const DEFAULT_MAX_DELAY_MS: u64 = 1000;

/// Delay range for [`EmulatedClient`], in milliseconds, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulatedClientConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for EmulatedClientConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl EmulatedClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay_range(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_delay_ms = min_ms;
        self.max_delay_ms = max_ms;
        self
    }

    /// Defaults, overridden by env when set:
    /// - `PROMPT_FANOUT_EMULATED_MIN_DELAY_MS`
    /// - `PROMPT_FANOUT_EMULATED_MAX_DELAY_MS`
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok());
        let defaults = Self::default();
        Self {
            min_delay_ms: read("PROMPT_FANOUT_EMULATED_MIN_DELAY_MS")
                .unwrap_or(defaults.min_delay_ms),
            max_delay_ms: read("PROMPT_FANOUT_EMULATED_MAX_DELAY_MS")
                .unwrap_or(defaults.max_delay_ms),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(Error::configuration(
                "minimum delay exceeds maximum delay",
                ErrorContext::new("emulated_client")
                    .key("min_delay_ms")
                    .details(format!(
                        "min_delay_ms={}, max_delay_ms={}",
                        self.min_delay_ms, self.max_delay_ms
                    )),
            ));
        }
        Ok(())
    }
}

/// Simulates a variable-latency backend.
///
/// Each call draws a delay uniformly from the configured range, sleeps that
/// many milliseconds, then answers with a random alphanumeric string exactly
/// `delay` characters long. The request text only shows up in logs, and the
/// call never fails.
///
/// The RNG is injected; seed it for reproducible delays and payloads.
pub struct EmulatedClient<R = StdRng> {
    config: EmulatedClientConfig,
    rng: Mutex<R>,
    calls: AtomicU64,
}

impl EmulatedClient<StdRng> {
    /// Default delay range, RNG seeded from the operating system.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for EmulatedClient<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + Send> EmulatedClient<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            config: EmulatedClientConfig::default(),
            rng: Mutex::new(rng),
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_config(mut self, config: EmulatedClientConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &EmulatedClientConfig {
        &self.config
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    // Delay first, payload second; the lock is released before any sleep.
    fn draw(&self) -> (u64, String) {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let delay_ms = rng.random_range(self.config.min_delay_ms..=self.config.max_delay_ms);
        let body = (&mut *rng)
            .sample_iter(Alphanumeric)
            .take(delay_ms as usize)
            .map(char::from)
            .collect();
        (delay_ms, body)
    }
}

#[async_trait]
impl<R: RngCore + Send> PromptClient for EmulatedClient<R> {
    async fn send_request(&self, id: RequestId, text: &str) -> std::result::Result<String, ClientError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let (delay_ms, body) = self.draw();
        debug!(%id, delay_ms, prompt_chars = text.chars().count(), "emulated request started");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        debug!(%id, delay_ms, "emulated request done");
        Ok(body)
    }

    fn name(&self) -> &'static str {
        "emulated"
    }
}
