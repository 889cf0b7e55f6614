//! Request identifiers and the generators that mint them.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Opaque correlation token for one rendered request.
///
/// Only used to pair a response with the request that produced it; carries no
/// ordering meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Source of fresh identifiers.
///
/// Implementations are shared behind an `Arc` and must hand out distinct ids
/// when called from several threads.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> RequestId;
}

/// Random version-4 identifiers drawn from an injected RNG.
pub struct RandomIdGenerator<R = StdRng> {
    rng: Mutex<R>,
}

impl RandomIdGenerator<StdRng> {
    /// Seeded from the operating system; outcomes are not reproducible.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Reproducible sequence for tests and replayable runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore + Send> RandomIdGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl Default for RandomIdGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + Send> IdGenerator for RandomIdGenerator<R> {
    fn next_id(&self) -> RequestId {
        let mut bytes = [0u8; 16];
        self.rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .fill_bytes(&mut bytes);
        RequestId(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}

/// Monotonic counter ids: `00000000-0000-0000-0000-000000000001`, `...002`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> RequestId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        RequestId(Uuid::from_u128(u128::from(n)))
    }
}
