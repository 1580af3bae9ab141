// [libs/core/commitments/src/clock.rs]
use chrono::{DateTime, Utc};
use rand::RngCore;
use uuid::Uuid;

/// Time is read through this trait rather than `Utc::now()` directly so
/// tests can inject fixed times (§6 "Time & randomness") and so two runs
/// with identical inputs produce identical commitment state transitions
/// (§8 property 6, determinism).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test double that always reports the same instant, optionally advanced
/// between assertions within a single test.
#[derive(Debug, Clone)]
pub struct FixedClock(std::sync::Arc<std::sync::Mutex<DateTime<Utc>>>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(std::sync::Arc::new(std::sync::Mutex::new(at)))
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.0.lock().expect("FixedClock mutex poisoned");
        *guard = *guard + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("FixedClock mutex poisoned")
    }
}

/// UUIDs are v4-random 128-bit; transfer tokens are 24 random bytes
/// hex-encoded (48 chars), per §6.
pub trait IdSource: Send + Sync {
    fn new_commitment_id(&self) -> Uuid;
    fn new_transfer_token(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdSource;

impl IdSource for SystemIdSource {
    fn new_commitment_id(&self) -> Uuid {
        Uuid::new_v4()
    }

    fn new_transfer_token(&self) -> String {
        let mut bytes = [0u8; 24];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

/// Deterministic test double: commitment IDs count up from a seed, tokens
/// are derived from the same counter, so two test runs constructing the
/// same sequence of commitments get identical IDs.
#[derive(Debug)]
pub struct SequentialIdSource {
    next: std::sync::atomic::AtomicU64,
}

impl SequentialIdSource {
    pub fn starting_at(seed: u64) -> Self {
        Self {
            next: std::sync::atomic::AtomicU64::new(seed),
        }
    }
}

impl Default for SequentialIdSource {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdSource for SequentialIdSource {
    fn new_commitment_id(&self) -> Uuid {
        let value = self.next.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Uuid::from_u128(value as u128)
    }

    fn new_transfer_token(&self) -> String {
        let value = self.next.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        format!("{value:048x}")
    }
}
