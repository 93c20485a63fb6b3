//! ID generation collaborator (spec §9 Open Questions)
//!
//! The spec's source created execution IDs from clock + RNG directly, which
//! makes deterministic replay impossible to reconstruct in tests. Every
//! subsystem here that needs an ID takes an `IdGenerator` instead of reading
//! the clock itself.

use tracing::debug;
use uuid::Uuid;

/// Collaborator that mints IDs. `prefix` is a short tag (`"task"`, `"step"`)
/// used by implementations that want human-legible IDs; it is not part of
/// any invariant.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self, prefix: &str) -> String;
}

/// Default generator: UUIDv7 IDs are timestamp-ordered, so IDs sort
/// chronologically even across processes without a central counter.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7IdGenerator;

impl IdGenerator for UuidV7IdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        let id = Uuid::now_v7();
        debug!(prefix, %id, "UuidV7IdGenerator::next_id: called");
        format!("{prefix}-{id}")
    }
}

/// Deterministic generator for replayable test fixtures: produces
/// `"{prefix}-{n}"` with a monotonically increasing counter. Not for
/// production use — two generators never coordinate a shared counter.
#[cfg(test)]
pub struct SequentialIdGenerator {
    counter: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self {
            counter: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

#[cfg(test)]
impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        format!("{prefix}-{n}")
    }
}
