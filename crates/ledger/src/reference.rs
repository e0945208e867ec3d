//! External-facing reference/document identifiers for movements.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

pub const MOVEMENT_PREFIX: &str = "MOV";
pub const DOCUMENT_PREFIX: &str = "DOC";

/// Produces identifiers of the form `<PREFIX>-<suffix>`.
pub trait ReferenceGenerator: Send + Sync {
    fn next(&self, prefix: &str) -> String;
}

/// UUIDv7 suffix: time-ordered and collision-resistant across processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidReferences;

impl ReferenceGenerator for UuidReferences {
    fn next(&self, prefix: &str) -> String {
        let suffix = Uuid::now_v7().simple().to_string().to_uppercase();
        format!("{prefix}-{suffix}")
    }
}

/// Monotonic counter suffix. Unique within one generator; deterministic for tests.
#[derive(Debug)]
pub struct SequentialReferences {
    next: AtomicU64,
}

impl SequentialReferences {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialReferences {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceGenerator for SequentialReferences {
    fn next(&self, prefix: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{n:08}")
    }
}
