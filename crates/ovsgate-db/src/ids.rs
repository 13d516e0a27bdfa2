//! Request identifier generation.

use std::sync::atomic::{AtomicU32, Ordering};

/// Monotonic generator for wire request identifiers.
///
/// Each logical client seeds its generator into a distinct range (component
/// id times a fixed multiplier) so concurrent clients of the same database
/// are unlikely to collide. There is no central allocator, so this is a
/// collision-avoidance heuristic, not a guarantee; within one client the
/// ids are strictly unique until the counter wraps.
#[derive(Debug)]
pub struct RequestIdGenerator {
    next: AtomicU32,
}

impl RequestIdGenerator {
    /// Builds a generator whose first issued id is `seed + 1`.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self {
            next: AtomicU32::new(seed),
        }
    }

    /// Issues the next identifier.
    #[must_use]
    pub fn next_id(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}
