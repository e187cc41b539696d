//! Connection pool data models.

use serde::Serialize;

/// Snapshot of a provider's pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    /// Connections currently open, idle or in use.
    pub size: u32,
    pub idle: usize,
    /// Configured connection limit.
    pub max: u32,
    pub closed: bool,
}

impl PoolStatus {
    /// Connections currently checked out by callers.
    pub fn in_use(&self) -> usize {
        (self.size as usize).saturating_sub(self.idle)
    }

    /// Every allowed connection is open and checked out.
    pub fn is_saturated(&self) -> bool {
        self.size >= self.max && self.idle == 0
    }
}
