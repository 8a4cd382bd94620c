//! Durability mode for container commits.
//!
//! Defines when body writes and pointer swaps are flushed to disk.

use serde::{Deserialize, Serialize};

/// Durability mode for commits.
///
/// Every mutation writes a fresh body block and then swaps the 8-byte body
/// pointer in the container header. The mode decides whether the store
/// flushes between those two steps.
///
/// # Mode Comparison
///
/// | Mode | fsync | Crash window |
/// |------|-------|--------------|
/// | Relaxed | On close and explicit `sync` only | Recent commits may be lost or torn |
/// | Strict | After the body write and after the pointer swap | None |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurabilityMode {
    /// No forced flush on commit.
    Relaxed,

    /// Two-phase commit: flush the new body, swap the pointer, flush again.
    Strict,
}

impl DurabilityMode {
    /// Map a `.sync` level to a mode.
    ///
    /// `0` (or any negative level) is `Relaxed`; anything higher is `Strict`.
    pub fn from_level(level: i64) -> Self {
        if level > 0 {
            DurabilityMode::Strict
        } else {
            DurabilityMode::Relaxed
        }
    }

    /// Numeric `.sync` level for this mode.
    pub fn level(&self) -> i64 {
        match self {
            DurabilityMode::Relaxed => 0,
            DurabilityMode::Strict => 1,
        }
    }

    /// Check if commits fsync before returning.
    pub fn requires_fsync(&self) -> bool {
        matches!(self, DurabilityMode::Strict)
    }

    /// Human-readable description of the mode.
    pub fn description(&self) -> &'static str {
        match self {
            DurabilityMode::Relaxed => "Relaxed (no forced flush, fastest)",
            DurabilityMode::Strict => "Strict two-phase flush (safest, slowest)",
        }
    }
}

impl Default for DurabilityMode {
    fn default() -> Self {
        DurabilityMode::Strict
    }
}
