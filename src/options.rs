//! Caller-configurable knobs for the public entry points (§6.1).
//!
//! This is not a file-based configuration layer; the copy/move core is a
//! library subsystem consumed in-process, not an application. But the
//! two behavioral flags spec.md exposes at the API boundary, plus the one
//! crate-level tunable the teacher's C source hardcodes (the filesystem-
//! timestamp sleep granularity), are collected here so callers and tests
//! don't thread four booleans through every function signature.

use std::time::Duration;

/// Options for [`crate::copy`].
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// If the destination already exists and this is set, retry once
    /// treating the destination as the parent directory for a single
    /// source (§4.8 "Retry-as-child").
    pub copy_as_child: bool,
    /// How long to wait out filesystem timestamp granularity after a WC
    /// mutation (§9). Tests should override this to something a
    /// [`crate::timestamps::NoopClock`] can record instantly.
    pub timestamp_granularity: Duration,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            copy_as_child: false,
            timestamp_granularity: crate::timestamps::DEFAULT_GRANULARITY,
        }
    }
}

/// Options for [`crate::move_`].
#[derive(Debug, Clone)]
pub struct MoveOptions {
    pub move_as_child: bool,
    /// Bypasses the local-modification check in the WC delete (§6.1).
    pub force: bool,
    pub timestamp_granularity: Duration,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            move_as_child: false,
            force: false,
            timestamp_granularity: crate::timestamps::DEFAULT_GRANULARITY,
        }
    }
}
