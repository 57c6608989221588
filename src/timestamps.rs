//! `sleep_for_timestamps`: process-wide observable state that waits until
//! wall-clock time ticks past filesystem-timestamp resolution, so that a
//! just-written file's mtime can't be mistaken for "unmodified since last
//! check" by a subsequent stat (spec §9: "Global `sleep_for_timestamps`").
//!
//! Kept as a documented utility invoked at the points spec §4.4 and §4.7
//! call for it (after any WC mutation), with the actual sleep behind a
//! trait so tests never really sleep.

use std::time::Duration;

/// The granularity most local filesystems round mtimes to. One second is
/// conservative; HFS+/FAT need a full two, but this crate only needs to
/// clear *some* filesystem's granularity, not every one in existence.
pub const DEFAULT_GRANULARITY: Duration = Duration::from_millis(1100);

/// Abstracts "wait out filesystem timestamp granularity" so it can be
/// mocked in tests (spec §9: "in tests it is mockable").
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

/// The real clock: an actual sleep.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealClock;

impl Clock for RealClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A clock that records how long it was asked to sleep without actually
/// blocking; what every test in this crate uses.
#[derive(Debug, Default)]
pub struct NoopClock {
    pub slept: std::cell::RefCell<Vec<Duration>>,
}

impl Clock for NoopClock {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}

/// Wait out filesystem timestamp granularity using `clock`, for the
/// duration configured in [`crate::options::CopyOptions`]/
/// [`crate::options::MoveOptions`].
pub fn sleep_for_timestamps(clock: &dyn Clock, granularity: Duration) {
    clock.sleep(granularity);
}
