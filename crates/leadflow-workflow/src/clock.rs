//! Wall-clock source for edit-time checks

use chrono::NaiveDateTime;

/// Local wall clock
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current local date and time
    fn now(&self) -> NaiveDateTime;
}

/// The machine's local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
