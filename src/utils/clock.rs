//! Time source abstraction so backup names can be generated deterministically in tests

use chrono::{Local, NaiveDateTime};

pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Mock clocks for tests
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use chrono::Duration;
    use std::sync::Mutex;

    /// Clock that starts at a fixed time and advances by a step on every read
    pub struct SteppingClock {
        next: Mutex<NaiveDateTime>,
        step: Duration,
    }

    impl SteppingClock {
        pub fn new(start: NaiveDateTime, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }

        /// A clock that always returns the same instant
        pub fn fixed(at: NaiveDateTime) -> Self {
            Self::new(at, Duration::zero())
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> NaiveDateTime {
            let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
            let current = *next;
            *next = current + self.step;
            current
        }
    }
}
