use jiff::Zoned;

/// Source of "now" for record timestamps and same-day statistics.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time of the clock, in the clock's time zone.
    fn now(&self) -> Zoned;
}

/// Reads the system clock in the system time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Zoned {
        Zoned::now()
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-util"))]
mod manual {
    use super::Clock;
    use jiff::{SignedDuration, Zoned};
    use std::sync::{Arc, Mutex};

    /// A clock that only moves when told to.
    ///
    /// Available with the `test-util` feature.
    ///
    /// Clones share the same underlying instant.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        inner: Arc<Mutex<Zoned>>,
    }

    impl ManualClock {
        pub fn new(now: Zoned) -> Self {
            Self {
                inner: Arc::new(Mutex::new(now)),
            }
        }

        pub fn set(&self, now: Zoned) {
            let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            *guard = now;
        }

        /// Moves the clock forward (or backward, for a negative duration).
        pub fn advance(&self, by: SignedDuration) {
            let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let next = guard.timestamp() + by;
            *guard = next.to_zoned(guard.time_zone().clone());
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Zoned {
            self.inner
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        }
    }
}
