//! Common test utilities for integration tests.

pub mod fixtures;

use std::time::Duration;

use scenelock::resilience::RetryConfig;

// Re-export common types
pub use fixtures::*;

/// Test error type
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

/// Retry policy short enough for paused-clock tests.
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        delay: Duration::from_millis(10),
    }
}

/// Test concurrency utilities
pub mod concurrency {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counter for tracking concurrent critical sections
    #[derive(Clone)]
    pub struct ConcurrencyTracker {
        current: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        total: Arc<AtomicUsize>,
    }

    impl ConcurrencyTracker {
        pub fn new() -> Self {
            Self {
                current: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
                total: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn enter(&self) -> ConcurrencyGuard {
            let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            self.total.fetch_add(1, Ordering::SeqCst);
            ConcurrencyGuard {
                tracker: self.clone(),
            }
        }

        pub fn current(&self) -> usize {
            self.current.load(Ordering::SeqCst)
        }

        pub fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }

        pub fn total(&self) -> usize {
            self.total.load(Ordering::SeqCst)
        }
    }

    impl Default for ConcurrencyTracker {
        fn default() -> Self {
            Self::new()
        }
    }

    pub struct ConcurrencyGuard {
        tracker: ConcurrencyTracker,
    }

    impl Drop for ConcurrencyGuard {
        fn drop(&mut self) {
            self.tracker.current.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
