//! # Statecraft Testing
//!
//! Testing utilities and helpers for the Statecraft architecture.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for reducers, including rejections
//! - [`Recorder`]: a subscription callback that remembers what it was given
//! - [`init_test_tracing`]: a `tracing` subscriber that writes through the test harness
//!
//! ## Example
//!
//! ```ignore
//! use statecraft_testing::{Recorder, init_test_tracing};
//!
//! #[tokio::test]
//! async fn counts_follow_toggles() {
//!     init_test_tracing();
//!     let store = open_store(test_environment(), StoreConfig::default()).await?;
//!     let counts = Recorder::new();
//!     let _sub = store.subscribe(incomplete_count, counts.callback());
//!
//!     store.send(TodoAction::add("Buy milk")).await?;
//!     assert_eq!(counts.values(), vec![1]);
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};


pub use reducer_test::{assertions, ReducerTest};

/// Install a `tracing` subscriber for tests.
///
/// Honors `RUST_LOG` and defaults to `warn`. Output goes through the test
/// writer so it is captured per test. Safe to call from every test.
pub fn init_test_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// Records every value passed to its callbacks, in order.
///
/// Clones share the same log.
#[derive(Debug)]
pub struct Recorder<T> {
    seen: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            seen: Arc::clone(&self.seen),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Recorder<T> {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of values recorded
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<T>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + Send + 'static> Recorder<T> {
    /// A callback that appends each value it receives
    pub fn callback(&self) -> impl Fn(&T) + Send + 'static {
        let seen = Arc::clone(&self.seen);
        move |value: &T| {
            seen.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(value.clone());
        }
    }

    /// Everything recorded so far
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.lock().clone()
    }

    /// The most recent value
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.lock().last().cloned()
    }
}
