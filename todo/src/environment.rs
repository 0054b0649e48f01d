//! Dependencies injected into the reducer.

use crate::error::DataSourceError;
use crate::types::TodoItem;
use futures::future::BoxFuture;
use statecraft_runtime::retry::RetryPolicy;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Where `FetchAll` loads items from
///
/// Implementations may be slow, return nothing, or fail. The reducer never
/// merges a failed fetch.
pub trait DataSource: Send + Sync {
    /// Load every item the source knows about
    fn fetch_all_items(&self) -> BoxFuture<'_, Result<Vec<TodoItem>, DataSourceError>>;
}

/// Environment for [`TodoReducer`](crate::reducer::TodoReducer)
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Source for `FetchAll`
    pub source: Arc<dyn DataSource>,
    /// How hard to try before reporting `FetchFailed`
    pub retry: RetryPolicy,
}

impl TodoEnvironment {
    /// Environment with the default retry policy
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl std::fmt::Debug for TodoEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoEnvironment")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// In-process data source
///
/// Serves a fixed list of items. Tests can add latency and queue failures
/// that are returned, one per call, before the items are served again.
#[derive(Debug)]
pub struct InMemoryDataSource {
    items: Vec<TodoItem>,
    latency: Option<Duration>,
    failures: Mutex<VecDeque<DataSourceError>>,
    calls: AtomicUsize,
}

impl InMemoryDataSource {
    /// A source serving `items`
    #[must_use]
    pub fn new(items: Vec<TodoItem>) -> Self {
        Self {
            items,
            latency: None,
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A source serving nothing
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Delay every answer by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next call with `error`
    pub fn fail_next(&self, error: DataSourceError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Number of times `fetch_all_items` has been called
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryDataSource {
    fn default() -> Self {
        Self::new(vec![TodoItem::with_id("1", "Buy Milk")])
    }
}

impl DataSource for InMemoryDataSource {
    fn fetch_all_items(&self) -> BoxFuture<'_, Result<Vec<TodoItem>, DataSourceError>> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }

            let failure = self
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            match failure {
                Some(error) => {
                    tracing::debug!(call, error = %error, "In-memory source failing");
                    Err(error)
                },
                None => {
                    tracing::debug!(call, items = self.items.len(), "In-memory source serving");
                    Ok(self.items.clone())
                },
            }
        })
    }
}
