//! Built-in middleware links.

use statecraft_core::middleware::{Middleware, Next, Proceeded};
use statecraft_core::reducer::Reducer;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

/// Logs every action that passes through the chain and how the reducer
/// answered it.
///
/// Register it first so its span covers the rest of the chain.
pub struct TracingMiddleware<R> {
    name: &'static str,
    _reducer: PhantomData<fn() -> R>,
}

impl<R> TracingMiddleware<R> {
    /// Create a link that tags its span with `name`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _reducer: PhantomData,
        }
    }
}

impl<R> Default for TracingMiddleware<R> {
    fn default() -> Self {
        Self::new("store")
    }
}

impl<R> std::fmt::Debug for TracingMiddleware<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingMiddleware").field("name", &self.name).finish()
    }
}

impl<R> Middleware<R> for TracingMiddleware<R>
where
    R: Reducer,
    R::Action: std::fmt::Debug,
    R::Error: std::fmt::Display,
{
    fn handle(&self, state: Arc<R::State>, action: R::Action, next: Next<'_, R>) -> Proceeded<R> {
        let span = tracing::debug_span!("dispatch", store = self.name, action = ?action);
        let _enter = span.enter();

        let start = Instant::now();
        let proceeded = next.run(state, action);
        let elapsed_us = start.elapsed().as_micros();

        match proceeded.rejection() {
            Some(error) => tracing::warn!(elapsed_us, error = %error, "Action rejected"),
            None => tracing::debug!(elapsed_us, "Action reduced"),
        }

        proceeded
    }
}
