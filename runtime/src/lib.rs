//! # Statecraft Runtime
//!
//! Runtime implementation for the Statecraft architecture.
//!
//! This crate provides the [`Store`]: the single authoritative holder of a
//! state snapshot, which runs every action through a middleware chain and a
//! reducer, notifies selector subscriptions, and executes the effects the
//! reducer describes.
//!
//! ## Core Components
//!
//! - **Store**: Serializes dispatches and publishes immutable snapshots
//! - **Middleware**: Interceptors registered on the [`StoreBuilder`]
//! - **Subscriptions**: Selector-gated callbacks fired after each commit
//! - **Effect Executor**: Runs effect descriptions and feeds actions back
//!
//! ## Example
//!
//! ```ignore
//! use statecraft_runtime::{Store, middleware::TracingMiddleware};
//!
//! let store = Store::builder(TodoState::default(), TodoReducer, environment)
//!     .middleware(TracingMiddleware::new("todo"))
//!     .init_action(TodoAction::FetchAll)
//!     .build()
//!     .await?;
//!
//! let _sub = store.subscribe(incomplete_count, |count| println!("{count} left"));
//! store.send(TodoAction::add("Buy milk")).await?;
//!
//! let items = store.state(|s| s.items.len());
//! ```

use statecraft_core::{effect::Effect, middleware::Middleware, reducer::Reducer};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::watch;

/// Retry logic with exponential backoff
pub mod retry;

/// Prometheus metrics for observability
pub mod metrics;

/// Built-in middleware links
pub mod middleware;

/// Selector subscriptions
pub mod subscription;

pub use subscription::Subscription;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    ///
    /// `E` is the reducer's rejection type.
    #[derive(Error, Debug)]
    pub enum StoreError<E> {
        /// The reducer rejected the action; state is unchanged
        #[error("Action rejected: {0}")]
        Rejected(E),

        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a feedback action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }

    impl<E> StoreError<E> {
        /// The reducer's rejection, if that is what this error is
        #[must_use]
        pub const fn rejection(&self) -> Option<&E> {
            match self {
                Self::Rejected(error) => Some(error),
                _ => None,
            }
        }

        /// Take the reducer's rejection, if that is what this error is
        #[must_use]
        pub fn into_rejection(self) -> Option<E> {
            match self {
                Self::Rejected(error) => Some(error),
                _ => None,
            }
        }
    }
}

pub use error::StoreError;

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use statecraft_runtime::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(256)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.broadcast_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the channel that carries actions produced by effects
    pub broadcast_capacity: usize,
    /// Timeout used by [`Store::close`]
    pub shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects of one
/// action. An effect counts as complete once any action it produced has been
/// dispatched back into the store.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(TodoAction::FetchAll).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // The fetched items are now in state
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };
        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    ///
    /// Useful for initialization in loops where you need a `last_handle`.
    #[must_use]
    pub fn completed() -> Self {
        Self::new().0
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`tokio::time::error::Elapsed`] if the timeout expires before
    /// all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), tokio::time::error::Elapsed> {
        tokio::time::timeout(timeout, self.wait()).await
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Internal: completion counter shared by the effects of one action
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Ensures the effect counter is always decremented, even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements the store-wide in-flight counter on drop
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        let in_flight = counter.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::EffectMetrics::record_in_flight(in_flight);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let in_flight = self.0.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::EffectMetrics::record_in_flight(in_flight);
    }
}

/// Store runtime for coordinating middleware, reducer, subscriptions and effects.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicU64, AtomicUsize, DecrementGuard, Duration, Effect, EffectHandle,
        EffectTracking, InFlightGuard, Middleware, OnceLock, Ordering, Reducer, StoreConfig,
        StoreError,
    };
    use crate::metrics::{DispatchMetrics, EffectMetrics};
    use crate::subscription::{Registry, Subscription};
    use statecraft_core::middleware::{dispatch_through, Outcome};
    use statecraft_core::selector::Selector;
    use tokio::sync::{broadcast, watch, Mutex};

    /// The Store - single authoritative state holder
    ///
    /// The Store manages:
    /// 1. State (an immutable `Arc` snapshot, replaced on every commit)
    /// 2. The middleware chain and the reducer
    /// 3. Environment (injected dependencies)
    /// 4. Selector subscriptions
    /// 5. Effect execution (with feedback loop)
    ///
    /// Dispatches are serialized through a FIFO gate, so reductions apply
    /// one at a time in the order `send` calls reached the gate. Effects run
    /// after the gate is released and never block unrelated actions.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<watch::Sender<Arc<S>>>,
        reducer: R,
        environment: E,
        middleware: Arc<[Arc<dyn Middleware<R>>]>,
        gate: Arc<Mutex<()>>,
        sequence: Arc<AtomicU64>,
        subscribers: Arc<Registry<S>>,
        config: StoreConfig,
        init: Arc<OnceLock<Box<[EffectHandle]>>>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Actions produced by effects, for observers and `send_and_wait_for`.
        action_broadcast: broadcast::Sender<A>,
    }

    /// Builder for a [`Store`]
    ///
    /// Middleware can only be registered here; once built, the chain is
    /// fixed for the lifetime of the store.
    pub struct StoreBuilder<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        initial_state: S,
        reducer: R,
        environment: E,
        middleware: Vec<Arc<dyn Middleware<R>>>,
        init_actions: Vec<A>,
        config: StoreConfig,
    }

    impl<S, A, E, R> StoreBuilder<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        R::Error: std::fmt::Display + Send + 'static,
        S: Clone + Send + Sync + 'static,
        A: Clone + Send + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Append a link to the middleware chain
        ///
        /// Links run in registration order; the last one registered is
        /// closest to the reducer.
        #[must_use]
        pub fn middleware(mut self, link: impl Middleware<R> + 'static) -> Self {
            self.middleware.push(Arc::new(link));
            self
        }

        /// Append an already shared link to the middleware chain
        #[must_use]
        pub fn shared_middleware(mut self, link: Arc<dyn Middleware<R>>) -> Self {
            self.middleware.push(link);
            self
        }

        /// Dispatch `action` once while building, before the store is
        /// returned to any caller
        #[must_use]
        pub fn init_action(mut self, action: A) -> Self {
            self.init_actions.push(action);
            self
        }

        /// Replace the configuration
        #[must_use]
        pub fn config(mut self, config: StoreConfig) -> Self {
            self.config = config;
            self
        }

        /// Build the store and run its init actions
        ///
        /// # Errors
        ///
        /// Returns the first init action's error if the reducer rejects it.
        pub async fn build(self) -> Result<Store<S, A, E, R>, StoreError<R::Error>> {
            let (action_broadcast, _) = broadcast::channel(self.config.broadcast_capacity.max(1));
            let (state, _) = watch::channel(Arc::new(self.initial_state));

            let store = Store {
                state: Arc::new(state),
                reducer: self.reducer,
                environment: self.environment,
                middleware: self.middleware.into(),
                gate: Arc::new(Mutex::new(())),
                sequence: Arc::new(AtomicU64::new(0)),
                subscribers: Arc::new(Registry::new()),
                config: self.config,
                init: Arc::new(OnceLock::new()),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            };

            let mut handles = Vec::with_capacity(self.init_actions.len());
            for action in self.init_actions {
                handles.push(store.send(action).await?);
            }
            tracing::debug!(
                links = store.middleware.len(),
                init_actions = handles.len(),
                "Store built"
            );
            let _ = store.init.set(handles.into_boxed_slice());

            Ok(store)
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        R::Error: std::fmt::Display + Send + 'static,
        S: Clone + Send + Sync + 'static,
        A: Clone + Send + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Start building a store
        #[must_use]
        pub fn builder(initial_state: S, reducer: R, environment: E) -> StoreBuilder<S, A, E, R> {
            StoreBuilder {
                initial_state,
                reducer,
                environment,
                middleware: Vec::new(),
                init_actions: Vec::new(),
                config: StoreConfig::default(),
            }
        }

        /// Build a store with no middleware, no init actions and default
        /// configuration
        ///
        /// # Errors
        ///
        /// Infallible in practice: there are no init actions to reject.
        pub async fn new(initial_state: S, reducer: R, environment: E) -> Result<Self, StoreError<R::Error>> {
            Self::builder(initial_state, reducer, environment).build().await
        }

        /// The current snapshot
        ///
        /// The snapshot stays valid (and unchanged) for as long as the caller
        /// holds it, whatever is dispatched afterwards.
        #[must_use]
        pub fn snapshot(&self) -> Arc<S> {
            Arc::clone(&self.state.borrow())
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let open = store.state(|s| s.items.iter().filter(|i| !i.done).count());
        /// ```
        pub fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            f(&self.snapshot())
        }

        /// Evaluate `selector` against the current snapshot
        pub fn select<Sel: Selector<S>>(&self, selector: &Sel) -> Sel::Output {
            selector.select(&self.snapshot())
        }

        /// Number of reductions committed so far
        #[must_use]
        pub fn sequence(&self) -> u64 {
            self.sequence.load(Ordering::SeqCst)
        }

        /// Receiver that yields every committed snapshot, for async observers
        #[must_use]
        pub fn observe(&self) -> watch::Receiver<Arc<S>> {
            self.state.subscribe()
        }

        /// Register `callback` for changes of `selector`'s output
        ///
        /// The callback runs synchronously after each committed reduction
        /// whose snapshot yields an output different from the previous one.
        /// It is not called for the value current at registration time.
        ///
        /// Callbacks must not block. To dispatch in response, spawn the
        /// dispatch:
        ///
        /// ```ignore
        /// let store2 = store.clone();
        /// let _sub = store.subscribe(incomplete_count, move |&left| {
        ///     if left == 0 {
        ///         let store = store2.clone();
        ///         tokio::spawn(async move { store.send(TodoAction::FetchAll).await });
        ///     }
        /// });
        /// ```
        pub fn subscribe<Sel, F>(&self, selector: Sel, callback: F) -> Subscription
        where
            Sel: Selector<S>,
            F: Fn(&Sel::Output) + Send + 'static,
        {
            self.subscribers.attach(selector, callback, || self.snapshot())
        }

        /// Number of live subscriptions
        #[must_use]
        pub fn subscriber_count(&self) -> usize {
            self.subscribers.len()
        }

        /// Wait for the effects of the init actions to complete
        pub async fn ready(&self) {
            if let Some(handles) = self.init.get() {
                for handle in handles.iter() {
                    handle.clone().wait().await;
                }
            }
        }

        /// Initiate graceful shutdown
        ///
        /// New actions are refused with [`StoreError::ShutdownInProgress`];
        /// in-flight effects are given until `timeout` to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError<R::Error>> {
            tracing::info!("Initiating graceful shutdown");
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout");
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Waiting for effects to complete"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Shut down using the configured timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn close(&self) -> Result<(), StoreError<R::Error>> {
            self.shutdown(self.config.shutdown_timeout).await
        }

        /// Whether shutdown has begun
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Send an action to the store
        ///
        /// 1. Waits its turn at the dispatch gate
        /// 2. Runs the middleware chain, ending in the reducer, against a
        ///    private copy of the current snapshot
        /// 3. On success, publishes the new snapshot and notifies subscribers
        /// 4. Releases the gate, then starts the returned effects
        ///
        /// # Returns
        ///
        /// An [`EffectHandle`] that can be used to wait for effect completion.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Rejected`]: the reducer refused the action; state is unchanged
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        ///
        /// # Panics
        ///
        /// If the reducer or a middleware link panics, the panic propagates to
        /// the caller and nothing is committed.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError<R::Error>> {
            let (handle, _) = self.send_internal(action).await?;
            Ok(handle)
        }

        /// Send an action and wait for a matching action produced by its effects
        ///
        /// Subscribes to the action broadcast before sending, so a fast
        /// effect cannot slip past. When this returns, the matching action
        /// has already been dispatched.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Rejected`]: the initial action was rejected
        /// - [`StoreError::Timeout`]: timeout expired before a matching action was received
        /// - [`StoreError::ChannelClosed`]: the action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError<R::Error>>
        where
            F: Fn(&A) -> bool,
        {
            self.send_and_correlate(action, |_| predicate, timeout).await
        }

        /// Send an action, then wait for feedback picked out by the state it produced
        ///
        /// `correlate` sees the snapshot committed by `action` (or the
        /// untouched snapshot, if a middleware link short-circuited) and
        /// returns the predicate to wait with. Use it when the reducer
        /// assigns something, like a request id, that the feedback echoes.
        ///
        /// # Errors
        ///
        /// Same as [`Store::send_and_wait_for`].
        pub async fn send_and_correlate<C, F>(
            &self,
            action: A,
            correlate: C,
            timeout: Duration,
        ) -> Result<A, StoreError<R::Error>>
        where
            C: FnOnce(&S) -> F,
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            let (_, committed) = self.send_internal(action).await?;
            let predicate = correlate(&committed);

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to all actions produced by effects
        ///
        /// Each action is broadcast after it has been dispatched, whether or
        /// not the reducer accepted it. Actions passed to `send` directly are
        /// not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        async fn send_internal(&self, action: A) -> Result<(EffectHandle, Arc<S>), StoreError<R::Error>> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Refused action: store is shutting down");
                DispatchMetrics::record_refused();
                return Err(StoreError::ShutdownInProgress);
            }

            let (handle, tracking) = EffectHandle::new();

            let (effects, snapshot) = {
                let _gate = self.gate.lock().await;
                tracing::trace!("Acquired dispatch gate");

                let current = self.snapshot();
                let start = std::time::Instant::now();
                let mut committed = None;

                let outcome = {
                    let reducer = &self.reducer;
                    let environment = &self.environment;
                    let mut terminal = |snapshot: Arc<S>, action: A| -> Outcome<R> {
                        let mut next = S::clone(&snapshot);
                        let effects = reducer.reduce(&mut next, action, environment)?;
                        committed = Some(next);
                        Ok(effects)
                    };
                    dispatch_through(&self.middleware, Arc::clone(&current), action, &mut terminal)
                };
                let elapsed = start.elapsed();

                match outcome {
                    Err(error) => {
                        tracing::debug!("Reducer rejected action, state unchanged");
                        DispatchMetrics::record_rejected(elapsed);
                        return Err(StoreError::Rejected(error));
                    },
                    Ok(effects) => match committed {
                        Some(next) => {
                            let next = Arc::new(next);
                            self.state.send_replace(Arc::clone(&next));
                            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                            DispatchMetrics::record_applied(elapsed);
                            tracing::trace!(sequence, effects = effects.len(), "Committed snapshot");
                            self.subscribers.notify(&next);
                            (effects, next)
                        },
                        None => (effects, current),
                    },
                }
            };

            for effect in effects {
                self.execute_effect_internal(effect, tracking.clone());
            }

            Ok((handle, snapshot))
        }

        /// Dispatch an action produced by an effect, then broadcast it
        ///
        /// Observers receive the action only after its reduction finished,
        /// so state they read in response already reflects it.
        async fn feed_back(&self, action: A) {
            EffectMetrics::record_feedback();

            if let Err(error) = self.send(action.clone()).await {
                tracing::warn!(error = %error, "Action produced by effect was not applied");
            }
            let _ = self.action_broadcast.send(action);
        }

        /// Execute an effect with tracking
        ///
        /// Uses [`DecrementGuard`] so the effect counter is always
        /// decremented, even if the effect panics.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned into spawned tasks
        fn execute_effect_internal(&self, effect: Effect<A>, tracking: EffectTracking) {
            EffectMetrics::record_spawned(effect.kind());

            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    tracking.increment();
                    let in_flight = InFlightGuard::enter(&self.pending_effects);
                    let guard = DecrementGuard(tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        let _in_flight = in_flight;

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.feed_back(action).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!(?duration, "Executing Effect::Delay");
                    tracking.increment();
                    let in_flight = InFlightGuard::enter(&self.pending_effects);
                    let guard = DecrementGuard(tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        let _in_flight = in_flight;

                        tokio::time::sleep(duration).await;
                        store.feed_back(*action).await;
                    });
                },
                Effect::Parallel(effects) => {
                    tracing::trace!(count = effects.len(), "Executing Effect::Parallel");
                    for effect in effects {
                        self.execute_effect_internal(effect, tracking.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    let effect_count = effects.len();
                    tracing::trace!(count = effect_count, "Executing Effect::Sequential");
                    tracking.increment();
                    let in_flight = InFlightGuard::enter(&self.pending_effects);
                    let guard = DecrementGuard(tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        let _in_flight = in_flight;

                        for (idx, effect) in effects.into_iter().enumerate() {
                            tracing::trace!(step = idx + 1, of = effect_count, "Sequential step");
                            let (mut step, step_tracking) = EffectHandle::new();
                            store.execute_effect_internal(effect, step_tracking);
                            step.wait().await;
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                middleware: Arc::clone(&self.middleware),
                gate: Arc::clone(&self.gate),
                sequence: Arc::clone(&self.sequence),
                subscribers: Arc::clone(&self.subscribers),
                config: self.config.clone(),
                init: Arc::clone(&self.init),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }

    impl<S, A, E, R> std::fmt::Debug for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Store")
                .field("sequence", &self.sequence.load(Ordering::SeqCst))
                .field("links", &self.middleware.len())
                .field("pending_effects", &self.pending_effects.load(Ordering::SeqCst))
                .finish_non_exhaustive()
        }
    }
}

pub use store::{Store, StoreBuilder};
