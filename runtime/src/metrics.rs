//! Prometheus metrics for stores.
//!
//! The store records through the `metrics` facade unconditionally; nothing is
//! collected until a recorder is installed. [`MetricsExporter`] installs a
//! Prometheus recorder and renders its text exposition on demand.
//!
//! # Example
//!
//! ```rust,no_run
//! use statecraft_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // ... dispatch actions ...
//!
//! if let Some(text) = exporter.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Histogram buckets for dispatch and effect latencies, in seconds.
const LATENCY_BUCKETS: &[f64] = &[
    0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
];

/// Prometheus exporter without an HTTP listener.
///
/// Callers decide where the rendered text goes (a log line, a debug
/// endpoint, a file).
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Create an exporter that has not installed a recorder yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Build a recorder without installing it globally.
    ///
    /// Pair with [`metrics::with_local_recorder`] to scope collection to a
    /// closure.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if the bucket configuration is rejected.
    pub fn build_recorder() -> Result<PrometheusRecorder, MetricsError> {
        Ok(builder()?.build_recorder())
    }

    /// Install the Prometheus recorder as the global recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if a different recorder is already
    /// installed. A second install from this crate is logged and ignored.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        match builder()?.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this exporter did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

impl std::fmt::Debug for MetricsExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsExporter")
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

fn builder() -> Result<PrometheusBuilder, MetricsError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), LATENCY_BUCKETS)
        .map_err(|e| MetricsError::Build(e.to_string()))
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!("store_actions_applied_total", "Actions whose reduction was committed");
    describe_counter!("store_actions_rejected_total", "Actions rejected by the reducer");
    describe_counter!(
        "store_actions_refused_total",
        "Actions refused because the store was shutting down"
    );
    describe_histogram!(
        "store_dispatch_duration_seconds",
        "Time spent in the middleware chain and reducer per dispatch"
    );

    describe_counter!("store_effects_spawned_total", "Effects handed to the executor");
    describe_counter!("store_effects_feedback_total", "Actions produced by effects");
    describe_gauge!("store_effects_in_flight", "Effects currently running");

    describe_gauge!("store_subscriptions_active", "Registered subscriptions");
    describe_counter!(
        "store_subscription_notifications_total",
        "Callbacks invoked after a structural change"
    );

    describe_counter!("retry_attempts_total", "Total number of retry attempts");
    describe_counter!("retry_successes_total", "Total number of successful retries");
    describe_counter!(
        "retry_exhausted_total",
        "Total number of retry attempts that exhausted max retries"
    );
}

/// Dispatch metrics recorder.
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record a committed reduction.
    pub fn record_applied(duration: Duration) {
        counter!("store_actions_applied_total").increment(1);
        histogram!("store_dispatch_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a rejected reduction.
    pub fn record_rejected(duration: Duration) {
        counter!("store_actions_rejected_total").increment(1);
        histogram!("store_dispatch_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an action refused during shutdown.
    pub fn record_refused() {
        counter!("store_actions_refused_total").increment(1);
    }
}

/// Effect metrics recorder.
pub struct EffectMetrics;

impl EffectMetrics {
    /// Record an effect handed to the executor.
    pub fn record_spawned(kind: &'static str) {
        counter!("store_effects_spawned_total", "type" => kind).increment(1);
    }

    /// Record an action produced by an effect.
    pub fn record_feedback() {
        counter!("store_effects_feedback_total").increment(1);
    }

    /// Record the number of effects currently running.
    #[allow(clippy::cast_precision_loss)] // in-flight counts stay far below 2^52
    pub fn record_in_flight(count: usize) {
        gauge!("store_effects_in_flight").set(count as f64);
    }
}

/// Subscription metrics recorder.
pub struct SubscriptionMetrics;

impl SubscriptionMetrics {
    /// Record the number of registered subscriptions.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_active(count: usize) {
        gauge!("store_subscriptions_active").set(count as f64);
    }

    /// Record callbacks invoked after one reduction.
    pub fn record_notified(count: usize) {
        counter!("store_subscription_notifications_total").increment(count as u64);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record a successful retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}
