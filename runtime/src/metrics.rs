//! Prometheus metrics for the procurement runtime.
//!
//! Metric families:
//! - Reducer execution and effect handling (recorded by the [`Store`](crate::Store))
//! - Lifecycle transitions, guard failures and store conflicts
//! - Timeline reconstructions
//! - Retries
//!
//! Recording is always cheap: without an installed recorder every call is a
//! no-op, so libraries and tests never need to install one.
//!
//! # Example
//!
//! ```rust,no_run
//! use kimbo_runtime::metrics::{MetricsRecorder, TransitionMetrics};
//!
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//! TransitionMetrics::record_applied("submitted");
//! println!("{}", recorder.render().unwrap_or_default());
//! # Ok::<(), kimbo_runtime::metrics::MetricsError>(())
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
}

/// Process-wide Prometheus recorder.
///
/// Renders the current metric values in the Prometheus text format. There is
/// no HTTP listener; the host application decides how to expose the output.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe every metric and install the Prometheus recorder globally.
    ///
    /// Installing twice in one process is tolerated: the second call logs a
    /// warning and leaves this recorder without a render handle.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if the histogram buckets are rejected.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        describe_metrics();

        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build_recorder();
        let handle = recorder.handle();

        match metrics::set_global_recorder(recorder) {
            Ok(()) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
            },
            Err(_) => {
                tracing::warn!("Metrics recorder already installed, skipping");
            },
        }
        Ok(())
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this recorder was not the one installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn describe_metrics() {
    describe_counter!(
        "reducer_actions_processed_total",
        "Total number of actions processed by reducers"
    );
    describe_histogram!(
        "reducer_execution_duration_seconds",
        "Time taken to execute reducers"
    );
    describe_counter!("effects_executed_total", "Total number of effects executed");
    describe_histogram!(
        "effect_execution_duration_seconds",
        "Time taken to execute effects"
    );

    describe_counter!(
        "procurement_transitions_applied_total",
        "Transitions persisted, labelled by target status"
    );
    describe_counter!(
        "procurement_guard_failures_total",
        "Transitions refused by the lifecycle guard, labelled by reason"
    );
    describe_counter!(
        "procurement_store_conflicts_total",
        "Writes refused because the request version was stale"
    );
    describe_counter!(
        "procurement_timelines_built_total",
        "Timeline reconstructions"
    );
    describe_histogram!(
        "procurement_timeline_events",
        "Number of events per reconstructed timeline"
    );

    describe_counter!("retry_attempts_total", "Total number of attempts under a retry policy");
    describe_counter!("retry_successes_total", "Operations that succeeded after retrying");
    describe_counter!(
        "retry_exhausted_total",
        "Operations that failed after exhausting their retries"
    );
}

/// Reducer metrics recorder.
pub struct ReducerMetrics;

impl ReducerMetrics {
    /// Record an action processed.
    pub fn record_action(duration: Duration) {
        counter!("reducer_actions_processed_total").increment(1);
        histogram!("reducer_execution_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Effect metrics recorder.
pub struct EffectMetrics;

impl EffectMetrics {
    /// Record an effect execution.
    pub fn record_execution(duration: Duration) {
        counter!("effects_executed_total").increment(1);
        histogram!("effect_execution_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Lifecycle transition metrics recorder.
pub struct TransitionMetrics;

impl TransitionMetrics {
    /// Record a persisted transition into `target`.
    pub fn record_applied(target: &'static str) {
        counter!("procurement_transitions_applied_total", "target" => target).increment(1);
    }

    /// Record a transition refused by the guard.
    pub fn record_guard_failure(reason: &'static str) {
        counter!("procurement_guard_failures_total", "reason" => reason).increment(1);
    }

    /// Record a stale-version write.
    pub fn record_conflict() {
        counter!("procurement_store_conflicts_total").increment(1);
    }

    /// Record a timeline reconstruction producing `events` entries.
    #[allow(clippy::cast_precision_loss)] // event counts are tiny
    pub fn record_timeline(events: usize) {
        counter!("procurement_timelines_built_total").increment(1);
        histogram!("procurement_timeline_events").record(events as f64);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record an attempt made under a retry policy.
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
