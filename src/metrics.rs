//! Server metrics
//!
//! Thin recording helpers over the `metrics` facade. Without an installed
//! recorder every call is a no-op; the `prometheus` feature installs one.
//!
//! # Metrics
//!
//! - `auth_attempts_total`: Counter of authentication attempts by scheme and outcome
//! - `delegation_outcomes_total`: Counter of sync-delegation resolutions by outcome
//! - `delegation_duration_seconds`: Histogram of sync-delegation wall time by method
//! - `stream_connections_active`: Gauge of currently open SSE streams
//! - `oauth_exchanges_total`: Counter of authorization-code exchanges by outcome
//!
//! # Examples
//!
//! ```
//! use ado_mcp::metrics::{record_auth_attempt, StreamConnectionMetrics};
//!
//! record_auth_attempt("credential-token", "success");
//! let stream = StreamConnectionMetrics::new();
//! stream.record_closed("explicit");
//! ```

use metrics::{decrement_gauge, histogram, increment_counter, increment_gauge};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Records one authentication attempt.
///
/// # Arguments
///
/// * `scheme` - `"credential-token"`, `"federated-token"`, or `"none"`
/// * `outcome` - `"success"`, `"rejected"`, `"unreachable"`, or a failure code
pub fn record_auth_attempt(scheme: &str, outcome: &str) {
    increment_counter!(
        "auth_attempts_total",
        "scheme" => scheme.to_string(),
        "outcome" => outcome.to_string()
    );
}

/// Records one authorization-code exchange.
pub fn record_oauth_exchange(outcome: &str) {
    increment_counter!("oauth_exchanges_total", "outcome" => outcome.to_string());
}

/// Timing for a single sync delegation
///
/// Created when delegation starts; [`DelegationMetrics::record_outcome`]
/// records the resolution and the elapsed time.
#[derive(Debug)]
pub struct DelegationMetrics {
    method: String,
    start: Instant,
}

impl DelegationMetrics {
    /// Starts timing a delegation for `method`.
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            start: Instant::now(),
        }
    }

    /// Records how the delegation resolved.
    ///
    /// # Arguments
    ///
    /// * `outcome` - `"response"`, `"error"`, `"no_response"`, `"empty"`, or `"timeout"`
    pub fn record_outcome(&self, outcome: &str) {
        histogram!(
            "delegation_duration_seconds",
            self.start.elapsed().as_secs_f64(),
            "method" => self.method.clone()
        );
        increment_counter!("delegation_outcomes_total", "outcome" => outcome.to_string());
    }
}

/// Tracks one open SSE stream in the `stream_connections_active` gauge
///
/// The gauge is incremented on creation and decremented exactly once, either
/// by [`StreamConnectionMetrics::record_closed`] or on drop.
#[derive(Debug)]
pub struct StreamConnectionMetrics {
    recorded: AtomicBool,
}

impl StreamConnectionMetrics {
    /// Counts a newly opened stream.
    pub fn new() -> Self {
        increment_gauge!("stream_connections_active", 1.0);
        Self {
            recorded: AtomicBool::new(false),
        }
    }

    /// Records the stream's closure with its reason.
    ///
    /// Only the first call has any effect.
    pub fn record_closed(&self, reason: &str) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }
        increment_counter!("stream_connections_closed_total", "reason" => reason.to_string());
        decrement_gauge!("stream_connections_active", 1.0);
    }

    /// Whether closure has been recorded.
    pub fn is_recorded(&self) -> bool {
        self.recorded.load(Ordering::SeqCst)
    }
}

impl Default for StreamConnectionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StreamConnectionMetrics {
    fn drop(&mut self) {
        if !self.recorded.load(Ordering::SeqCst) {
            decrement_gauge!("stream_connections_active", 1.0);
        }
    }
}

/// Initializes the metrics exporter for Prometheus
///
/// When the `prometheus` feature is enabled, this function sets up the
/// Prometheus exporter on its default listener. Otherwise it is a no-op.
///
/// # Examples
///
/// ```
/// use ado_mcp::metrics::init_metrics_exporter;
///
/// init_metrics_exporter();
/// ```
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let _ = builder.install().map_err(|e| {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        });
    }
}
