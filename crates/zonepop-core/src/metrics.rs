//! Prometheus metrics for the ZonePop controller
//!
//! All series live in [`METRICS_REGISTRY`] under the `zonepop` namespace and
//! are exposed by the daemon's `/metrics` endpoint.
//!
//! # Metrics
//!
//! - `zonepop_source_up{source}`: 1 if the source's last query succeeded
//! - `zonepop_endpoints{source}`: endpoints returned by the source's last query
//! - `zonepop_provider_up{provider}`: 1 if the provider's last update succeeded
//! - `zonepop_controller_runs{status}`: passes by outcome
//! - `zonepop_controller_last_run_timestamp`: unix time the last pass finished
//! - `zonepop_controller_last_run_duration_seconds`: duration of the last pass
//! - `zonepop_controller_run_duration_seconds`: histogram of pass durations

use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all ZonePop metrics
pub const METRICS_NAMESPACE: &str = "zonepop";

/// Pass outcome label values of [`CONTROLLER_RUNS`]
pub const RUN_STATUS_SUCCESS: &str = "success";
pub const RUN_STATUS_ERROR: &str = "error";
pub const RUN_STATUS_DRY_RUN: &str = "dry_run";

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register<T: prometheus::core::Collector + Clone + 'static>(metric: T) -> T {
    METRICS_REGISTRY
        .register(Box::new(metric.clone()))
        .expect("metric registered twice");
    metric
}

/// Whether each source's last query succeeded
///
/// Labels:
/// - `source`: configured source name
pub static SOURCE_UP: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new("source_up", "Whether the source's last query succeeded")
        .namespace(METRICS_NAMESPACE);
    register(GaugeVec::new(opts, &["source"]).expect("valid source_up metric"))
});

/// Endpoints returned by each source
///
/// Labels:
/// - `source`: configured source name
pub static ENDPOINTS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new("endpoints", "Number of endpoints returned by the source")
        .namespace(METRICS_NAMESPACE);
    register(GaugeVec::new(opts, &["source"]).expect("valid endpoints metric"))
});

/// Whether each provider's last update succeeded
///
/// Labels:
/// - `provider`: configured provider name
pub static PROVIDER_UP: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new("provider_up", "Whether the provider's last update succeeded")
        .namespace(METRICS_NAMESPACE);
    register(GaugeVec::new(opts, &["provider"]).expect("valid provider_up metric"))
});

/// Reconciliation passes by outcome
///
/// Labels:
/// - `status`: `success`, `error` or `dry_run`
pub static CONTROLLER_RUNS: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new("runs", "Number of controller passes by status")
        .namespace(METRICS_NAMESPACE)
        .subsystem("controller");
    register(CounterVec::new(opts, &["status"]).expect("valid controller_runs metric"))
});

/// Unix timestamp of the end of the last pass
pub static CONTROLLER_LAST_RUN_TIMESTAMP: LazyLock<Gauge> = LazyLock::new(|| {
    let opts = Opts::new("last_run_timestamp", "Unix time the last controller pass finished")
        .namespace(METRICS_NAMESPACE)
        .subsystem("controller");
    register(Gauge::with_opts(opts).expect("valid last_run_timestamp metric"))
});

/// Duration of the last pass
pub static CONTROLLER_LAST_RUN_DURATION_SECONDS: LazyLock<Gauge> = LazyLock::new(|| {
    let opts = Opts::new(
        "last_run_duration_seconds",
        "Duration of the last controller pass in seconds",
    )
    .namespace(METRICS_NAMESPACE)
    .subsystem("controller");
    register(Gauge::with_opts(opts).expect("valid last_run_duration metric"))
});

/// Distribution of pass durations
pub static CONTROLLER_RUN_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        "run_duration_seconds",
        "Duration of controller passes in seconds",
    )
    .namespace(METRICS_NAMESPACE)
    .subsystem("controller")
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    register(Histogram::with_opts(opts).expect("valid run_duration metric"))
});

fn up_value(up: bool) -> f64 {
    if up { 1.0 } else { 0.0 }
}

/// Record the outcome of one source query
pub fn record_source(source: &str, up: bool, endpoints: usize) {
    SOURCE_UP.with_label_values(&[source]).set(up_value(up));
    ENDPOINTS
        .with_label_values(&[source])
        .set(endpoints as f64);
}

/// Record the outcome of one provider update
pub fn record_provider(provider: &str, up: bool) {
    PROVIDER_UP.with_label_values(&[provider]).set(up_value(up));
}

/// Record a finished pass
pub fn record_run(status: &str, duration: Duration, finished_at_unix: f64) {
    CONTROLLER_RUNS.with_label_values(&[status]).inc();
    CONTROLLER_LAST_RUN_TIMESTAMP.set(finished_at_unix);
    CONTROLLER_LAST_RUN_DURATION_SECONDS.set(duration.as_secs_f64());
    CONTROLLER_RUN_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Gather all metrics and encode them in Prometheus text format
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
