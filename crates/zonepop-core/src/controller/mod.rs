//! Reconciliation controller
//!
//! The Controller is responsible for:
//! - Querying every source, in configured order
//! - Stamping provenance and recording per-source metrics
//! - Gating all providers when any source failed
//! - Fanning the merged endpoint set out to every provider, in order
//! - Scheduling passes at most once per interval
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐ ┌──────────┐
//! │ Source A │ │ Source B │ ...
//! └──────────┘ └──────────┘
//!       │            │
//!       └─────┬──────┘
//!             ▼
//!     ┌──────────────┐
//!     │  Controller  │── any source failed? ──▶ all providers down, stop
//!     └──────────────┘
//!             │ merged endpoints
//!       ┌─────┴──────┬────────────┐
//!       ▼            ▼            ▼
//! ┌──────────┐ ┌──────────┐ ┌──────────┐
//! │Provider X│ │Provider Y│ │Provider Z│   failures isolated, aggregated
//! └──────────┘ └──────────┘ └──────────┘
//! ```
//!
//! ## Failure Semantics
//!
//! Source failures are all-or-nothing: a partial endpoint set is never
//! written to any provider. Provider failures are isolated: each provider is
//! attempted and all failures are returned together.

use crate::config::ControllerConfig;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::metrics;
use crate::traits::{EndpointSource, Provider};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default period of the run loop's due-check
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// A source together with its configured name
pub struct NamedSource {
    pub name: String,
    pub source: Box<dyn EndpointSource>,
}

impl NamedSource {
    pub fn new(name: impl Into<String>, source: Box<dyn EndpointSource>) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// A provider together with its configured name
pub struct NamedProvider {
    pub name: String,
    pub provider: Box<dyn Provider>,
}

impl NamedProvider {
    pub fn new(name: impl Into<String>, provider: Box<dyn Provider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }
}

/// Per-pass options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Query and log sources but call no provider
    pub dry_run: bool,
}

impl RunOptions {
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

/// Reconciliation controller
///
/// ## Lifecycle
///
/// 1. Create with [`Controller::new()`] or [`Controller::from_config()`]
/// 2. Optionally prime the schedule with [`Controller::schedule_run_once()`]
/// 3. Drive with [`Controller::run()`] until the token is cancelled, or call
///    [`Controller::run_once()`] directly
///
/// ## Threading
///
/// Only the next-eligible-run timestamp is shared state; it is guarded by a
/// mutex. Passes themselves are strictly sequential.
pub struct Controller {
    sources: Vec<NamedSource>,
    providers: Vec<NamedProvider>,
    interval: chrono::Duration,
    tick: Duration,
    next_run_at: Mutex<DateTime<Utc>>,
}

impl Controller {
    /// Create a new controller
    ///
    /// # Parameters
    ///
    /// - `sources`: sources, queried in this order
    /// - `providers`: providers, updated in this order
    /// - `interval`: minimum time between two passes
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)` if the interval is zero or out of range
    pub fn new(
        sources: Vec<NamedSource>,
        providers: Vec<NamedProvider>,
        interval: Duration,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::config("Controller interval must be > 0"));
        }
        let interval = chrono::Duration::from_std(interval)
            .map_err(|e| Error::config(format!("Controller interval out of range: {e}")))?;

        Ok(Self {
            sources,
            providers,
            interval,
            tick: DEFAULT_TICK,
            next_run_at: Mutex::new(DateTime::<Utc>::MIN_UTC),
        })
    }

    /// Create a controller from its configuration section
    pub fn from_config(
        sources: Vec<NamedSource>,
        providers: Vec<NamedProvider>,
        config: &ControllerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(sources, providers, Duration::from_secs(config.interval_secs))?
            .with_tick(Duration::from_millis(config.tick_millis)))
    }

    /// Set how often the run loop checks whether a pass is due
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    /// Configured source names, in query order
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }

    /// Configured provider names, in update order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    /// Run a single reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(())`: every source and every called provider succeeded
    /// - `Err(Error)`: the source failures (no provider was called), or the
    ///   aggregated provider failures
    pub async fn run_once(&self, options: RunOptions) -> Result<()> {
        let started = Instant::now();
        let result = self.reconcile(options).await;

        let status = match (&result, options.dry_run) {
            (Err(_), _) => metrics::RUN_STATUS_ERROR,
            (Ok(()), true) => metrics::RUN_STATUS_DRY_RUN,
            (Ok(()), false) => metrics::RUN_STATUS_SUCCESS,
        };
        let finished_at = Utc::now().timestamp_millis() as f64 / 1000.0;
        metrics::record_run(status, started.elapsed(), finished_at);

        result
    }

    async fn reconcile(&self, options: RunOptions) -> Result<()> {
        let (endpoints, source_errors) = self.collect_endpoints().await;

        if let Some(err) = Error::from_many(source_errors) {
            for provider in &self.providers {
                metrics::record_provider(&provider.name, false);
            }
            warn!(
                error = %err,
                endpoints = endpoints.len(),
                "Source failure, skipping all providers for this pass"
            );
            return Err(err);
        }

        for endpoint in &endpoints {
            info!(
                hostname = %endpoint.hostname,
                ipv4s = ?endpoint.ipv4s,
                ipv6s = ?endpoint.ipv6s,
                ttl = endpoint.record_ttl,
                source_properties = ?endpoint.source_properties,
                provider_properties = ?endpoint.provider_properties,
                "endpoint"
            );
        }

        if options.dry_run {
            info!(
                endpoints = endpoints.len(),
                "Dry run, not updating providers"
            );
            return Ok(());
        }

        let mut provider_errors = Vec::new();
        for named in &self.providers {
            debug!(provider = %named.name, "Updating provider");
            match named.provider.update_endpoints(&endpoints).await {
                Ok(()) => {
                    metrics::record_provider(&named.name, true);
                    info!(provider = %named.name, "Provider updated");
                }
                Err(e) => {
                    metrics::record_provider(&named.name, false);
                    error!(provider = %named.name, error = %e, "Provider update failed");
                    provider_errors.push(match e {
                        e @ Error::Provider { .. } => e,
                        other => Error::provider(&named.name, other.to_string()),
                    });
                }
            }
        }

        match Error::from_many(provider_errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn collect_endpoints(&self) -> (Vec<Endpoint>, Vec<Error>) {
        let mut merged = Vec::new();
        let mut errors = Vec::new();

        for named in &self.sources {
            let (mut endpoints, failure) = match named.source.endpoints().await {
                Ok(endpoints) => (endpoints, None),
                Err(e) => {
                    let (partial, cause) = e.into_partial_parts();
                    (partial, Some(cause))
                }
            };

            for endpoint in &mut endpoints {
                endpoint.stamp_source(&named.name);
            }
            metrics::record_source(&named.name, failure.is_none(), endpoints.len());

            match failure {
                None => debug!(
                    source = %named.name,
                    endpoints = endpoints.len(),
                    "Source queried"
                ),
                Some(cause) => {
                    error!(source = %named.name, error = %cause, "Source query failed");
                    errors.push(match cause {
                        e @ Error::Source { .. } => e,
                        other => Error::source_failed(&named.name, other.to_string()),
                    });
                }
            }

            merged.extend(endpoints);
        }

        (merged, errors)
    }

    /// Check whether a pass is due, and claim it if so
    ///
    /// Returns `true` and moves the next eligible time to `now + interval`
    /// iff `now` is not before the next eligible time. Otherwise returns
    /// `false` and leaves the schedule untouched.
    pub fn should_run_once(&self, now: DateTime<Utc>) -> bool {
        let mut next_run_at = self
            .next_run_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if now < *next_run_at {
            return false;
        }
        *next_run_at = now
            .checked_add_signed(self.interval)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        true
    }

    /// Make a pass eligible as of `now`
    pub fn schedule_run_once(&self, now: DateTime<Utc>) {
        let mut next_run_at = self
            .next_run_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *next_run_at = now;
    }

    /// Run passes on schedule until `shutdown` is cancelled
    ///
    /// Errors of individual passes are logged, never returned. Cancellation
    /// is checked between ticks; an in-flight pass always completes.
    pub async fn run(&self, shutdown: CancellationToken, options: RunOptions) {
        info!(
            interval_secs = self.interval.num_seconds(),
            sources = self.sources.len(),
            providers = self.providers.len(),
            dry_run = options.dry_run,
            "Controller started"
        );

        let mut ticks = IntervalStream::new(tokio::time::interval(self.tick));
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Terminating controller loop");
                    break;
                }
                tick = ticks.next() => {
                    if tick.is_none() {
                        break;
                    }
                    if self.should_run_once(Utc::now()) {
                        if let Err(e) = self.run_once(options).await {
                            error!(error = %e, "Reconciliation pass failed");
                        }
                    }
                }
            }
        }
    }
}
