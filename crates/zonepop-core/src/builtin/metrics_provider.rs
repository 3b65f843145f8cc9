//! Endpoint info series
//!
//! Publishes `<namespace>_<subsystem>_endpoint` with value 1 for every
//! forward endpoint address. Labels are `hostname`, `ipv4`, `ipv6`, `ttl`
//! followed by the configured source and provider property keys.

use async_trait::async_trait;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{MetricsProviderConfig, ProviderConfig, ProviderKind};
use crate::endpoint::{property_to_string, Endpoint};
use crate::error::{Error, Result};
use crate::filter::{EndpointFilter, ProviderFilters};
use crate::metrics::METRICS_REGISTRY;
use crate::traits::{Provider, ProviderFactory};

const BASE_LABELS: [&str; 4] = ["hostname", "ipv4", "ipv6", "ttl"];

/// Collector serving the last complete series set
///
/// Updates fill a fresh `GaugeVec` and swap it in whole.
#[derive(Clone)]
pub struct EndpointSeries {
    opts: Opts,
    labels: Arc<Vec<String>>,
    // Never populated; only describes the series
    described: GaugeVec,
    published: Arc<RwLock<GaugeVec>>,
}

impl EndpointSeries {
    fn new(opts: Opts, labels: Vec<String>) -> Result<Self> {
        let described = new_gauge(&opts, &labels)?;
        let published = new_gauge(&opts, &labels)?;
        Ok(Self {
            opts,
            labels: Arc::new(labels),
            described,
            published: Arc::new(RwLock::new(published)),
        })
    }

    /// The currently published series set
    pub fn snapshot(&self) -> GaugeVec {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, next: GaugeVec) {
        *self.published.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl Collector for EndpointSeries {
    fn desc(&self) -> Vec<&Desc> {
        self.described.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.snapshot().collect()
    }
}

fn new_gauge(opts: &Opts, labels: &[String]) -> Result<GaugeVec> {
    let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    GaugeVec::new(opts.clone(), &label_refs)
        .map_err(|e| Error::config(format!("Invalid endpoint metric: {e}")))
}

/// Provider exporting one info series per endpoint address
pub struct MetricsProvider {
    config: MetricsProviderConfig,
    forward_filter: EndpointFilter,
    series: EndpointSeries,
}

impl MetricsProvider {
    /// Create the provider and register its series in [`METRICS_REGISTRY`]
    ///
    /// Fails if the metric name is already registered or a configured
    /// property key is not a valid label name.
    pub fn new(config: MetricsProviderConfig, forward_filter: EndpointFilter) -> Result<Self> {
        let provider = Self::unregistered(config, forward_filter)?;
        METRICS_REGISTRY
            .register(Box::new(provider.series.clone()))
            .map_err(|e| Error::config(format!("Cannot register endpoint metric: {e}")))?;
        Ok(provider)
    }

    fn unregistered(config: MetricsProviderConfig, forward_filter: EndpointFilter) -> Result<Self> {
        let labels: Vec<String> = BASE_LABELS
            .iter()
            .map(|l| l.to_string())
            .chain(config.source_labels.iter().cloned())
            .chain(config.provider_labels.iter().cloned())
            .collect();

        let opts = Opts::new("endpoint", "Info metric about an endpoint")
            .namespace(config.namespace.clone())
            .subsystem(config.subsystem.clone());
        let series = EndpointSeries::new(opts, labels)?;

        Ok(Self {
            config,
            forward_filter,
            series,
        })
    }

    /// The exported collector, for inspection
    pub fn series(&self) -> &EndpointSeries {
        &self.series
    }

    fn base_labels(&self, endpoint: &Endpoint) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert("hostname".to_string(), endpoint.hostname.clone());
        labels.insert("ttl".to_string(), endpoint.record_ttl.to_string());
        for key in &self.config.source_labels {
            if let Some(value) = endpoint.source_properties.get(key) {
                labels.insert(key.clone(), property_to_string(value));
            }
        }
        for key in &self.config.provider_labels {
            if let Some(value) = endpoint.provider_properties.get(key) {
                labels.insert(key.clone(), property_to_string(value));
            }
        }
        labels
    }

    fn push(&self, gauge: &GaugeVec, labels: &BTreeMap<String, String>) -> Result<()> {
        let values: Vec<&str> = self
            .series
            .labels
            .iter()
            .map(|name| labels.get(name).map(String::as_str).unwrap_or(""))
            .collect();
        gauge
            .get_metric_with_label_values(&values)
            .map_err(|e| Error::provider("metrics", e.to_string()))?
            .set(1.0);
        Ok(())
    }
}

#[async_trait]
impl Provider for MetricsProvider {
    async fn update_endpoints(&self, endpoints: &[Endpoint]) -> Result<()> {
        let next = new_gauge(&self.series.opts, &self.series.labels)?;

        for endpoint in self.forward_filter.apply(endpoints) {
            let mut labels = self.base_labels(endpoint);
            let ipv4s: Vec<Option<&String>> = if endpoint.ipv4s.is_empty() {
                vec![None]
            } else {
                endpoint.ipv4s.iter().map(Some).collect()
            };
            let ipv6s: Vec<Option<&String>> = if endpoint.ipv6s.is_empty() {
                vec![None]
            } else {
                endpoint.ipv6s.iter().map(Some).collect()
            };

            for ipv4 in &ipv4s {
                for ipv6 in &ipv6s {
                    labels.insert(
                        "ipv4".to_string(),
                        ipv4.cloned().unwrap_or_default(),
                    );
                    labels.insert(
                        "ipv6".to_string(),
                        ipv6.cloned().unwrap_or_default(),
                    );
                    self.push(&next, &labels)?;
                }
            }
        }

        self.series.publish(next);
        Ok(())
    }
}

/// Factory for `type = "metrics"` providers
pub struct MetricsProviderFactory;

impl ProviderFactory for MetricsProviderFactory {
    fn create(
        &self,
        config: &ProviderConfig,
        filters: ProviderFilters,
    ) -> Result<Box<dyn Provider>> {
        match &config.kind {
            ProviderKind::Metrics(metrics) => Ok(Box::new(MetricsProvider::new(
                metrics.clone(),
                filters.forward,
            )?)),
            _ => Err(Error::config(format!(
                "Provider {}: not a metrics configuration",
                config.name
            ))),
        }
    }
}
