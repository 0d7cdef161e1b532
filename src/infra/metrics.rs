//! Prometheus-backed metrics registry.

use std::collections::HashMap;

use parking_lot::RwLock;
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use tracing::debug;

use crate::core::metrics::{MetricsSink, POOL_COUNTERS, POOL_GAUGES};
use crate::core::MetricsError;

/// Named counters and gauges registered in a private prometheus registry.
///
/// Each instance owns its own [`Registry`], so several pools can run in one
/// process without name clashes. Counters are exported as
/// `<namespace>_<name>_total`, gauges as `<namespace>_<name>`.
pub struct MetricsRegistry {
    namespace: String,
    registry: Registry,
    counters: RwLock<HashMap<String, IntCounter>>,
    gauges: RwLock<HashMap<String, IntGauge>>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("namespace", &self.namespace)
            .field("counters", &self.counters.read().len())
            .field("gauges", &self.gauges.read().len())
            .finish()
    }
}

impl MetricsRegistry {
    /// Create an empty registry whose metrics are prefixed with `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            registry: Registry::new(),
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with every counter and gauge a pool reports.
    ///
    /// # Errors
    /// Returns an error if the namespace yields invalid metric names.
    pub fn with_pool_metrics(namespace: impl Into<String>) -> Result<Self, MetricsError> {
        let registry = Self::new(namespace);
        for (name, help) in POOL_COUNTERS {
            registry.register_counter(name, help)?;
        }
        for (name, help) in POOL_GAUGES {
            registry.register_gauge(name, help)?;
        }
        Ok(registry)
    }

    /// Namespace prefixed to every metric.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Underlying prometheus registry, for callers that gather it themselves.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register a counter.
    ///
    /// # Errors
    /// `EmptyName` for an empty name, `AlreadyRegistered` when a counter with
    /// this name exists, `Prometheus` when the client rejects the metric.
    pub fn register_counter(&self, name: &str, help: &str) -> Result<(), MetricsError> {
        if name.is_empty() {
            return Err(MetricsError::EmptyName);
        }
        let mut counters = self.counters.write();
        if counters.contains_key(name) {
            return Err(MetricsError::AlreadyRegistered(name.to_string()));
        }
        let counter = IntCounter::with_opts(
            Opts::new(format!("{name}_total"), help).namespace(self.namespace.clone()),
        )?;
        self.registry.register(Box::new(counter.clone()))?;
        counters.insert(name.to_string(), counter);
        debug!(namespace = %self.namespace, metric = name, "counter registered");
        Ok(())
    }

    /// Register a gauge.
    ///
    /// # Errors
    /// Same conditions as [`MetricsRegistry::register_counter`].
    pub fn register_gauge(&self, name: &str, help: &str) -> Result<(), MetricsError> {
        if name.is_empty() {
            return Err(MetricsError::EmptyName);
        }
        let mut gauges = self.gauges.write();
        if gauges.contains_key(name) {
            return Err(MetricsError::AlreadyRegistered(name.to_string()));
        }
        let gauge = IntGauge::with_opts(Opts::new(name, help).namespace(self.namespace.clone()))?;
        self.registry.register(Box::new(gauge.clone()))?;
        gauges.insert(name.to_string(), gauge);
        debug!(namespace = %self.namespace, metric = name, "gauge registered");
        Ok(())
    }

    /// Remove the counter and gauge registered under `name`.
    ///
    /// # Errors
    /// `NotRegistered` when neither exists.
    pub fn unregister(&self, name: &str) -> Result<(), MetricsError> {
        let counter = self.counters.write().remove(name);
        let gauge = self.gauges.write().remove(name);
        if counter.is_none() && gauge.is_none() {
            return Err(MetricsError::NotRegistered(name.to_string()));
        }
        if let Some(counter) = counter {
            self.registry.unregister(Box::new(counter))?;
        }
        if let Some(gauge) = gauge {
            self.registry.unregister(Box::new(gauge))?;
        }
        Ok(())
    }

    /// Current value of a counter.
    #[must_use]
    pub fn counter_value(&self, name: &str) -> Option<u64> {
        self.counters.read().get(name).map(IntCounter::get)
    }

    /// Current value of a gauge.
    #[must_use]
    pub fn gauge_value(&self, name: &str) -> Option<i64> {
        self.gauges.read().get(name).map(IntGauge::get)
    }

    /// Render every metric in the prometheus text exposition format.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode_text(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl MetricsSink for MetricsRegistry {
    fn increment(&self, names: &[&str]) {
        {
            let counters = self.counters.read();
            for name in names {
                if let Some(counter) = counters.get(*name) {
                    counter.inc();
                }
            }
        }
        let gauges = self.gauges.read();
        for name in names {
            if let Some(gauge) = gauges.get(*name) {
                gauge.inc();
            }
        }
    }

    fn decrement(&self, names: &[&str]) {
        let gauges = self.gauges.read();
        for name in names {
            if let Some(gauge) = gauges.get(*name) {
                gauge.dec();
            }
        }
    }
}
