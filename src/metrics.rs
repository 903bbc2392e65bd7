//! Prometheus metrics integration for the plugin engine.

use prometheus::{Counter, Histogram, Registry};

use crate::registry::ActivationStats;

/// Configuration for activation metrics collection.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Metric prefix for all engine metrics.
    pub prefix: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prefix: "ferrule".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the metric prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// Activation metrics collector.
pub struct ActivationMetrics {
    config: MetricsConfig,
    registry: Registry,
    plugins_activated: Counter,
    plugins_skipped: Counter,
    plugin_errors: Counter,
    activation_duration: Histogram,
}

impl ActivationMetrics {
    /// Create a new metrics collector with the given configuration.
    pub fn new(config: MetricsConfig) -> Self {
        let registry = Registry::new();

        let plugins_activated = Counter::new(
            format!("{}_plugins_activated_total", config.prefix),
            "Total number of plugins activated",
        )
        .unwrap();

        let plugins_skipped = Counter::new(
            format!("{}_plugins_skipped_total", config.prefix),
            "Total number of plugins skipped by the activation plan",
        )
        .unwrap();

        let plugin_errors = Counter::new(
            format!("{}_plugin_errors_total", config.prefix),
            "Total number of plugins that failed to activate",
        )
        .unwrap();

        let activation_duration = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                format!("{}_activation_duration_seconds", config.prefix),
                "Duration of the resolve-and-activate pass in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )
        .unwrap();

        registry.register(Box::new(plugins_activated.clone())).ok();
        registry.register(Box::new(plugins_skipped.clone())).ok();
        registry.register(Box::new(plugin_errors.clone())).ok();
        registry.register(Box::new(activation_duration.clone())).ok();

        Self {
            config,
            registry,
            plugins_activated,
            plugins_skipped,
            plugin_errors,
            activation_duration,
        }
    }

    /// Create with default configuration.
    pub fn default_config() -> Self {
        Self::new(MetricsConfig::default())
    }

    /// Get the configuration.
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Get the Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record the outcome of an activation pass.
    pub fn observe_activation(&self, stats: &ActivationStats, duration_secs: f64) {
        self.plugins_activated.inc_by(stats.active as f64);
        self.plugins_skipped.inc_by(stats.skipped as f64);
        self.plugin_errors.inc_by(stats.errored as f64);
        self.activation_duration.observe(duration_secs);
    }

    /// Record a single plugin error outside an activation pass.
    pub fn record_error(&self) {
        self.plugin_errors.inc();
    }

    /// Get the total number of plugins activated.
    pub fn plugins_activated_total(&self) -> u64 {
        self.plugins_activated.get() as u64
    }

    /// Get the total number of plugins skipped.
    pub fn plugins_skipped_total(&self) -> u64 {
        self.plugins_skipped.get() as u64
    }

    /// Get the total number of plugin errors.
    pub fn plugin_errors_total(&self) -> u64 {
        self.plugin_errors.get() as u64
    }
}

impl std::fmt::Debug for ActivationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationMetrics")
            .field("config", &self.config)
            .field("plugins_activated", &self.plugins_activated_total())
            .field("plugins_skipped", &self.plugins_skipped_total())
            .field("plugin_errors", &self.plugin_errors_total())
            .finish()
    }
}
