//! Engine facade: one context, one resolution pass, one activation pass.
//!
//! [`PluginEngine`] is the explicit context object a host builds once at
//! startup in place of any ambient global registry: descriptors and hooks
//! go in, [`PluginEngine::activate`] runs exactly once, and afterwards the
//! engine is a read-only query surface for the interception layer.

use std::sync::Arc;
use std::time::Instant;

use crate::activator::{Activator, HookSet, InstallHook};
use crate::descriptor::PluginDescriptor;
use crate::enablement::Enablement;
use crate::error::{Error, Result};
use crate::fingerprint::HostSnapshot;
use crate::registry::ActivationRegistry;
use crate::resolver::{ActivationPlan, PluginResolver, ResolverConfig};
use crate::scope::ScopeManager;

#[cfg(feature = "serde")]
use crate::descriptor::DescriptorSet;
#[cfg(feature = "metrics-prometheus")]
use crate::metrics::ActivationMetrics;

/// Configuration for the plugin engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Resolver configuration.
    pub resolver: ResolverConfig,
    /// Enablement rules over plugin identifiers.
    pub enablement: Enablement,
}

impl EngineConfig {
    /// Create a new engine configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resolver configuration.
    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set the enablement rules.
    pub fn with_enablement(mut self, enablement: Enablement) -> Self {
        self.enablement = enablement;
        self
    }
}

struct Activated {
    plan: ActivationPlan,
    registry: ActivationRegistry,
}

/// Plugin resolution and activation engine.
pub struct PluginEngine {
    config: EngineConfig,
    descriptors: Vec<PluginDescriptor>,
    hooks: HookSet,
    scopes: Arc<ScopeManager>,
    activated: Option<Activated>,
    #[cfg(feature = "metrics-prometheus")]
    metrics: Option<Arc<ActivationMetrics>>,
}

impl PluginEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            descriptors: Vec::new(),
            hooks: HookSet::new(),
            scopes: Arc::new(ScopeManager::new()),
            activated: None,
            #[cfg(feature = "metrics-prometheus")]
            metrics: None,
        }
    }

    /// Create an engine with default configuration.
    pub fn default_config() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Attach a metrics collector fed after activation.
    #[cfg(feature = "metrics-prometheus")]
    pub fn with_metrics(mut self, metrics: Arc<ActivationMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Register a plugin: its descriptor and its install hook.
    pub fn register(
        &mut self,
        descriptor: PluginDescriptor,
        hook: impl InstallHook + 'static,
    ) -> Result<()> {
        let id = descriptor.id.clone();
        self.register_descriptor(descriptor)?;
        self.hooks.register(id, hook)
    }

    /// Register a descriptor without a hook (wired later via
    /// [`PluginEngine::register_hook`]).
    pub fn register_descriptor(&mut self, descriptor: PluginDescriptor) -> Result<()> {
        self.ensure_not_activated()?;
        if self.descriptors.iter().any(|d| d.id == descriptor.id) {
            return Err(Error::DuplicatePlugin(descriptor.id));
        }
        tracing::debug!(plugin = %descriptor.id, "registered descriptor");
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Register an install hook for an already-declared plugin.
    pub fn register_hook(
        &mut self,
        id: impl Into<String>,
        hook: impl InstallHook + 'static,
    ) -> Result<()> {
        self.ensure_not_activated()?;
        let id = id.into();
        if !self.descriptors.iter().any(|d| d.id == id) {
            return Err(Error::plugin_not_found(id));
        }
        self.hooks.register(id, hook)
    }

    /// Load a declarative catalog: descriptors plus enablement rules.
    #[cfg(feature = "serde")]
    pub fn load_catalog(&mut self, catalog: &DescriptorSet) -> Result<()> {
        self.ensure_not_activated()?;
        for descriptor in &catalog.plugins {
            self.register_descriptor(descriptor.clone())?;
        }
        let mut enablement = std::mem::take(&mut self.config.enablement);
        for spec in &catalog.enablement {
            enablement = enablement.rule(&spec.pattern, spec.enabled)?;
        }
        self.config.enablement = enablement;
        Ok(())
    }

    /// Number of registered descriptors.
    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Resolve and activate against a host snapshot. Runs exactly once.
    ///
    /// Fails only on structural resolution errors (duplicates, cycles,
    /// invalid descriptors) or on a repeated call; per-plugin failures are
    /// contained in the returned registry.
    pub fn activate(&mut self, snapshot: &HostSnapshot) -> Result<&ActivationRegistry> {
        self.ensure_not_activated()?;

        let started = Instant::now();
        let resolver = PluginResolver::new(self.config.resolver.clone());
        let plan = resolver.resolve(&self.descriptors, snapshot, &self.config.enablement)?;

        let activator = Activator::new(self.scopes.clone());
        let registry = activator.apply(&plan, &self.hooks);
        let elapsed = started.elapsed();

        for line in registry.report_lines() {
            tracing::info!("{}", line);
        }
        tracing::info!(
            summary = %registry.stats(),
            elapsed_ms = elapsed.as_millis() as u64,
            "plugin engine activated"
        );

        #[cfg(feature = "metrics-prometheus")]
        if let Some(metrics) = &self.metrics {
            metrics.observe_activation(&registry.stats(), elapsed.as_secs_f64());
        }

        let activated = self.activated.insert(Activated { plan, registry });
        Ok(&activated.registry)
    }

    /// True iff the plugin ended active. False before activation.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.activated
            .as_ref()
            .map(|a| a.registry.is_enabled(id))
            .unwrap_or(false)
    }

    /// The resolved plan, once activated.
    pub fn plan(&self) -> Option<&ActivationPlan> {
        self.activated.as_ref().map(|a| &a.plan)
    }

    /// The status registry, once activated.
    pub fn registry(&self) -> Option<&ActivationRegistry> {
        self.activated.as_ref().map(|a| &a.registry)
    }

    /// Active plugin ids in plan order; empty before activation.
    pub fn activated_ids(&self) -> Vec<String> {
        self.activated
            .as_ref()
            .map(|a| a.registry.active_ids())
            .unwrap_or_default()
    }

    /// The diagnostic report, once activated.
    pub fn report(&self) -> Option<String> {
        self.activated.as_ref().map(|a| a.registry.report())
    }

    /// The scope manager owning every isolation scope.
    pub fn scopes(&self) -> &Arc<ScopeManager> {
        &self.scopes
    }

    fn ensure_not_activated(&self) -> Result<()> {
        if self.activated.is_some() {
            return Err(Error::AlreadyActivated);
        }
        Ok(())
    }
}

impl std::fmt::Debug for PluginEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginEngine")
            .field("descriptor_count", &self.descriptors.len())
            .field("activated", &self.activated.is_some())
            .finish()
    }
}
