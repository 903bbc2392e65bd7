//! Plugin resolution: constraints and fingerprints to an activation plan.

use std::collections::{HashMap, HashSet};

use crate::descriptor::PluginDescriptor;
use crate::enablement::Enablement;
use crate::error::{Error, Result};
use crate::fingerprint::{Fingerprint, HostSnapshot};
use crate::graph::Digraph;

/// Per-plugin outcome of resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Activate the plugin in plan order.
    Activate,
    /// No declared fingerprint matched the host snapshot.
    SkipIncompatible,
    /// An enablement rule disabled the plugin.
    SkipDisabled,
    /// A mutually exclusive plugin earlier in the plan activates instead.
    SkipConflict {
        /// The plugin that won the exclusion.
        winner: String,
    },
}

impl Decision {
    /// True for [`Decision::Activate`].
    pub fn is_activate(&self) -> bool {
        matches!(self, Self::Activate)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activate => write!(f, "activate"),
            Self::SkipIncompatible => write!(f, "skip (incompatible)"),
            Self::SkipDisabled => write!(f, "skip (disabled)"),
            Self::SkipConflict { winner } => write!(f, "skip (conflicts with {})", winner),
        }
    }
}

/// One decided entry of an [`ActivationPlan`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
    /// The plugin the entry decides.
    pub descriptor: PluginDescriptor,
    /// What the activator should do with it.
    pub decision: Decision,
}

/// Ordered, immutable outcome of resolution.
///
/// Order respects every ordering constraint among plugins: for any
/// declared `A before B`, A's entry precedes B's. The plan is the only
/// input the activator needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivationPlan {
    entries: Vec<PlanEntry>,
}

impl ActivationPlan {
    /// Entries in plan order.
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Look up the entry for a plugin.
    pub fn get(&self, id: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.descriptor.id == id)
    }

    /// Descriptors decided [`Decision::Activate`], in plan order.
    pub fn to_activate(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.decision.is_activate())
            .map(|e| &e.descriptor)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the plan has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Configuration for the resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Whether to validate descriptor structure before resolving.
    pub strict_validation: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strict_validation: true,
        }
    }
}

impl ResolverConfig {
    /// Create a new resolver configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict validation.
    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }
}

/// Turns descriptors, a host snapshot, and enablement rules into a plan.
///
/// Resolution is deterministic: identical inputs always produce an
/// identical plan, because topological ties break by declaration order
/// and enablement precedence is a pure function of the rule list.
#[derive(Debug, Default)]
pub struct PluginResolver {
    config: ResolverConfig,
}

impl PluginResolver {
    /// Create a resolver with the given configuration.
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Create a resolver with default configuration.
    pub fn default_config() -> Self {
        Self::new(ResolverConfig::default())
    }

    /// Get the resolver configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a descriptor set into an [`ActivationPlan`].
    ///
    /// Fails only on structural errors: duplicate identifiers, invalid
    /// descriptors under strict validation, or an ordering cycle (reported
    /// with the full residual set). Per-plugin problems such as unmatched
    /// or malformed fingerprints become skip decisions in the plan instead.
    pub fn resolve(
        &self,
        descriptors: &[PluginDescriptor],
        snapshot: &HostSnapshot,
        enablement: &Enablement,
    ) -> Result<ActivationPlan> {
        let mut seen = HashSet::new();
        for descriptor in descriptors {
            if !seen.insert(descriptor.id.as_str()) {
                return Err(Error::DuplicatePlugin(descriptor.id.clone()));
            }
            if self.config.strict_validation {
                descriptor.validate()?;
            }
        }

        let by_id: HashMap<&str, &PluginDescriptor> =
            descriptors.iter().map(|d| (d.id.as_str(), d)).collect();

        let order = self.constraint_order(descriptors, &by_id)?;

        let mut entries = Vec::with_capacity(order.len());
        let mut activated: Vec<&PluginDescriptor> = Vec::new();

        for id in &order {
            let descriptor = by_id[id.as_str()];
            let decision = self.decide(descriptor, snapshot, enablement, &activated);

            tracing::debug!(plugin = %descriptor.id, decision = %decision, "resolved");

            if decision.is_activate() {
                activated.push(descriptor);
            }
            entries.push(PlanEntry {
                descriptor: descriptor.clone(),
                decision,
            });
        }

        Ok(ActivationPlan { entries })
    }

    // Helper methods

    /// Build the constraint graph and return the canonical candidate order.
    fn constraint_order(
        &self,
        descriptors: &[PluginDescriptor],
        by_id: &HashMap<&str, &PluginDescriptor>,
    ) -> Result<Vec<String>> {
        let mut graph: Digraph<String> = Digraph::new();

        // Declaration order seeds the deterministic tie-break.
        for descriptor in descriptors {
            graph.add_node(descriptor.id.clone());
        }

        for descriptor in descriptors {
            for target in &descriptor.before {
                if by_id.contains_key(target.as_str()) {
                    graph.add(descriptor.id.clone(), target.clone());
                } else {
                    tracing::warn!(
                        plugin = %descriptor.id,
                        target = %target,
                        "ordering constraint references undeclared plugin, ignoring"
                    );
                }
            }
            // `after` on A targeting B is the edge B -> A.
            for target in &descriptor.after {
                if by_id.contains_key(target.as_str()) {
                    graph.add(target.clone(), descriptor.id.clone());
                } else {
                    tracing::warn!(
                        plugin = %descriptor.id,
                        target = %target,
                        "ordering constraint references undeclared plugin, ignoring"
                    );
                }
            }
        }

        graph
            .top_sort()
            .map_err(|cycle| Error::cycle(cycle.remaining))
    }

    fn decide(
        &self,
        descriptor: &PluginDescriptor,
        snapshot: &HostSnapshot,
        enablement: &Enablement,
        activated: &[&PluginDescriptor],
    ) -> Decision {
        if !enablement.is_enabled(&descriptor.id) {
            return Decision::SkipDisabled;
        }

        if let Err(e) = descriptor.validate_fingerprints() {
            tracing::warn!(plugin = %descriptor.id, error = %e, "malformed fingerprint, treating as incompatible");
            return Decision::SkipIncompatible;
        }

        if Fingerprint::match_any(&descriptor.fingerprints, snapshot).is_none() {
            return Decision::SkipIncompatible;
        }

        // Conflicts are symmetric; the plugin earlier in plan order wins.
        for winner in activated {
            if descriptor.conflicts_with(&winner.id) || winner.conflicts_with(&descriptor.id) {
                return Decision::SkipConflict {
                    winner: winner.id.clone(),
                };
            }
        }

        Decision::Activate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;

    fn snapshot() -> HostSnapshot {
        HostSnapshot::builder()
            .symbol("redis::Client", ["connect()"])
            .build()
    }

    fn plain(id: &str) -> PluginDescriptor {
        PluginDescriptor::builder(id).build_unchecked()
    }

    fn resolve(descriptors: &[PluginDescriptor]) -> ActivationPlan {
        PluginResolver::default_config()
            .resolve(descriptors, &snapshot(), &Enablement::new())
            .unwrap()
    }

    fn plan_position(plan: &ActivationPlan, id: &str) -> usize {
        plan.entries()
            .iter()
            .position(|e| e.descriptor.id == id)
            .unwrap()
    }

    #[test]
    fn test_order_respects_before_and_after() {
        let descriptors = vec![
            PluginDescriptor::builder("metrics").after("pool").build_unchecked(),
            PluginDescriptor::builder("pool").build_unchecked(),
            PluginDescriptor::builder("bootstrap").before("pool").build_unchecked(),
        ];

        let plan = resolve(&descriptors);
        assert!(plan_position(&plan, "bootstrap") < plan_position(&plan, "pool"));
        assert!(plan_position(&plan, "pool") < plan_position(&plan, "metrics"));
        assert!(plan.entries().iter().all(|e| e.decision.is_activate()));
    }

    #[test]
    fn test_cycle_is_fatal() {
        let descriptors = vec![
            PluginDescriptor::builder("a").before("b").build_unchecked(),
            PluginDescriptor::builder("b").before("a").build_unchecked(),
        ];

        let err = PluginResolver::default_config()
            .resolve(&descriptors, &snapshot(), &Enablement::new())
            .unwrap_err();

        match err {
            Error::CycleDetected { plugins } => {
                assert!(plugins.contains(&"a".to_string()));
                assert!(plugins.contains(&"b".to_string()));
            }
            other => panic!("expected cycle, got {}", other),
        }
    }

    #[test]
    fn test_duplicate_id_is_fatal() {
        let descriptors = vec![plain("a"), plain("a")];
        let result = PluginResolver::default_config().resolve(
            &descriptors,
            &snapshot(),
            &Enablement::new(),
        );
        assert!(matches!(result, Err(Error::DuplicatePlugin(_))));
    }

    #[test]
    fn test_unknown_constraint_target_ignored() {
        let descriptors = vec![
            PluginDescriptor::builder("a").after("not-declared").build_unchecked(),
        ];
        let plan = resolve(&descriptors);
        assert_eq!(plan.len(), 1);
        assert!(plan.entries()[0].decision.is_activate());
    }

    #[test]
    fn test_disabled_before_fingerprints() {
        // Enablement is checked first, so a compatible but excluded plugin
        // is SkipDisabled, not SkipIncompatible.
        let descriptors = vec![PluginDescriptor::builder("redis.commands")
            .fingerprint(Fingerprint::new().with_symbol("redis::Client", ["connect()"]))
            .build_unchecked()];
        let enablement = Enablement::new().exclude("redis.*").unwrap();

        let plan = PluginResolver::default_config()
            .resolve(&descriptors, &snapshot(), &enablement)
            .unwrap();
        assert_eq!(plan.entries()[0].decision, Decision::SkipDisabled);
    }

    #[test]
    fn test_incompatible_fingerprint_skips() {
        let descriptors = vec![PluginDescriptor::builder("kafka.producer")
            .fingerprint(Fingerprint::new().with_symbol("kafka::Producer", ["send()"]))
            .build_unchecked()];

        let plan = resolve(&descriptors);
        assert_eq!(plan.entries()[0].decision, Decision::SkipIncompatible);
    }

    #[test]
    fn test_malformed_fingerprint_contained() {
        let descriptors = vec![
            PluginDescriptor::builder("broken")
                .fingerprint(Fingerprint::new())
                .build_unchecked(),
            plain("healthy"),
        ];

        let plan = resolve(&descriptors);
        assert_eq!(plan.get("broken").unwrap().decision, Decision::SkipIncompatible);
        assert!(plan.get("healthy").unwrap().decision.is_activate());
    }

    #[test]
    fn test_conflict_earlier_wins() {
        let descriptors = vec![
            plain("tracer-v2"),
            PluginDescriptor::builder("tracer-v1")
                .conflicts_with("tracer-v2")
                .build_unchecked(),
        ];

        let plan = resolve(&descriptors);
        assert!(plan.get("tracer-v2").unwrap().decision.is_activate());
        assert_eq!(
            plan.get("tracer-v1").unwrap().decision,
            Decision::SkipConflict {
                winner: "tracer-v2".to_string()
            }
        );
    }

    #[test]
    fn test_conflict_is_symmetric() {
        // Declared on the earlier plugin only; the later one still loses.
        let descriptors = vec![
            PluginDescriptor::builder("tracer-v2")
                .conflicts_with("tracer-v1")
                .build_unchecked(),
            plain("tracer-v1"),
        ];

        let plan = resolve(&descriptors);
        assert!(plan.get("tracer-v2").unwrap().decision.is_activate());
        assert!(matches!(
            plan.get("tracer-v1").unwrap().decision,
            Decision::SkipConflict { .. }
        ));
    }

    #[test]
    fn test_conflict_with_skipped_plugin_does_not_fire() {
        // The excluded plugin never activates, so its conflict partner runs.
        let descriptors = vec![
            plain("tracer-v2"),
            PluginDescriptor::builder("tracer-v1")
                .conflicts_with("tracer-v2")
                .build_unchecked(),
        ];
        let enablement = Enablement::new().exclude("tracer-v2").unwrap();

        let plan = PluginResolver::default_config()
            .resolve(&descriptors, &snapshot(), &enablement)
            .unwrap();
        assert_eq!(plan.get("tracer-v2").unwrap().decision, Decision::SkipDisabled);
        assert!(plan.get("tracer-v1").unwrap().decision.is_activate());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let descriptors = vec![
            PluginDescriptor::builder("c").after("a").build_unchecked(),
            PluginDescriptor::builder("a").build_unchecked(),
            PluginDescriptor::builder("b").after("a").build_unchecked(),
            PluginDescriptor::builder("d").build_unchecked(),
        ];
        let enablement = Enablement::new().exclude("d").unwrap();

        let first = PluginResolver::default_config()
            .resolve(&descriptors, &snapshot(), &enablement)
            .unwrap();
        for _ in 0..10 {
            let again = PluginResolver::default_config()
                .resolve(&descriptors, &snapshot(), &enablement)
                .unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_strict_validation_rejects_bad_descriptor() {
        // Empty constraint target: structurally invalid, but harmless to
        // resolution itself (unknown targets are ignored).
        let descriptors = vec![PluginDescriptor::builder("a").after("").build_unchecked()];

        let strict = PluginResolver::default_config();
        assert!(matches!(
            strict.resolve(&descriptors, &snapshot(), &Enablement::new()),
            Err(Error::InvalidDescriptor(_))
        ));

        let lenient = PluginResolver::new(ResolverConfig::new().with_strict_validation(false));
        assert!(lenient
            .resolve(&descriptors, &snapshot(), &Enablement::new())
            .is_ok());
    }
}
