//! # ferrule
//!
//! Plugin resolution and isolation engine for capability plugins: each
//! plugin adds behavior for a specific third-party library if, and only
//! if, that library is actually present and at a supported revision.
//!
//! This crate provides:
//! - **Fingerprint Matching** - Decide per plugin whether the host process
//!   exposes the symbols its target library revision requires
//! - **Deterministic Ordering** - Resolve `before`/`after` constraints
//!   through a topological sort with reproducible tie-breaks
//! - **Mutual Exclusion** - At most one of a conflicting plugin pair
//!   activates, decided deterministically
//! - **Isolation Scopes** - Private, name-scoped dependency tables per
//!   plugin with one append-only bridge of shared host symbols
//! - **Bulkhead Activation** - One plugin's failing or panicking install
//!   hook never aborts its siblings
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrule::{PluginEngine, PluginDescriptor, Fingerprint, HostSnapshot};
//!
//! let mut engine = PluginEngine::default_config();
//!
//! engine.register(
//!     PluginDescriptor::builder("redis-commands")
//!         .fingerprint(Fingerprint::new().with_symbol("redis::Client", ["connect()"]))
//!         .build()?,
//!     |ctx: &ferrule::InstallContext<'_>| {
//!         // wire the plugin's private dependencies into its scope
//!         Ok(())
//!     },
//! )?;
//!
//! let snapshot = HostSnapshot::builder()
//!     .symbol("redis::Client", ["connect()", "get(key)"])
//!     .build();
//!
//! engine.activate(&snapshot)?;
//! assert!(engine.is_enabled("redis-commands"));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Descriptor catalog and enablement parsing (TOML/JSON)
//! - `metrics-prometheus`: Prometheus metrics integration

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod activator;
mod descriptor;
mod enablement;
mod engine;
mod error;
mod fingerprint;
mod graph;
mod registry;
mod resolver;
mod scope;

#[cfg(feature = "metrics-prometheus")]
mod metrics;

pub use activator::{Activator, HookSet, InstallContext, InstallHook};
pub use descriptor::{DescriptorBuilder, DescriptorSet, IsolationMode, PluginDescriptor};
pub use enablement::{Enablement, RuleSpec};
pub use engine::{EngineConfig, PluginEngine};
pub use error::{Error, Result};
pub use fingerprint::{Fingerprint, HostSnapshot, MatchOutcome, SnapshotBuilder};
pub use graph::{Cycle, Digraph};
pub use registry::{ActivationRegistry, ActivationStats, ActivationStatus, SkipReason};
pub use resolver::{ActivationPlan, Decision, PlanEntry, PluginResolver, ResolverConfig};
pub use scope::{Artifact, Bridge, IsolationScope, ScopeManager, SHARED_SCOPE};

#[cfg(feature = "metrics-prometheus")]
pub use metrics::{ActivationMetrics, MetricsConfig};

/// Crate version for compatibility checks.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
