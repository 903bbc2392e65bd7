//! Bulkhead activation of a resolved plan.
//!
//! The activator walks an [`ActivationPlan`] strictly in order and invokes
//! each activating plugin's install hook inside its isolation scope. A
//! hook that returns an error or panics is recorded and contained; the
//! remaining plugins are unaffected.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::registry::{ActivationRegistry, ActivationStatus, SkipReason};
use crate::resolver::{ActivationPlan, Decision};
use crate::scope::{IsolationScope, ScopeManager};

/// Everything an install hook sees: its plugin id and isolation scope.
pub struct InstallContext<'a> {
    id: &'a str,
    scope: &'a Arc<IsolationScope>,
}

impl<'a> InstallContext<'a> {
    /// The plugin being installed.
    pub fn id(&self) -> &str {
        self.id
    }

    /// The plugin's isolation scope.
    pub fn scope(&self) -> &IsolationScope {
        self.scope
    }
}

impl std::fmt::Debug for InstallContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallContext")
            .field("id", &self.id)
            .field("scope", &self.scope.id())
            .finish()
    }
}

/// A plugin's install entry point, invoked once inside its scope.
pub trait InstallHook: Send + Sync {
    /// Install the plugin.
    fn install(&self, ctx: &InstallContext<'_>) -> Result<()>;
}

impl<F> InstallHook for F
where
    F: Fn(&InstallContext<'_>) -> Result<()> + Send + Sync,
{
    fn install(&self, ctx: &InstallContext<'_>) -> Result<()> {
        self(ctx)
    }
}

/// Install hooks keyed by plugin id.
#[derive(Default)]
pub struct HookSet {
    hooks: HashMap<String, Box<dyn InstallHook>>,
}

impl HookSet {
    /// Create an empty hook set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin's install hook.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        hook: impl InstallHook + 'static,
    ) -> Result<()> {
        let id = id.into();
        if self.hooks.contains_key(&id) {
            return Err(Error::DuplicatePlugin(id));
        }
        self.hooks.insert(id, Box::new(hook));
        Ok(())
    }

    /// Look up a hook by plugin id.
    pub fn get(&self, id: &str) -> Option<&dyn InstallHook> {
        self.hooks.get(id).map(|h| h.as_ref())
    }

    /// True if a hook is registered for the plugin.
    pub fn contains(&self, id: &str) -> bool {
        self.hooks.contains_key(id)
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// True if no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl std::fmt::Debug for HookSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSet")
            .field("hook_count", &self.hooks.len())
            .finish()
    }
}

/// Applies an activation plan, one plugin at a time.
pub struct Activator {
    scopes: Arc<ScopeManager>,
}

impl Activator {
    /// Create an activator over the given scope manager.
    pub fn new(scopes: Arc<ScopeManager>) -> Self {
        Self { scopes }
    }

    /// The scope manager the activator installs into.
    pub fn scopes(&self) -> &Arc<ScopeManager> {
        &self.scopes
    }

    /// Apply the plan and record one terminal status per plugin.
    ///
    /// Walks entries strictly in plan order. A hook that errors or panics
    /// (or is missing entirely) is recorded as [`ActivationStatus::Error`]
    /// and never aborts the remaining plugins, so this returns the
    /// registry rather than a `Result`.
    pub fn apply(&self, plan: &ActivationPlan, hooks: &HookSet) -> ActivationRegistry {
        let registry = ActivationRegistry::new();

        for entry in plan.entries() {
            let id = entry.descriptor.id.as_str();
            let status = match &entry.decision {
                Decision::Activate => self.activate(id, entry, hooks),
                Decision::SkipIncompatible => {
                    tracing::info!(plugin = %id, "skipped: incompatible");
                    ActivationStatus::Skipped(SkipReason::Incompatible)
                }
                Decision::SkipDisabled => {
                    tracing::info!(plugin = %id, "skipped: disabled");
                    ActivationStatus::Skipped(SkipReason::Disabled)
                }
                Decision::SkipConflict { winner } => {
                    tracing::info!(plugin = %id, winner = %winner, "skipped: conflict");
                    ActivationStatus::Skipped(SkipReason::Conflict {
                        winner: winner.clone(),
                    })
                }
            };
            registry.record(id, status);
        }

        tracing::info!(summary = %registry.stats(), "activation complete");
        registry
    }

    // Helper methods

    fn activate(
        &self,
        id: &str,
        entry: &crate::resolver::PlanEntry,
        hooks: &HookSet,
    ) -> ActivationStatus {
        let Some(hook) = hooks.get(id) else {
            let err = Error::MissingHook(id.to_string());
            tracing::error!(plugin = %id, "{}", err);
            return ActivationStatus::Error(err.to_string());
        };

        let scope = self.scopes.acquire(id, entry.descriptor.isolation);
        let ctx = InstallContext { id, scope: &scope };

        match panic::catch_unwind(AssertUnwindSafe(|| hook.install(&ctx))) {
            Ok(Ok(())) => {
                tracing::info!(plugin = %id, scope = %scope.id(), "activated");
                ActivationStatus::Active
            }
            Ok(Err(e)) => {
                tracing::error!(plugin = %id, error = %e, "install hook failed");
                ActivationStatus::Error(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload);
                tracing::error!(plugin = %id, panic = %message, "install hook panicked");
                ActivationStatus::Error(format!("install hook panicked: {}", message))
            }
        }
    }
}

impl std::fmt::Debug for Activator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Activator")
            .field("scopes", &self.scopes)
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
