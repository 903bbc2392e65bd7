//! Isolation scopes: private, name-scoped artifact tables per plugin.
//!
//! Each isolated plugin resolves names against its own artifact table
//! first and falls back to one process-wide bridge of explicitly exported
//! host symbols. Two isolated plugins can hold same-named, differently
//! versioned artifacts without ever observing each other's. Plugins that
//! opt out of isolation share a single default scope.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::descriptor::IsolationMode;
use crate::error::{Error, Result};

/// A name-scoped artifact value.
///
/// Callers downcast at the boundary; see [`IsolationScope::resolve_as`].
pub type Artifact = Arc<dyn Any + Send + Sync>;

/// Identifier of the process-wide default scope.
pub const SHARED_SCOPE: &str = "shared";

/// The append-only bridge of host symbols visible to every scope.
///
/// Writes happen during the single-threaded activation phase and are
/// guarded; afterwards the surface is read-only and safe to query from
/// any thread.
#[derive(Default)]
pub struct Bridge {
    exports: RwLock<HashMap<String, Artifact>>,
}

impl Bridge {
    fn new() -> Self {
        Self::default()
    }

    fn export(&self, scope: &str, name: &str, value: Artifact) -> Result<()> {
        let mut exports = self.exports.write();
        if exports.contains_key(name) {
            return Err(Error::duplicate_export(scope, name));
        }
        exports.insert(name.to_string(), value);
        Ok(())
    }

    fn resolve(&self, name: &str) -> Option<Artifact> {
        self.exports.read().get(name).cloned()
    }

    /// Names currently exported on the bridge.
    pub fn names(&self) -> Vec<String> {
        self.exports.read().keys().cloned().collect()
    }

    /// Number of exported names.
    pub fn len(&self) -> usize {
        self.exports.read().len()
    }

    /// True if nothing has been exported.
    pub fn is_empty(&self) -> bool {
        self.exports.read().is_empty()
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("export_count", &self.len())
            .finish()
    }
}

/// A private loading boundary for one plugin's supporting code.
pub struct IsolationScope {
    id: String,
    private: RwLock<HashMap<String, Artifact>>,
    bridge: Arc<Bridge>,
}

impl IsolationScope {
    fn new(id: impl Into<String>, bridge: Arc<Bridge>) -> Self {
        Self {
            id: id.into(),
            private: RwLock::new(HashMap::new()),
            bridge,
        }
    }

    /// Scope identifier: the owning plugin id, or [`SHARED_SCOPE`].
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Install a private artifact. Append-only; redefining a name fails.
    pub fn define(&self, name: impl Into<String>, value: Artifact) -> Result<()> {
        let name = name.into();
        let mut private = self.private.write();
        if private.contains_key(&name) {
            return Err(Error::isolation_setup(format!(
                "artifact `{}` already defined in scope `{}`",
                name, self.id
            )));
        }
        tracing::debug!(scope = %self.id, artifact = %name, "defined private artifact");
        private.insert(name, value);
        Ok(())
    }

    /// Export a host symbol on the shared bridge. Append-only.
    pub fn export_bridge(&self, name: &str, value: Artifact) -> Result<()> {
        self.bridge.export(&self.id, name, value)?;
        tracing::debug!(scope = %self.id, export = %name, "exported bridge symbol");
        Ok(())
    }

    /// Resolve a name: private artifacts first, then the shared bridge.
    pub fn resolve(&self, name: &str) -> Option<Artifact> {
        if let Some(value) = self.private.read().get(name) {
            return Some(value.clone());
        }
        self.bridge.resolve(name)
    }

    /// Resolve and downcast a name to a concrete type.
    pub fn resolve_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.resolve(name).and_then(|value| value.downcast::<T>().ok())
    }

    /// True if the scope holds a private artifact under `name`.
    pub fn defines(&self, name: &str) -> bool {
        self.private.read().contains_key(name)
    }

    /// Number of private artifacts.
    pub fn len(&self) -> usize {
        self.private.read().len()
    }

    /// True if the scope holds no private artifacts.
    pub fn is_empty(&self) -> bool {
        self.private.read().is_empty()
    }
}

impl std::fmt::Debug for IsolationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolationScope")
            .field("id", &self.id)
            .field("artifact_count", &self.len())
            .finish()
    }
}

/// Owner of every isolation scope in the process.
pub struct ScopeManager {
    scopes: DashMap<String, Arc<IsolationScope>>,
    shared: Arc<IsolationScope>,
    bridge: Arc<Bridge>,
}

impl ScopeManager {
    /// Create a manager with an empty bridge and default shared scope.
    pub fn new() -> Self {
        let bridge = Arc::new(Bridge::new());
        let shared = Arc::new(IsolationScope::new(SHARED_SCOPE, bridge.clone()));
        Self {
            scopes: DashMap::new(),
            shared,
            bridge,
        }
    }

    /// Acquire the scope for a plugin, creating it on first use.
    ///
    /// Idempotent per identifier: later calls return the scope the first
    /// call created, regardless of the mode they pass. Shared-mode plugins
    /// all receive the one process-wide default scope. Scopes are held for
    /// the life of the manager and never released.
    pub fn acquire(&self, id: &str, mode: IsolationMode) -> Arc<IsolationScope> {
        self.scopes
            .entry(id.to_string())
            .or_insert_with(|| match mode {
                IsolationMode::Shared => self.shared.clone(),
                IsolationMode::Isolated => {
                    tracing::debug!(plugin = %id, "created isolation scope");
                    Arc::new(IsolationScope::new(id, self.bridge.clone()))
                }
            })
            .clone()
    }

    /// Look up a previously acquired scope.
    pub fn get(&self, id: &str) -> Option<Arc<IsolationScope>> {
        self.scopes.get(id).map(|s| s.clone())
    }

    /// The process-wide default scope.
    pub fn shared(&self) -> &Arc<IsolationScope> {
        &self.shared
    }

    /// The shared bridge surface.
    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    /// Number of plugin identifiers with an acquired scope.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// True if no scope has been acquired yet.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScopeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeManager")
            .field("scope_count", &self.scopes.len())
            .field("bridge", &self.bridge)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(s: &str) -> Artifact {
        Arc::new(s.to_string())
    }

    #[test]
    fn test_acquire_is_idempotent() {
        let manager = ScopeManager::new();

        let first = manager.acquire("redis-commands", IsolationMode::Isolated);
        let again = manager.acquire("redis-commands", IsolationMode::Isolated);

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_isolated_scopes_do_not_collide() {
        let manager = ScopeManager::new();

        let a = manager.acquire("client-v1", IsolationMode::Isolated);
        let b = manager.acquire("client-v2", IsolationMode::Isolated);

        a.define("driver", artifact("driver 1.x")).unwrap();
        b.define("driver", artifact("driver 2.x")).unwrap();

        assert_eq!(
            a.resolve_as::<String>("driver").unwrap().as_str(),
            "driver 1.x"
        );
        assert_eq!(
            b.resolve_as::<String>("driver").unwrap().as_str(),
            "driver 2.x"
        );
    }

    #[test]
    fn test_shared_scope_is_one_scope() {
        let manager = ScopeManager::new();

        let a = manager.acquire("log-enricher", IsolationMode::Shared);
        let b = manager.acquire("metrics-export", IsolationMode::Shared);

        assert!(Arc::ptr_eq(&a, &b));
        a.define("registry", artifact("shared registry")).unwrap();
        assert!(b.defines("registry"));
    }

    #[test]
    fn test_resolve_falls_back_to_bridge() {
        let manager = ScopeManager::new();
        let scope = manager.acquire("redis-commands", IsolationMode::Isolated);

        scope.export_bridge("tracer", artifact("host tracer")).unwrap();
        assert!(!scope.defines("tracer"));
        assert_eq!(
            scope.resolve_as::<String>("tracer").unwrap().as_str(),
            "host tracer"
        );

        // Other scopes see the same bridge export.
        let other = manager.acquire("kafka-producer", IsolationMode::Isolated);
        assert!(other.resolve("tracer").is_some());
    }

    #[test]
    fn test_private_shadows_bridge() {
        let manager = ScopeManager::new();
        let scope = manager.acquire("redis-commands", IsolationMode::Isolated);

        scope.export_bridge("codec", artifact("bridge codec")).unwrap();
        scope.define("codec", artifact("private codec")).unwrap();

        assert_eq!(
            scope.resolve_as::<String>("codec").unwrap().as_str(),
            "private codec"
        );
    }

    #[test]
    fn test_duplicate_bridge_export_fails() {
        let manager = ScopeManager::new();
        let a = manager.acquire("a", IsolationMode::Isolated);
        let b = manager.acquire("b", IsolationMode::Isolated);

        a.export_bridge("tracer", artifact("first")).unwrap();
        let result = b.export_bridge("tracer", artifact("second"));

        assert!(matches!(result, Err(Error::DuplicateExport { .. })));
        // First export is untouched.
        assert_eq!(
            b.resolve_as::<String>("tracer").unwrap().as_str(),
            "first"
        );
    }

    #[test]
    fn test_duplicate_define_fails() {
        let manager = ScopeManager::new();
        let scope = manager.acquire("a", IsolationMode::Isolated);

        scope.define("driver", artifact("one")).unwrap();
        let result = scope.define("driver", artifact("two"));
        assert!(matches!(result, Err(Error::IsolationSetup(_))));
    }

    #[test]
    fn test_resolve_missing_is_none() {
        let manager = ScopeManager::new();
        let scope = manager.acquire("a", IsolationMode::Isolated);
        assert!(scope.resolve("nothing").is_none());
    }

    #[test]
    fn test_downcast_mismatch_is_none() {
        let manager = ScopeManager::new();
        let scope = manager.acquire("a", IsolationMode::Isolated);
        scope.define("counter", Arc::new(7u64) as Artifact).unwrap();

        assert!(scope.resolve_as::<String>("counter").is_none());
        assert_eq!(*scope.resolve_as::<u64>("counter").unwrap(), 7);
    }
}
