//! Activation status registry and diagnostic reporting.

use dashmap::DashMap;
use parking_lot::RwLock;

/// Why a plugin was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No declared fingerprint matched the host snapshot.
    Incompatible,
    /// An enablement rule disabled the plugin.
    Disabled,
    /// A mutually exclusive plugin activated instead.
    Conflict {
        /// The plugin that won the exclusion.
        winner: String,
    },
}

/// Terminal per-plugin record, written once by the activator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationStatus {
    /// The install hook ran successfully.
    Active,
    /// The plan skipped the plugin; nothing was invoked.
    Skipped(SkipReason),
    /// Scope setup or the install hook failed.
    Error(String),
}

impl ActivationStatus {
    /// True for [`ActivationStatus::Active`].
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Diagnostic token for this status.
    pub fn token(&self) -> String {
        match self {
            Self::Active => "ACTIVE".to_string(),
            Self::Skipped(SkipReason::Incompatible) => "SKIPPED_INCOMPATIBLE".to_string(),
            Self::Skipped(SkipReason::Disabled) => "SKIPPED_DISABLED".to_string(),
            Self::Skipped(SkipReason::Conflict { winner }) => {
                format!("SKIPPED_CONFLICT:{}", winner)
            }
            Self::Error(cause) => format!("ERROR:{}", cause),
        }
    }
}

impl std::fmt::Display for ActivationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Aggregate activation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationStats {
    /// Total plugins recorded.
    pub total: usize,
    /// Plugins that activated.
    pub active: usize,
    /// Plugins skipped by the plan.
    pub skipped: usize,
    /// Plugins that failed during activation.
    pub errored: usize,
}

impl std::fmt::Display for ActivationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} active, {} skipped, {} errors ({} total)",
            self.active, self.skipped, self.errored, self.total
        )
    }
}

/// Per-plugin activation outcomes.
///
/// Written during the single-threaded activation phase; afterwards the
/// map is read-only and safe for unsynchronized concurrent reads. The
/// interception layer's hot-path query is [`ActivationRegistry::is_enabled`],
/// which performs no allocation.
pub struct ActivationRegistry {
    statuses: DashMap<String, ActivationStatus>,
    order: RwLock<Vec<String>>,
}

impl ActivationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            statuses: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Record a plugin's terminal status.
    ///
    /// Statuses are write-once; a second record for the same id is ignored
    /// and logged.
    pub fn record(&self, id: impl Into<String>, status: ActivationStatus) {
        let id = id.into();
        if self.statuses.contains_key(&id) {
            tracing::warn!(plugin = %id, "status already recorded, ignoring");
            return;
        }
        self.order.write().push(id.clone());
        self.statuses.insert(id, status);
    }

    /// Look up a plugin's status.
    pub fn status(&self, id: &str) -> Option<ActivationStatus> {
        self.statuses.get(id).map(|s| s.clone())
    }

    /// True iff the plugin ended [`ActivationStatus::Active`].
    ///
    /// Safe to call from any thread at any frequency; unknown ids are
    /// simply not enabled.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.statuses
            .get(id)
            .map(|s| s.is_active())
            .unwrap_or(false)
    }

    /// Plugin ids in the order they were recorded (plan order).
    pub fn ids(&self) -> Vec<String> {
        self.order.read().clone()
    }

    /// Ids of active plugins, in plan order.
    pub fn active_ids(&self) -> Vec<String> {
        self.order
            .read()
            .iter()
            .filter(|id| self.is_enabled(id))
            .cloned()
            .collect()
    }

    /// Number of recorded plugins.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Aggregate counts.
    pub fn stats(&self) -> ActivationStats {
        let mut stats = ActivationStats::default();
        for entry in self.statuses.iter() {
            stats.total += 1;
            match entry.value() {
                ActivationStatus::Active => stats.active += 1,
                ActivationStatus::Skipped(_) => stats.skipped += 1,
                ActivationStatus::Error(_) => stats.errored += 1,
            }
        }
        stats
    }

    /// Diagnostic lines, one per plugin in plan order.
    pub fn report_lines(&self) -> Vec<String> {
        self.order
            .read()
            .iter()
            .filter_map(|id| {
                self.statuses
                    .get(id)
                    .map(|status| format!("{} {}", id, status.token()))
            })
            .collect()
    }

    /// Full diagnostic report: one line per plugin plus a summary count.
    pub fn report(&self) -> String {
        let mut lines = self.report_lines();
        lines.push(self.stats().to_string());
        lines.join("\n")
    }
}

impl Default for ActivationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActivationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}
