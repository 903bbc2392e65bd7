//! Plugin descriptor schema and validation.

#[cfg(feature = "serde")]
use std::path::Path;

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;

/// How a plugin's supporting code is scoped during activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum IsolationMode {
    /// Private scope; same-named dependencies of other plugins are invisible.
    #[default]
    Isolated,
    /// Process-wide default scope shared with every other non-isolated plugin.
    Shared,
}

impl std::fmt::Display for IsolationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Isolated => "isolated",
            Self::Shared => "shared",
        };
        write!(f, "{}", name)
    }
}

/// Declarative description of one capability plugin.
///
/// Created once at process startup from static configuration and immutable
/// thereafter; the resolver consumes a set of these.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PluginDescriptor {
    /// Unique, stable plugin identifier.
    pub id: String,

    /// Plugins this one must precede.
    #[cfg_attr(feature = "serde", serde(default))]
    pub before: Vec<String>,

    /// Plugins this one must follow.
    #[cfg_attr(feature = "serde", serde(default))]
    pub after: Vec<String>,

    /// Mutually exclusive plugins; at most one of the pair activates.
    #[cfg_attr(feature = "serde", serde(default))]
    pub conflicts_with: Vec<String>,

    /// Scope requirement for the plugin's private dependencies.
    #[cfg_attr(feature = "serde", serde(default))]
    pub isolation: IsolationMode,

    /// Fingerprints in declaration order, most specific first.
    ///
    /// Matching stops at the first compatible one. An empty list means the
    /// plugin has no library precondition.
    #[cfg_attr(feature = "serde", serde(default))]
    pub fingerprints: Vec<Fingerprint>,
}

impl PluginDescriptor {
    /// Create a descriptor with just an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            before: Vec::new(),
            after: Vec::new(),
            conflicts_with: Vec::new(),
            isolation: IsolationMode::default(),
            fingerprints: Vec::new(),
        }
    }

    /// Start building a descriptor.
    pub fn builder(id: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(id)
    }

    /// Validate the descriptor's structure.
    ///
    /// Fingerprint contents are deliberately not checked here: malformed
    /// fingerprints are a per-plugin resolution concern, handled by
    /// [`PluginDescriptor::validate_fingerprints`] so that one bad plugin
    /// never aborts loading of a whole catalog.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::missing_field("id"));
        }

        for (relation, ids) in [
            ("before", &self.before),
            ("after", &self.after),
            ("conflicts_with", &self.conflicts_with),
        ] {
            if ids.iter().any(|other| other == &self.id) {
                return Err(Error::invalid_descriptor(format!(
                    "plugin `{}` references itself in `{}`",
                    self.id, relation
                )));
            }
            if ids.iter().any(|other| other.is_empty()) {
                return Err(Error::invalid_descriptor(format!(
                    "plugin `{}` has an empty identifier in `{}`",
                    self.id, relation
                )));
            }
        }

        Ok(())
    }

    /// Validate every declared fingerprint.
    pub fn validate_fingerprints(&self) -> Result<()> {
        for fp in &self.fingerprints {
            fp.validate()?;
        }
        Ok(())
    }

    /// True if the plugin declares a conflict with `other`.
    pub fn conflicts_with(&self, other: &str) -> bool {
        self.conflicts_with.iter().any(|id| id == other)
    }

    /// True if the plugin requested a private isolation scope.
    pub fn is_isolated(&self) -> bool {
        self.isolation == IsolationMode::Isolated
    }
}

/// Builder for creating descriptors.
pub struct DescriptorBuilder {
    descriptor: PluginDescriptor,
}

impl DescriptorBuilder {
    /// Create a new descriptor builder.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            descriptor: PluginDescriptor::new(id),
        }
    }

    /// Add a fingerprint (declaration order is matching order).
    pub fn fingerprint(mut self, fp: Fingerprint) -> Self {
        self.descriptor.fingerprints.push(fp);
        self
    }

    /// Require this plugin to precede another.
    pub fn before(mut self, id: impl Into<String>) -> Self {
        self.descriptor.before.push(id.into());
        self
    }

    /// Require this plugin to follow another.
    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.descriptor.after.push(id.into());
        self
    }

    /// Declare a mutual exclusion with another plugin.
    pub fn conflicts_with(mut self, id: impl Into<String>) -> Self {
        self.descriptor.conflicts_with.push(id.into());
        self
    }

    /// Set the isolation mode.
    pub fn isolation(mut self, mode: IsolationMode) -> Self {
        self.descriptor.isolation = mode;
        self
    }

    /// Opt out of isolation into the shared scope.
    pub fn shared(mut self) -> Self {
        self.descriptor.isolation = IsolationMode::Shared;
        self
    }

    /// Build and validate the descriptor.
    pub fn build(self) -> Result<PluginDescriptor> {
        self.descriptor.validate()?;
        Ok(self.descriptor)
    }

    /// Build without validation.
    pub fn build_unchecked(self) -> PluginDescriptor {
        self.descriptor
    }
}

/// A whole plugin catalog: descriptors plus enablement rules.
///
/// This is the on-disk form a host hands to the engine; parsing is gated
/// on the `serde` feature.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DescriptorSet {
    /// Declared plugins.
    #[cfg_attr(feature = "serde", serde(default))]
    pub plugins: Vec<PluginDescriptor>,

    /// Ordered enablement rules.
    #[cfg_attr(feature = "serde", serde(default))]
    pub enablement: Vec<crate::enablement::RuleSpec>,
}

impl DescriptorSet {
    /// Load a catalog from a TOML file.
    #[cfg(feature = "serde")]
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a catalog from a TOML string.
    #[cfg(feature = "serde")]
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Parse a catalog from a JSON string.
    #[cfg(feature = "serde")]
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Serialize to a TOML string.
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Serialize to a JSON string.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Validate every descriptor's structure.
    pub fn validate(&self) -> Result<()> {
        for descriptor in &self.plugins {
            descriptor.validate()?;
        }
        Ok(())
    }
}
