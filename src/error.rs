//! Error types for resolution and activation operations.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during plugin resolution and activation.
#[derive(Error, Debug)]
pub enum Error {
    /// Plugin not found.
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// Two descriptors declared the same identifier.
    #[error("duplicate plugin identifier: {0}")]
    DuplicatePlugin(String),

    /// Invalid descriptor.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Missing required descriptor field.
    #[error("missing required descriptor field: {0}")]
    MissingDescriptorField(String),

    /// The ordering constraints form a cycle.
    #[error("ordering cycle among plugins: {}", .plugins.join(", "))]
    CycleDetected {
        /// Identifiers of every plugin in the non-orderable residual set.
        plugins: Vec<String>,
    },

    /// Malformed fingerprint data.
    #[error("fingerprint load error: {0}")]
    FingerprintLoad(String),

    /// Invalid enablement glob pattern.
    #[error("invalid enablement pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The offending pattern string.
        pattern: String,
        /// Why it failed to compile.
        reason: String,
    },

    /// A plugin's install hook failed.
    #[error("activation failed: {0}")]
    Activation(String),

    /// Isolation scope creation or population failed.
    #[error("isolation setup failed: {0}")]
    IsolationSetup(String),

    /// A bridge name was exported twice.
    #[error("duplicate bridge export `{name}` in scope `{scope}`")]
    DuplicateExport {
        /// Scope the export was attempted on.
        scope: String,
        /// Name already present on the bridge.
        name: String,
    },

    /// No install hook was registered for a plugin the plan activates.
    #[error("no install hook registered for plugin: {0}")]
    MissingHook(String),

    /// The engine has already run its activation pass.
    #[error("engine already activated")]
    AlreadyActivated,

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor or fingerprint parse error.
    #[cfg(feature = "serde")]
    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Create a plugin not found error.
    pub fn plugin_not_found(id: impl Into<String>) -> Self {
        Self::PluginNotFound(id.into())
    }

    /// Create an invalid descriptor error.
    pub fn invalid_descriptor(msg: impl Into<String>) -> Self {
        Self::InvalidDescriptor(msg.into())
    }

    /// Create a missing descriptor field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingDescriptorField(field.into())
    }

    /// Create a cycle error from the residual node set.
    pub fn cycle(plugins: Vec<String>) -> Self {
        Self::CycleDetected { plugins }
    }

    /// Create a fingerprint load error.
    pub fn fingerprint_load(msg: impl Into<String>) -> Self {
        Self::FingerprintLoad(msg.into())
    }

    /// Create an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create an activation error.
    pub fn activation_failed(msg: impl Into<String>) -> Self {
        Self::Activation(msg.into())
    }

    /// Create an isolation setup error.
    pub fn isolation_setup(msg: impl Into<String>) -> Self {
        Self::IsolationSetup(msg.into())
    }

    /// Create a duplicate export error.
    pub fn duplicate_export(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DuplicateExport {
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// Returns true if this error aborts plan construction entirely.
    ///
    /// Everything else is contained to a single plugin: the resolver or
    /// activator records it and continues with the remaining plugins.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::CycleDetected { .. }
            | Self::DuplicatePlugin(_)
            | Self::InvalidPattern { .. }
            | Self::AlreadyActivated
            | Self::Io(_) => true,
            #[cfg(feature = "serde")]
            Self::Parse(_) => true,
            _ => false,
        }
    }
}
