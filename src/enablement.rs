//! Enablement configuration: ordered include/exclude patterns.
//!
//! Rules are glob patterns over plugin identifiers. Among all rules whose
//! pattern matches an identifier, the longest pattern wins (the most
//! specific declaration); equally long patterns are won by the later
//! declaration. An identifier no rule matches is enabled.

use glob::Pattern;

use crate::error::{Error, Result};

/// Raw, serializable form of one enablement rule.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleSpec {
    /// Glob pattern over plugin identifiers.
    pub pattern: String,
    /// Whether matching plugins are enabled.
    #[cfg_attr(feature = "serde", serde(default = "default_enabled"))]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl RuleSpec {
    /// Create an include rule.
    pub fn include(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            enabled: true,
        }
    }

    /// Create an exclude rule.
    pub fn exclude(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            enabled: false,
        }
    }
}

/// One compiled enablement rule.
#[derive(Debug, Clone)]
struct EnablementRule {
    pattern: Pattern,
    raw: String,
    enabled: bool,
}

/// Ordered enablement rules over plugin identifiers.
#[derive(Debug, Clone, Default)]
pub struct Enablement {
    rules: Vec<EnablementRule>,
}

impl Enablement {
    /// Create an empty configuration (everything enabled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a list of rule specs, preserving declaration order.
    pub fn from_specs<'a, I>(specs: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a RuleSpec>,
    {
        let mut enablement = Self::new();
        for spec in specs {
            enablement = enablement.rule(&spec.pattern, spec.enabled)?;
        }
        Ok(enablement)
    }

    /// Append a rule. Fails on an invalid glob pattern.
    pub fn rule(mut self, pattern: &str, enabled: bool) -> Result<Self> {
        let compiled = Pattern::new(pattern)
            .map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
        self.rules.push(EnablementRule {
            pattern: compiled,
            raw: pattern.to_string(),
            enabled,
        });
        Ok(self)
    }

    /// Append an include rule.
    pub fn include(self, pattern: &str) -> Result<Self> {
        self.rule(pattern, true)
    }

    /// Append an exclude rule.
    pub fn exclude(self, pattern: &str) -> Result<Self> {
        self.rule(pattern, false)
    }

    /// Decide whether a plugin identifier is enabled.
    ///
    /// Longest matching pattern wins; among equally long matches the later
    /// declaration wins; no match defaults to enabled.
    pub fn is_enabled(&self, id: &str) -> bool {
        let mut decision = true;
        let mut best_len = 0usize;

        for rule in &self.rules {
            if rule.pattern.matches(id) && rule.raw.len() >= best_len {
                best_len = rule.raw.len();
                decision = rule.enabled;
            }
        }

        decision
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True if no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enabled() {
        let enablement = Enablement::new();
        assert!(enablement.is_enabled("anything"));
    }

    #[test]
    fn test_exclude_pattern() {
        let enablement = Enablement::new().exclude("redis.*").unwrap();

        assert!(!enablement.is_enabled("redis.commands"));
        assert!(!enablement.is_enabled("redis.pipeline"));
        assert!(enablement.is_enabled("kafka.producer"));
    }

    #[test]
    fn test_specific_include_overrides_broad_exclude() {
        let enablement = Enablement::new()
            .exclude("redis.*")
            .unwrap()
            .include("redis.commands")
            .unwrap();

        assert!(enablement.is_enabled("redis.commands"));
        assert!(!enablement.is_enabled("redis.pipeline"));
    }

    #[test]
    fn test_rule_order_irrelevant_for_length() {
        // The longer pattern wins regardless of declaration order.
        let enablement = Enablement::new()
            .include("redis.commands")
            .unwrap()
            .exclude("redis.*")
            .unwrap();

        assert!(enablement.is_enabled("redis.commands"));
        assert!(!enablement.is_enabled("redis.pipeline"));
    }

    #[test]
    fn test_equal_length_later_wins() {
        let enablement = Enablement::new()
            .exclude("redis.?")
            .unwrap()
            .include("redis.?")
            .unwrap();

        assert!(enablement.is_enabled("redis.a"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = Enablement::new().include("redis.[");
        assert!(matches!(result, Err(Error::InvalidPattern { .. })));
    }

    #[test]
    fn test_from_specs() {
        let specs = [RuleSpec::exclude("experimental.*"), RuleSpec::include("experimental.stable")];
        let enablement = Enablement::from_specs(&specs).unwrap();

        assert_eq!(enablement.len(), 2);
        assert!(!enablement.is_enabled("experimental.shiny"));
        assert!(enablement.is_enabled("experimental.stable"));
        assert!(enablement.is_enabled("core.anything"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_rule_spec_default_enabled() {
        let spec: RuleSpec = toml::from_str(r#"pattern = "redis.*""#).unwrap();
        assert!(spec.enabled);
    }
}
