//! Fingerprint schema and compatibility matching.
//!
//! A fingerprint declares the symbols and member signatures a plugin needs
//! to see in the host process before it can safely activate. Matching is
//! purely structural: every required pair must be present, anything extra
//! the host exposes is ignored.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::{Error, Result};

/// Outcome of matching one fingerprint against a host snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOutcome {
    /// Every required symbol and member is present.
    Compatible,
    /// At least one required symbol or member is absent.
    Incompatible,
}

impl MatchOutcome {
    /// True for [`MatchOutcome::Compatible`].
    pub fn is_compatible(&self) -> bool {
        matches!(self, Self::Compatible)
    }
}

impl std::fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Compatible => "compatible",
            Self::Incompatible => "incompatible",
        };
        write!(f, "{}", name)
    }
}

/// Required symbols and member signatures for one target-library revision.
///
/// Ordered maps keep iteration and serialized form deterministic. A plugin
/// declares several fingerprints to span multiple major versions of its
/// target library; see [`Fingerprint::match_any`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fingerprint {
    /// Symbol name to the member signatures required on it.
    pub symbols: BTreeMap<String, BTreeSet<String>>,
}

impl Fingerprint {
    /// Create an empty fingerprint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required symbol with its member signatures.
    pub fn with_symbol<I, S>(mut self, symbol: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols
            .entry(symbol.into())
            .or_default()
            .extend(members.into_iter().map(Into::into));
        self
    }

    /// Validate the fingerprint data.
    ///
    /// A fingerprint with no symbols, an empty symbol name, or an empty
    /// member signature is malformed and reported per-plugin; it never
    /// aborts matching of other plugins.
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(Error::fingerprint_load("fingerprint declares no symbols"));
        }

        for (symbol, members) in &self.symbols {
            if symbol.is_empty() {
                return Err(Error::fingerprint_load("empty symbol name"));
            }
            if members.is_empty() {
                return Err(Error::fingerprint_load(format!(
                    "symbol `{}` declares no members",
                    symbol
                )));
            }
            if members.iter().any(|m| m.is_empty()) {
                return Err(Error::fingerprint_load(format!(
                    "symbol `{}` declares an empty member signature",
                    symbol
                )));
            }
        }

        Ok(())
    }

    /// Match this fingerprint against a host snapshot.
    pub fn matches(&self, snapshot: &HostSnapshot) -> MatchOutcome {
        for (symbol, members) in &self.symbols {
            let Some(exposed) = snapshot.members(symbol) else {
                return MatchOutcome::Incompatible;
            };
            if !members.iter().all(|m| exposed.contains(m)) {
                return MatchOutcome::Incompatible;
            }
        }
        MatchOutcome::Compatible
    }

    /// Match a list of fingerprints in declaration order.
    ///
    /// Returns the index of the first compatible fingerprint, stopping
    /// there; `None` means none matched. An empty list is treated as
    /// having no library precondition and matches trivially at index 0.
    pub fn match_any(fingerprints: &[Fingerprint], snapshot: &HostSnapshot) -> Option<usize> {
        if fingerprints.is_empty() {
            return Some(0);
        }
        fingerprints
            .iter()
            .position(|fp| fp.matches(snapshot).is_compatible())
    }

    /// Number of required symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True if the fingerprint declares no symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Read-only view of the symbols visible in the running process.
///
/// Produced once by the host at resolution time via [`SnapshotBuilder`]
/// and never mutated by the engine; refreshing it is the host's concern.
#[derive(Debug, Clone, Default)]
pub struct HostSnapshot {
    symbols: HashMap<String, HashSet<String>>,
}

impl HostSnapshot {
    /// Create an empty snapshot (a host exposing nothing).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a snapshot.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Check whether a symbol is visible.
    pub fn contains_symbol(&self, symbol: &str) -> bool {
        self.symbols.contains_key(symbol)
    }

    /// Check whether a symbol exposes a member signature.
    pub fn has_member(&self, symbol: &str, member: &str) -> bool {
        self.symbols
            .get(symbol)
            .map(|members| members.contains(member))
            .unwrap_or(false)
    }

    /// Member signatures exposed by a symbol, if visible.
    pub fn members(&self, symbol: &str) -> Option<&HashSet<String>> {
        self.symbols.get(symbol)
    }

    /// Number of visible symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True if no symbols are visible.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Builder for [`HostSnapshot`].
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    symbols: HashMap<String, HashSet<String>>,
}

impl SnapshotBuilder {
    /// Create a new snapshot builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a visible symbol and the members it exposes.
    pub fn symbol<I, S>(mut self, symbol: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols
            .entry(symbol.into())
            .or_default()
            .extend(members.into_iter().map(Into::into));
        self
    }

    /// Finish the snapshot.
    pub fn build(self) -> HostSnapshot {
        HostSnapshot {
            symbols: self.symbols,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> HostSnapshot {
        HostSnapshot::builder()
            .symbol("redis::Client", ["connect()", "get(key)", "set(key,value)"])
            .symbol("redis::Pipeline", ["exec()"])
            .build()
    }

    #[test]
    fn test_match_all_present() {
        let fp = Fingerprint::new()
            .with_symbol("redis::Client", ["connect()", "get(key)"]);

        assert_eq!(fp.matches(&snapshot()), MatchOutcome::Compatible);
    }

    #[test]
    fn test_match_extra_members_ignored() {
        // Snapshot exposes set(key,value) too; undeclared members don't matter.
        let fp = Fingerprint::new().with_symbol("redis::Client", ["connect()"]);
        assert_eq!(fp.matches(&snapshot()), MatchOutcome::Compatible);
    }

    #[test]
    fn test_match_missing_member() {
        let fp = Fingerprint::new().with_symbol("redis::Client", ["publish(channel)"]);
        assert_eq!(fp.matches(&snapshot()), MatchOutcome::Incompatible);
    }

    #[test]
    fn test_match_missing_symbol() {
        let fp = Fingerprint::new().with_symbol("redis::Cluster", ["connect()"]);
        assert_eq!(fp.matches(&snapshot()), MatchOutcome::Incompatible);
    }

    #[test]
    fn test_match_any_first_wins() {
        let v2 = Fingerprint::new().with_symbol("redis::Cluster", ["connect()"]);
        let v1 = Fingerprint::new().with_symbol("redis::Client", ["connect()"]);

        // v2 is declared first but doesn't match; v1 does.
        assert_eq!(Fingerprint::match_any(&[v2.clone(), v1.clone()], &snapshot()), Some(1));
        // Declaration order decides which compatible fingerprint is reported.
        let broad = Fingerprint::new().with_symbol("redis::Pipeline", ["exec()"]);
        assert_eq!(Fingerprint::match_any(&[broad, v1], &snapshot()), Some(0));
    }

    #[test]
    fn test_match_any_none() {
        let fp = Fingerprint::new().with_symbol("kafka::Producer", ["send()"]);
        assert_eq!(Fingerprint::match_any(&[fp], &snapshot()), None);
    }

    #[test]
    fn test_match_any_empty_list_is_unconditional() {
        assert_eq!(Fingerprint::match_any(&[], &HostSnapshot::empty()), Some(0));
    }

    #[test]
    fn test_validate() {
        assert!(Fingerprint::new().validate().is_err());

        let fp = Fingerprint::new().with_symbol("redis::Client", Vec::<String>::new());
        assert!(fp.validate().is_err());

        let fp = Fingerprint::new().with_symbol("redis::Client", [""]);
        assert!(fp.validate().is_err());

        let fp = Fingerprint::new().with_symbol("redis::Client", ["connect()"]);
        assert!(fp.validate().is_ok());
    }

    #[test]
    fn test_snapshot_queries() {
        let snap = snapshot();
        assert!(snap.contains_symbol("redis::Client"));
        assert!(!snap.contains_symbol("redis::Cluster"));
        assert!(snap.has_member("redis::Pipeline", "exec()"));
        assert!(!snap.has_member("redis::Pipeline", "discard()"));
        assert_eq!(snap.len(), 2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_fingerprint_serde_roundtrip() {
        let fp = Fingerprint::new()
            .with_symbol("redis::Client", ["connect()", "get(key)"])
            .with_symbol("redis::Pipeline", ["exec()"]);

        let json = serde_json::to_string(&fp).unwrap();
        let parsed: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, fp);
    }
}
