//! Audit configuration
//!
//! Flags and environment values are collected by the binary and resolved
//! here so that defaults live in one place.

use std::str::FromStr;

use thiserror::Error;

/// Namespace K10 is installed into by default
pub const DEFAULT_KASTEN_NAMESPACE: &str = "kasten-io";
/// Helm release name K10 is installed under by default
pub const DEFAULT_KASTEN_RELEASE: &str = "k10";
/// Concurrent backup action listings during the RPO pass
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Order backup actions are put in before the RPO scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionOrder {
    /// Most recently finished first
    #[default]
    NewestFirst,
    /// Keep the order returned by the API server
    AsListed,
}

impl std::fmt::Display for ActionOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionOrder::NewestFirst => write!(f, "newest-first"),
            ActionOrder::AsListed => write!(f, "as-listed"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown action order '{0}', expected 'newest-first' or 'as-listed'")]
pub struct ParseActionOrderError(String);

impl FromStr for ActionOrder {
    type Err = ParseActionOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest-first" => Ok(ActionOrder::NewestFirst),
            "as-listed" => Ok(ActionOrder::AsListed),
            other => Err(ParseActionOrderError(other.to_string())),
        }
    }
}

/// Resolved audit settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    /// Namespace K10 is installed in
    pub namespace: String,
    /// Helm release name of K10
    pub release: String,
    /// Maximum concurrent backup action listings
    pub concurrency: usize,
    pub action_order: ActionOrder,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_KASTEN_NAMESPACE.to_string(),
            release: DEFAULT_KASTEN_RELEASE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            action_order: ActionOrder::default(),
        }
    }
}

impl AuditConfig {
    /// Build the config from optional raw values.
    ///
    /// Empty strings count as unset, like an exported but empty
    /// `KASTEN_NAMESPACE`. Concurrency is clamped to at least one.
    pub fn resolve(
        namespace: Option<String>,
        release: Option<String>,
        concurrency: Option<usize>,
        action_order: Option<ActionOrder>,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let defaults = Self::default();

        Self {
            namespace: non_empty(namespace).unwrap_or(defaults.namespace),
            release: non_empty(release).unwrap_or(defaults.release),
            concurrency: concurrency.unwrap_or(defaults.concurrency).max(1),
            action_order: action_order.unwrap_or(defaults.action_order),
        }
    }
}
