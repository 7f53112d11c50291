//! Filter Engine
//!
//! Decides which advertised capabilities make it through a conversion call.
//!
//! A name is included iff it is not denied and it is allowed:
//! - denied: listed in `deny` or matching any deny pattern
//! - allowed: no allow list and no allow patterns at all, or listed in
//!   `allow`, or matching any allow pattern
//!
//! Patterns are regular expressions anchored at the start of the name.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ConfigurationError;

/// Allow/deny lists and patterns.
///
/// Ordered sets keep two configs that differ only in ordering equal, which
/// also makes the config usable as a cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub allow: BTreeSet<String>,
    #[serde(default)]
    pub deny: BTreeSet<String>,
    #[serde(default)]
    pub allow_patterns: BTreeSet<String>,
    #[serde(default)]
    pub deny_patterns: BTreeSet<String>,
}

impl FilterConfig {
    /// Allow everything
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn allow<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn deny<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn allow_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn deny_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny_patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn is_allow_all(&self) -> bool {
        self.allow.is_empty()
            && self.deny.is_empty()
            && self.allow_patterns.is_empty()
            && self.deny_patterns.is_empty()
    }

    /// Check the config and compile its patterns
    pub fn compile(&self) -> Result<ToolFilter, ConfigurationError> {
        ToolFilter::compile(self)
    }
}

/// Compiled, immutable form of a [`FilterConfig`]
#[derive(Debug, Clone)]
pub struct ToolFilter {
    allow: BTreeSet<String>,
    deny: BTreeSet<String>,
    allow_patterns: Vec<Regex>,
    deny_patterns: Vec<Regex>,
}

impl ToolFilter {
    pub fn compile(config: &FilterConfig) -> Result<Self, ConfigurationError> {
        check_names("allow", &config.allow)?;
        check_names("deny", &config.deny)?;

        Ok(Self {
            allow: config.allow.clone(),
            deny: config.deny.clone(),
            allow_patterns: compile_patterns("allow", &config.allow_patterns)?,
            deny_patterns: compile_patterns("deny", &config.deny_patterns)?,
        })
    }

    /// Filter that lets every name through
    pub fn allow_all() -> Self {
        Self {
            allow: BTreeSet::new(),
            deny: BTreeSet::new(),
            allow_patterns: Vec::new(),
            deny_patterns: Vec::new(),
        }
    }

    pub fn is_denied(&self, name: &str) -> bool {
        self.deny.contains(name) || self.deny_patterns.iter().any(|re| re.is_match(name))
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        (self.allow.is_empty() && self.allow_patterns.is_empty())
            || self.allow.contains(name)
            || self.allow_patterns.iter().any(|re| re.is_match(name))
    }

    /// Deny wins over allow
    pub fn includes(&self, name: &str) -> bool {
        !self.is_denied(name) && self.is_allowed(name)
    }

    /// Keep the items whose name passes, preserving order
    pub fn apply<T, F>(&self, items: Vec<T>, name_of: F) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        items
            .into_iter()
            .filter(|item| self.includes(name_of(item)))
            .collect()
    }
}

impl Default for ToolFilter {
    fn default() -> Self {
        Self::allow_all()
    }
}

fn check_names(field: &'static str, names: &BTreeSet<String>) -> Result<(), ConfigurationError> {
    if names.iter().any(|name| name.trim().is_empty()) {
        return Err(ConfigurationError::EmptyName { field });
    }
    Ok(())
}

fn compile_patterns(
    field: &'static str,
    patterns: &BTreeSet<String>,
) -> Result<Vec<Regex>, ConfigurationError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(&format!("^(?:{pattern})")).map_err(|e| {
                ConfigurationError::InvalidPattern {
                    field,
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}
