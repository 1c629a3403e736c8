//! Ordered-but-deduplicated clause accumulators for WHERE, GROUP BY, HAVING
//! and SELECT fragments, plus the statement fragment that carries its own
//! named binds.

use crate::placeholder::PlaceholderRegistry;
use crate::value::BindValue;

/// A SQL fragment with its own named bind parameters, e.g.
/// `created_at > :since`. Identity (for dedup) is the raw template text,
/// never the resolved bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    template: String,
    binds: Vec<(String, BindValue)>,
}

impl SqlStatement {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into(), binds: Vec::new() }
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<BindValue>) -> Self {
        self.binds.push((name.into(), value.into()));
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Register this statement's binds into the criteria's registry.
    pub fn register_binds(&self, placeholders: &mut PlaceholderRegistry) {
        for (name, value) in &self.binds {
            placeholders.add(name, value.clone());
        }
    }
}

/// True when a fragment contains nothing but whitespace and parentheses,
/// e.g. `""`, `"  "`, `"()"`, `"( )"`.
pub fn is_vacuous(fragment: &str) -> bool {
    fragment.chars().all(|c| c.is_whitespace() || c == '(' || c == ')')
}

/// Insertion-ordered set of SQL fragments keyed by exact textual identity.
/// Re-adding an equal fragment is a no-op, not a duplicate.
#[derive(Debug, Default, Clone)]
pub struct ClauseSet {
    items: Vec<String>,
}

impl ClauseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fragment, preserving insertion order. Returns false when an
    /// equal fragment is already present.
    pub fn add(&mut self, fragment: &str) -> bool {
        if self.items.iter().any(|f| f == fragment) {
            return false;
        }
        self.items.push(fragment.to_string());
        true
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.items.iter().any(|f| f == fragment)
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn join(&self, sep: &str) -> String {
        self.items.join(sep)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
