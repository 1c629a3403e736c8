//! Join registry: active and registered-but-inactive JOIN clauses keyed by
//! id, cross-join dependency resolution, and a deterministic emission order.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::error::{CriteriaError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Join {
    id: String,
    statement: String,
    required: Vec<String>,
}

impl Join {
    fn new(id: &str, statement: &str) -> Self {
        Self { id: id.to_string(), statement: statement.to_string(), required: Vec::new() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Declare that this join depends on another join id; the orderer emits
    /// the dependency first.
    pub fn requires(&mut self, id: &str) -> &mut Self {
        if !self.required.iter().any(|r| r == id) {
            self.required.push(id.to_string());
        }
        self
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }
}

/// Two pools: active joins are always emitted, registered joins only when
/// explicitly required or pulled in as a dependency. Identity is by id.
#[derive(Debug, Default, Clone)]
pub struct JoinRegistry {
    active: Vec<Join>,
    registered: Vec<Join>,
}

impl JoinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active join. Idempotent by id: re-adding returns the existing
    /// instance; a registered join with the same id is promoted to active
    /// instead of creating a duplicate. With no id, the statement text is
    /// the id.
    pub fn add(&mut self, statement: &str, id: Option<&str>) -> &mut Join {
        let id = id.unwrap_or(statement).to_string();
        if let Some(pos) = self.active.iter().position(|j| j.id == id) {
            return &mut self.active[pos];
        }
        if let Some(pos) = self.registered.iter().position(|j| j.id == id) {
            let join = self.registered.remove(pos);
            debug!(target: "criterium::join", "join '{}' promoted to active", id);
            self.active.push(join);
        } else {
            self.active.push(Join::new(&id, statement));
        }
        self.active.last_mut().unwrap()
    }

    /// Declare a join available for lazy activation.
    pub fn register(&mut self, id: &str, statement: &str) -> Result<&mut Join> {
        if self.active.iter().any(|j| j.id == id) {
            return Err(CriteriaError::JoinAlreadyAdded { id: id.to_string() });
        }
        if self.registered.iter().any(|j| j.id == id) {
            return Err(CriteriaError::JoinAlreadyRegistered { id: id.to_string() });
        }
        self.registered.push(Join::new(id, statement));
        Ok(self.registered.last_mut().unwrap())
    }

    /// Activate a previously-registered join. No-op when already active.
    pub fn require(&mut self, id: &str) -> Result<()> {
        if self.active.iter().any(|j| j.id == id) {
            return Ok(());
        }
        match self.registered.iter().position(|j| j.id == id) {
            Some(pos) => {
                let join = self.registered.remove(pos);
                debug!(target: "criterium::join", "join '{}' required, activating", id);
                self.active.push(join);
                Ok(())
            }
            None => Err(CriteriaError::JoinIdNotFound { id: id.to_string() }),
        }
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.iter().any(|j| j.id == id)
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.registered.iter().any(|j| j.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Join> {
        self.active
            .iter_mut()
            .find(|j| j.id == id)
            .or_else(|| self.registered.iter_mut().find(|j| j.id == id))
    }

    /// All active joins plus, when `include_registered` is set, the transitive
    /// closure of their required ids resolved out of the registered pool.
    pub fn all(&self, include_registered: bool) -> Vec<&Join> {
        let mut out: Vec<&Join> = self.active.iter().collect();
        if !include_registered {
            return out;
        }
        let mut seen: HashSet<&str> = out.iter().map(|j| j.id.as_str()).collect();
        let mut cursor = 0;
        while cursor < out.len() {
            let wanted: Vec<String> = out[cursor].required.clone();
            cursor += 1;
            for id in wanted {
                if seen.contains(id.as_str()) {
                    continue;
                }
                if let Some(dep) = self.registered.iter().find(|j| j.id == id) {
                    seen.insert(dep.id.as_str());
                    out.push(dep);
                }
            }
        }
        out
    }

    /// Deterministic emission order. For any pair (A, B): if A depends on B,
    /// B sorts first; a join with any dependency relationship sorts before
    /// one with none; remaining ties break by case-insensitive natural-order
    /// id comparison. The sort is stable, so equal pairs keep registration
    /// order. This pairwise comparator is only guaranteed for shallow,
    /// non-cyclic dependency graphs; it is not a topological sort.
    pub fn ordered(&self, include_registered: bool) -> Vec<&Join> {
        let mut joins = self.all(include_registered);
        let mut related: HashSet<&str> = HashSet::new();
        for j in &joins {
            if !j.required.is_empty() {
                related.insert(j.id.as_str());
            }
            for r in &j.required {
                related.insert(r.as_str());
            }
        }
        joins.sort_by(|a, b| {
            if a.required.iter().any(|r| r == &b.id) {
                return Ordering::Greater;
            }
            if b.required.iter().any(|r| r == &a.id) {
                return Ordering::Less;
            }
            match (related.contains(a.id.as_str()), related.contains(b.id.as_str())) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => natural_cmp(&a.id, &b.id),
                (true, true) => Ordering::Equal,
            }
        });
        joins
    }

    /// Ordered join statements as one `{JOINS}` substitution string.
    pub fn render(&self, include_registered: bool) -> String {
        self.ordered(include_registered)
            .iter()
            .map(|j| j.statement.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Move every active join back to the registered pool, keeping both pools
    /// available for reuse on an unrelated query.
    pub fn deactivate_all(&mut self) {
        self.registered.append(&mut self.active);
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }
}

/// Case-insensitive natural-order comparison: digit runs compare numerically,
/// everything else compares by lowercased character.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let si = i;
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            let sj = j;
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
            let na: String = a[si..i].iter().collect();
            let nb: String = b[sj..j].iter().collect();
            let na = na.trim_start_matches('0');
            let nb = nb.trim_start_matches('0');
            let ord = match na.len().cmp(&nb.len()) {
                Ordering::Equal => na.cmp(nb),
                other => other,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        } else {
            let ca = a[i].to_ascii_lowercase();
            let cb = b[j].to_ascii_lowercase();
            if ca != cb {
                return ca.cmp(&cb);
            }
            i += 1;
            j += 1;
        }
    }
    (a.len() - i).cmp(&(b.len() - j))
}

#[cfg(test)]
mod tests;
