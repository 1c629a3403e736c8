//! Custom computed columns: SELECT expressions registered by id and included
//! in output only once enabled, either explicitly or because the fixpoint
//! resolver found their expression already woven into the emitted SQL.

use serde::Serialize;
use tracing::debug;

use crate::error::{CriteriaError, Result};

/// Marker suffix conventionally carried by custom column ids. The ORDER BY
/// renderer skips identifier quoting for fields ending in it.
pub const CUSTOM_COLUMN_SUFFIX: &str = "_custom";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomColumn {
    id: String,
    expression: String,
    enabled: bool,
    required_joins: Vec<String>,
}

impl CustomColumn {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn required_joins(&self) -> &[String] {
        &self.required_joins
    }

    /// The fragment contributed to the select list once enabled.
    pub fn select_fragment(&self) -> String {
        format!("{} AS {}", self.expression, self.id)
    }
}

/// Registry of custom columns, identity by id. Registration happens once;
/// enablement is mutable and monotone within a build.
#[derive(Debug, Default, Clone)]
pub struct CustomColumnSet {
    columns: Vec<CustomColumn>,
}

impl CustomColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: &str, expression: &str, required_joins: &[&str]) -> Result<()> {
        if self.has(id) {
            return Err(CriteriaError::CannotRegisterColumnAgain { id: id.to_string() });
        }
        self.columns.push(CustomColumn {
            id: id.to_string(),
            expression: expression.to_string(),
            enabled: false,
            required_joins: required_joins.iter().map(|s| s.to_string()).collect(),
        });
        Ok(())
    }

    pub fn has(&self, id: &str) -> bool {
        self.columns.iter().any(|c| c.id == id)
    }

    pub fn get(&self, id: &str) -> Result<&CustomColumn> {
        self.columns
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| CriteriaError::CustomColumnNotRegistered { id: id.to_string() })
    }

    pub fn set_enabled(&mut self, id: &str, enable: bool) -> Result<()> {
        let col = self
            .columns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CriteriaError::CustomColumnNotRegistered { id: id.to_string() })?;
        col.enabled = enable;
        Ok(())
    }

    pub fn enabled(&self) -> impl Iterator<Item = &CustomColumn> {
        self.columns.iter().filter(|c| c.enabled)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// One fixpoint scan: enable every disabled column whose raw expression
    /// appears verbatim in the emitted SQL, returning the newly-enabled ids.
    pub fn enable_found(&mut self, sql: &str) -> Vec<String> {
        let mut newly = Vec::new();
        for col in &mut self.columns {
            if !col.enabled && sql.contains(col.expression.as_str()) {
                col.enabled = true;
                newly.push(col.id.clone());
            }
        }
        if !newly.is_empty() {
            debug!(target: "criterium::build", "implicit custom column usage found: {:?}", newly);
        }
        newly
    }

    /// Disable every column while keeping registrations, for criteria reuse.
    pub fn disable_all(&mut self) {
        for col in &mut self.columns {
            col.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_once_per_id() {
        let mut set = CustomColumnSet::new();
        set.register("total_custom", "SUM(i.amount)", &[]).expect("register");
        assert_eq!(
            set.register("total_custom", "SUM(i.amount)", &[]).unwrap_err(),
            CriteriaError::CannotRegisterColumnAgain { id: "total_custom".into() }
        );
    }

    #[test]
    fn enablement_defaults_false() {
        let mut set = CustomColumnSet::new();
        set.register("c", "expr()", &[]).expect("register");
        assert!(!set.get("c").unwrap().is_enabled());
        set.set_enabled("c", true).expect("enable");
        assert!(set.get("c").unwrap().is_enabled());
        assert_eq!(
            set.set_enabled("missing", true).unwrap_err(),
            CriteriaError::CustomColumnNotRegistered { id: "missing".into() }
        );
    }

    #[test]
    fn enable_found_scans_disabled_columns_only() {
        let mut set = CustomColumnSet::new();
        set.register("a", "COUNT(x.id)", &[]).expect("a");
        set.register("b", "SUM(y.v)", &[]).expect("b");
        set.set_enabled("a", true).expect("enable a");

        let newly = set.enable_found("SELECT COUNT(x.id), SUM(y.v) FROM t");
        assert_eq!(newly, ["b"], "already-enabled columns are not reported again");
        assert!(set.enable_found("SELECT COUNT(x.id), SUM(y.v) FROM t").is_empty());
    }

    #[test]
    fn select_fragment_carries_alias() {
        let mut set = CustomColumnSet::new();
        set.register("total_custom", "SUM(i.amount)", &[]).expect("register");
        assert_eq!(set.get("total_custom").unwrap().select_fragment(), "SUM(i.amount) AS total_custom");
    }
}
