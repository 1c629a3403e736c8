//! Placeholder registry: maps scalar values to stable, unique bind-parameter
//! names within one build cycle, deduplicating by the stringified value.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::value::BindValue;

/// Sigil carried by placeholder tokens in rendered SQL (`:PH0001`).
/// Stored names are bare; the sigil is added at render time only.
pub const PLACEHOLDER_SIGIL: char = ':';

/// Width of the zero-padded sequence part of generated names. Fixed width
/// keeps shorter names from being a prefix of longer ones under textual
/// whole-token substitution (PH0001 vs PH0011).
const NAME_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Clone)]
pub struct PlaceholderRegistry {
    entries: Vec<Placeholder>,
    // stringified value -> index into entries, the dedup key
    by_value: HashMap<String, usize>,
    seq: usize,
}

impl PlaceholderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the existing name for a string-equal value, or allocate the
    /// next sequence number and store the mapping. Never fails; values are
    /// always coerced to string (null becomes the empty string).
    pub fn generate(&mut self, value: impl Into<BindValue>) -> String {
        let rendered = value.into().render();
        if let Some(&idx) = self.by_value.get(&rendered) {
            return self.entries[idx].name.clone();
        }
        self.seq += 1;
        // past 10^NAME_WIDTH the padding rolls over and PH1000 prefixes PH10000
        debug_assert!(self.seq < 10usize.pow(NAME_WIDTH as u32), "placeholder sequence overflow");
        let name = format!("PH{:0width$}", self.seq, width = NAME_WIDTH);
        debug!(target: "criterium::build", "placeholder {} allocated for value {:?}", name, rendered);
        self.by_value.insert(rendered.clone(), self.entries.len());
        self.entries.push(Placeholder { name: name.clone(), value: rendered });
        name
    }

    /// Direct insertion with a caller-supplied name. The name is normalized
    /// by stripping a leading sigil so stored names are always bare. Adding
    /// an existing name overwrites its value.
    pub fn add(&mut self, name: &str, value: impl Into<BindValue>) -> String {
        let bare = name.trim_start_matches(PLACEHOLDER_SIGIL).to_string();
        let rendered = value.into().render();
        if let Some(idx) = self.entries.iter().position(|p| p.name == bare) {
            let previous = std::mem::replace(&mut self.entries[idx].value, rendered.clone());
            // the dedup index must not keep mapping the replaced value to
            // this name, or generate() would hand out a name bound elsewhere
            if self.by_value.get(&previous) == Some(&idx) {
                self.by_value.remove(&previous);
            }
            self.by_value.entry(rendered).or_insert(idx);
        } else {
            self.by_value.entry(rendered.clone()).or_insert(self.entries.len());
            self.entries.push(Placeholder { name: bare.clone(), value: rendered });
        }
        bare
    }

    /// Render a stored name as a substitution token (`:name`).
    pub fn token(name: &str) -> String {
        format!("{}{}", PLACEHOLDER_SIGIL, name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|p| p.name == name).map(|p| p.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name -> value map handed to the statement-execution collaborator.
    pub fn bind_map(&self) -> BTreeMap<String, String> {
        self.entries.iter().map(|p| (p.name.clone(), p.value.clone())).collect()
    }

    /// Clear all placeholders; used when a criteria instance is reused for an
    /// unrelated query. Sequence numbering restarts.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.by_value.clear();
        self.seq = 0;
    }
}
