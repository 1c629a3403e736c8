//! Free-text search compiler: turns an ordered list of search terms into one
//! parenthesized boolean WHERE fragment fanned out across the searchable
//! fields, honoring a negation keyword and explicit connector tokens.

use tracing::warn;

use crate::placeholder::{PlaceholderRegistry, PLACEHOLDER_SIGIL};

/// Keyword set recognized in the term stream. Localizable: a caller can swap
/// the words without touching the emitted SQL connectors, which stay
/// `AND`/`OR`/`NOT`.
#[derive(Debug, Clone)]
pub struct SearchKeywords {
    pub not: String,
    pub and: String,
    pub or: String,
}

impl Default for SearchKeywords {
    fn default() -> Self {
        Self { not: "NOT".to_string(), and: "AND".to_string(), or: "OR".to_string() }
    }
}

impl SearchKeywords {
    fn connector(&self, term: &str) -> Option<&'static str> {
        if term.eq_ignore_ascii_case(&self.and) {
            Some("AND")
        } else if term.eq_ignore_ascii_case(&self.or) {
            Some("OR")
        } else {
            None
        }
    }

    fn is_negation(&self, term: &str) -> bool {
        term.eq_ignore_ascii_case(&self.not)
    }
}

/// Escape characters significant to LIKE patterns (backslash first).
pub fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Compile the term stream into one WHERE fragment across `fields`.
///
/// - The negation keyword flips a negate-next-match flag, emitting nothing.
/// - A connector at the first or last effective position is dropped with a
///   warning; elsewhere it joins the surrounding match groups and suppresses
///   the implicit default `AND`.
/// - Any other term becomes a parenthesized per-term group: `field LIKE :ph`
///   per searchable field joined by `OR`, or `field NOT LIKE :ph` joined by
///   `AND` under negation. Each term binds `%term%` through the registry.
///
/// Returns the empty string (allocating no placeholders) when there are no
/// terms or no searchable fields; callers must skip adding an empty fragment.
pub fn compile(
    terms: &[String],
    fields: &[String],
    keywords: &SearchKeywords,
    placeholders: &mut PlaceholderRegistry,
) -> String {
    if terms.is_empty() || fields.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let mut negate = false;
    let mut pending: Option<&'static str> = None;
    let mut any_group = false;

    for term in terms {
        if keywords.is_negation(term) {
            negate = true;
            continue;
        }
        if let Some(conn) = keywords.connector(term) {
            if !any_group {
                warn!(target: "criterium::search", "dropping leading connector '{}' in search terms", term);
            } else {
                pending = Some(conn);
            }
            continue;
        }

        let name = placeholders.generate(format!("%{}%", escape_like(term)));
        let (op, joiner) = if negate { ("NOT LIKE", " AND ") } else { ("LIKE", " OR ") };
        let group = fields
            .iter()
            .map(|f| format!("{} {} {}{}", f, op, PLACEHOLDER_SIGIL, name))
            .collect::<Vec<_>>()
            .join(joiner);

        if any_group {
            out.push(' ');
            out.push_str(pending.take().unwrap_or("AND"));
            out.push(' ');
        }
        out.push('(');
        out.push_str(&group);
        out.push(')');
        any_group = true;
        negate = false;
    }

    if let Some(conn) = pending {
        warn!(target: "criterium::search", "dropping trailing connector '{}' in search terms", conn);
    }
    if !any_group {
        return String::new();
    }
    format!("({})", out)
}

/// Whitespace term tokenizer for raw user input.
pub fn tokenize(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}
