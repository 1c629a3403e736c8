//! Textual query templating: `{TOKEN}` substitution and the DISTINCT keyword
//! splice. Kept deliberately string-based; the fragile "first SELECT"
//! detection lives here so it can be tested in isolation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CriteriaError, Result};

pub const TOKEN_WHAT: &str = "{WHAT}";
pub const TOKEN_JOINS: &str = "{JOINS}";
pub const TOKEN_WHERE: &str = "{WHERE}";
pub const TOKEN_GROUPBY: &str = "{GROUPBY}";
pub const TOKEN_ORDERBY: &str = "{ORDERBY}";
pub const TOKEN_LIMIT: &str = "{LIMIT}";

/// Replace every occurrence of a template token. A token that is not present
/// is simply never substituted; that is not an error.
pub fn substitute(template: &str, token: &str, replacement: &str) -> String {
    template.replace(token, replacement)
}

// Non-greedy scan to the first SELECT keyword, tolerating anything before it
// (subquery boundaries, CTE prefixes), with an optional DISTINCT already
// following it.
static FIRST_SELECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(?P<head>.*?\bSELECT\b)(?P<distinct>\s+DISTINCT\b)?").unwrap()
});

/// Splice a `DISTINCT` keyword immediately after the first `SELECT` in the
/// template, leaving nested `SELECT`s untouched. Idempotent: a template that
/// already reads `SELECT DISTINCT` comes back unchanged.
pub fn inject_distinct(template: &str) -> Result<String> {
    let caps = FIRST_SELECT
        .captures(template)
        .ok_or(CriteriaError::MissingSelectKeyword)?;
    if caps.name("distinct").is_some() {
        return Ok(template.to_string());
    }
    let head_end = caps.name("head").map(|m| m.end()).unwrap_or(0);
    let mut out = String::with_capacity(template.len() + 9);
    out.push_str(&template[..head_end]);
    out.push_str(" DISTINCT");
    out.push_str(&template[head_end..]);
    Ok(out)
}
