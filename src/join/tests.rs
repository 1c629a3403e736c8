use std::cmp::Ordering;

use crate::error::CriteriaError;
use crate::join::{natural_cmp, JoinRegistry};

#[test]
fn add_is_idempotent_by_id() {
    let mut reg = JoinRegistry::new();
    reg.add("LEFT JOIN a ON a.id = t.a_id", Some("a"));
    reg.add("LEFT JOIN a ON a.id = t.a_id (changed)", Some("a"));
    assert_eq!(reg.active_len(), 1);
    // first statement wins
    assert_eq!(reg.all(false)[0].statement(), "LEFT JOIN a ON a.id = t.a_id");
}

#[test]
fn add_defaults_id_to_statement() {
    let mut reg = JoinRegistry::new();
    reg.add("LEFT JOIN a ON a.id = t.a_id", None);
    reg.add("LEFT JOIN a ON a.id = t.a_id", None);
    assert_eq!(reg.active_len(), 1);
}

#[test]
fn add_promotes_registered_join() {
    let mut reg = JoinRegistry::new();
    reg.register("a", "LEFT JOIN a ON a.id = t.a_id").expect("register");
    assert!(reg.is_registered("a"));
    reg.add("ignored statement", Some("a"));
    assert!(reg.is_active("a"));
    assert!(!reg.is_registered("a"));
    // promoted join keeps the registered statement
    assert_eq!(reg.all(false)[0].statement(), "LEFT JOIN a ON a.id = t.a_id");
}

#[test]
fn register_identity_violations() {
    let mut reg = JoinRegistry::new();
    reg.add("JOIN x", Some("x"));
    assert_eq!(
        reg.register("x", "JOIN x").unwrap_err(),
        CriteriaError::JoinAlreadyAdded { id: "x".into() }
    );
    reg.register("y", "JOIN y").expect("register y");
    assert_eq!(
        reg.register("y", "JOIN y").unwrap_err(),
        CriteriaError::JoinAlreadyRegistered { id: "y".into() }
    );
}

#[test]
fn require_activates_or_errors() {
    let mut reg = JoinRegistry::new();
    reg.register("a", "JOIN a").expect("register");
    reg.require("a").expect("require registered");
    assert!(reg.is_active("a"));
    // no-op when already active
    reg.require("a").expect("require active");
    assert_eq!(
        reg.require("missing").unwrap_err(),
        CriteriaError::JoinIdNotFound { id: "missing".into() }
    );
}

#[test]
fn all_resolves_transitive_required_joins() {
    let mut reg = JoinRegistry::new();
    reg.register("b", "JOIN b").expect("register b");
    reg.register("c", "JOIN c").expect("register c");
    reg.get_mut("b").unwrap().requires("c");
    reg.add("JOIN a", Some("a")).requires("b");

    let direct = reg.all(false);
    assert_eq!(direct.len(), 1);

    let closed: Vec<&str> = reg.all(true).iter().map(|j| j.id()).collect();
    assert_eq!(closed, ["a", "b", "c"], "closure pulls b then b's dependency c");
}

#[test]
fn ordered_puts_dependency_first() {
    let mut reg = JoinRegistry::new();
    reg.add("JOIN a", Some("a")).requires("b");
    reg.add("JOIN b", Some("b"));
    reg.add("JOIN c", Some("c"));

    let order: Vec<&str> = reg.ordered(false).iter().map(|j| j.id()).collect();
    let pos = |id: &str| order.iter().position(|j| *j == id).unwrap();
    assert!(pos("b") < pos("a"), "dependency must be emitted first: {:?}", order);

    // deterministic across repeated calls
    let again: Vec<&str> = reg.ordered(false).iter().map(|j| j.id()).collect();
    assert_eq!(order, again);
}

#[test]
fn ordered_relationship_joins_sort_before_unrelated() {
    let mut reg = JoinRegistry::new();
    reg.add("JOIN z", Some("z"));
    reg.add("JOIN a", Some("a")).requires("b");
    reg.add("JOIN b", Some("b"));

    let order: Vec<&str> = reg.ordered(false).iter().map(|j| j.id()).collect();
    let pos = |id: &str| order.iter().position(|j| *j == id).unwrap();
    assert!(pos("a") < pos("z"));
    assert!(pos("b") < pos("z"));
}

#[test]
fn ordered_unrelated_ties_break_naturally() {
    let mut reg = JoinRegistry::new();
    reg.add("JOIN j10", Some("j10"));
    reg.add("JOIN j2", Some("j2"));
    reg.add("JOIN J1", Some("J1"));

    let order: Vec<&str> = reg.ordered(false).iter().map(|j| j.id()).collect();
    assert_eq!(order, ["J1", "j2", "j10"]);
}

#[test]
fn render_joins_statements_in_order() {
    let mut reg = JoinRegistry::new();
    reg.add("JOIN a ON 1", Some("a")).requires("b");
    reg.add("JOIN b ON 2", Some("b"));
    assert_eq!(reg.render(false), "JOIN b ON 2 JOIN a ON 1");
}

#[test]
fn natural_compare() {
    assert_eq!(natural_cmp("a2", "a10"), Ordering::Less);
    assert_eq!(natural_cmp("A2", "a2"), Ordering::Equal);
    assert_eq!(natural_cmp("b", "a"), Ordering::Greater);
    assert_eq!(natural_cmp("a", "ab"), Ordering::Less);
    assert_eq!(natural_cmp("a02", "a2"), Ordering::Equal);
}
