//! Rewrites list queries so they only return rows the subject may see.
//!
//! Every function takes the subject's rules already narrowed to the
//! requested resource and action (see `SubjectPermissions::resource_rules_for`).

use std::collections::{BTreeMap, BTreeSet};

use crate::store::{Condition, Select};
use crate::types::{ResourcePermission, Scope};

/// Physical columns holding the namespace and project of a listed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeColumns<'a> {
    pub namespace: &'a str,
    pub project: &'a str,
}

impl<'a> ScopeColumns<'a> {
    #[must_use]
    pub const fn new(namespace: &'a str, project: &'a str) -> Self {
        Self { namespace, project }
    }
}

impl Default for ScopeColumns<'static> {
    fn default() -> Self {
        Self::new("namespace_code", "project_code")
    }
}

/// Restricts `query` to namespaces named by at least one rule.
#[must_use]
pub fn filter_query_by_namespace(query: Select, rules: &[ResourcePermission], column: &str) -> Select {
    if rules.is_empty() {
        return query.filter(Condition::Never);
    }
    if rules.iter().any(|rule| rule.namespace.is_any()) {
        return query;
    }
    let namespaces: BTreeSet<&str> = rules
        .iter()
        .filter_map(|rule| rule.namespace.exact().map(String::as_str))
        .collect();
    query.filter(Condition::is_in(column, namespaces))
}

/// Restricts `query` to the projects of `namespace` the rules reach.
#[must_use]
pub fn filter_query_by_project(
    query: Select,
    rules: &[ResourcePermission],
    namespace: &str,
    column: &str,
) -> Select {
    let relevant: Vec<&ResourcePermission> = rules
        .iter()
        .filter(|rule| rule.namespace.matches_str(namespace))
        .collect();
    if relevant.is_empty() {
        return query.filter(Condition::Never);
    }
    if relevant
        .iter()
        .any(|rule| rule.namespace.is_any() || rule.project.is_any())
    {
        return query;
    }
    let projects: BTreeSet<&str> = relevant
        .iter()
        .filter_map(|rule| rule.project.exact().map(String::as_str))
        .collect();
    query.filter(Condition::is_in(column, projects))
}

/// Restricts `query` across namespaces and projects at once.
///
/// Any rule with a wildcard namespace leaves the query unchanged, whatever
/// its project. Otherwise emits one disjunct for the fully reachable
/// namespaces and one `(namespace, projects)` pair for each other namespace.
/// Concrete projects are dropped for namespaces that are already fully
/// reachable.
#[must_use]
pub fn filter_query_by_namespace_project(
    query: Select,
    rules: &[ResourcePermission],
    columns: ScopeColumns<'_>,
) -> Select {
    if rules.is_empty() {
        return query.filter(Condition::Never);
    }

    if rules.iter().any(|rule| rule.namespace.is_any()) {
        return query;
    }

    let mut full_namespaces: BTreeSet<&str> = BTreeSet::new();
    let mut per_namespace: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for rule in rules {
        let Scope::Exact(namespace) = &rule.namespace else {
            continue;
        };
        match &rule.project {
            Scope::Any => {
                full_namespaces.insert(namespace);
            }
            Scope::Exact(project) => {
                per_namespace.entry(namespace).or_default().insert(project);
            }
        }
    }

    let mut clauses = Vec::new();
    if !full_namespaces.is_empty() {
        clauses.push(Condition::is_in(columns.namespace, full_namespaces.iter().copied()));
    }
    for (namespace, projects) in per_namespace {
        if full_namespaces.contains(namespace) {
            continue;
        }
        clauses.push(Condition::All(vec![
            Condition::eq(columns.namespace, namespace),
            Condition::is_in(columns.project, projects),
        ]));
    }
    query.filter(Condition::AnyOf(clauses))
}
