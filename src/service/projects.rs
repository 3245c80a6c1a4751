use std::sync::Arc;

use crate::error::{Error, Result};
use crate::permission::{ScopeColumns, filter_query_by_namespace_project, filter_query_by_project};
use crate::store::{Condition, Ctx, Paginated, SqliteStore, namespaces, projects};
use crate::types::{Project, ResourcePermission};
use crate::validate::{Rule, Validator};

use super::ListParams;

const NAME_MAX: usize = 255;

/// Column layout of the projects table for query rewriting.
const PROJECT_COLUMNS: ScopeColumns<'static> = ScopeColumns::new("namespace_code", "code");

pub struct ProjectService {
    store: Arc<SqliteStore>,
}

impl ProjectService {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    pub fn create(&self, ctx: &Ctx, namespace: &str, code: &str, name: &str) -> Result<Project> {
        Validator::new()
            .field("code", code, &[Rule::Required, Rule::Max(NAME_MAX), Rule::Code])
            .field("name", name, &[Rule::Required, Rule::Max(NAME_MAX)])
            .finish()?;

        let project = self.store.write(ctx, |tx| {
            if namespaces::get(tx, namespace)?.is_none() {
                return Err(Error::NotFound("namespace"));
            }
            projects::insert(tx, namespace, code, name)
        })?;
        tracing::info!(namespace, project = code, "project created");
        Ok(project)
    }

    pub fn get(&self, ctx: &Ctx, namespace: &str, code: &str) -> Result<Project> {
        self.store.read(ctx, |conn| projects::require(conn, namespace, code))
    }

    pub fn rename(&self, ctx: &Ctx, namespace: &str, code: &str, name: &str) -> Result<Project> {
        Validator::new()
            .field("name", name, &[Rule::Required, Rule::Max(NAME_MAX)])
            .finish()?;
        self.store
            .write(ctx, |tx| projects::update_name(tx, namespace, code, name))
    }

    /// Deletes the project with its redirects, pages, drafts and agents.
    pub fn delete(&self, ctx: &Ctx, namespace: &str, code: &str) -> Result<()> {
        if !self.store.write(ctx, |tx| projects::delete(tx, namespace, code))? {
            return Err(Error::NotFound("project"));
        }
        tracing::info!(namespace, project = code, "project deleted");
        Ok(())
    }

    /// Lists projects across namespaces, or within `namespace` when given.
    ///
    /// `rules` narrows the result for subjects without admin access.
    pub fn list(
        &self,
        ctx: &Ctx,
        namespace: Option<&str>,
        rules: Option<&[ResourcePermission]>,
        params: &ListParams,
    ) -> Result<Paginated<Project>> {
        let mut query = params.sorted(projects::select(), projects::SORT_COLUMNS);
        if let Some(term) = params.search_term() {
            query = query.filter(Condition::AnyOf(vec![
                Condition::contains("code", term),
                Condition::contains("name", term),
            ]));
        }
        query = match (namespace, rules) {
            (Some(ns), Some(rules)) => {
                filter_query_by_project(query.filter(Condition::eq("namespace_code", ns)), rules, ns, "code")
            }
            (Some(ns), None) => query.filter(Condition::eq("namespace_code", ns)),
            (None, Some(rules)) => filter_query_by_namespace_project(query, rules, PROJECT_COLUMNS),
            (None, None) => query,
        };
        self.store.read(ctx, |conn| projects::search(conn, query, params.page))
    }
}
