use std::sync::Arc;

use crate::error::{Error, Result};
use crate::permission::filter_query_by_namespace;
use crate::store::{Condition, Ctx, Paginated, SqliteStore, namespaces};
use crate::types::{Namespace, ResourcePermission};
use crate::validate::{Rule, Validator};

use super::ListParams;

const NAME_MAX: usize = 255;

pub struct NamespaceService {
    store: Arc<SqliteStore>,
}

fn validate_namespace(code: &str, name: &str) -> Result<()> {
    Validator::new()
        .field("code", code, &[Rule::Required, Rule::Max(NAME_MAX), Rule::Code])
        .field("name", name, &[Rule::Required, Rule::Max(NAME_MAX)])
        .finish()
        .map_err(Error::from)
}

impl NamespaceService {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    pub fn create(&self, ctx: &Ctx, code: &str, name: &str) -> Result<Namespace> {
        validate_namespace(code, name)?;
        let namespace = self.store.write(ctx, |tx| namespaces::insert(tx, code, name))?;
        tracing::info!(namespace = code, "namespace created");
        Ok(namespace)
    }

    pub fn get(&self, ctx: &Ctx, code: &str) -> Result<Namespace> {
        self.store
            .read(ctx, |conn| namespaces::get(conn, code))?
            .ok_or(Error::NotFound("namespace"))
    }

    pub fn update(&self, ctx: &Ctx, code: &str, name: &str) -> Result<Namespace> {
        validate_namespace(code, name)?;
        self.store.write(ctx, |tx| namespaces::update(tx, code, name))
    }

    /// Removes the namespace and, through the cascade, all of its projects.
    pub fn delete(&self, ctx: &Ctx, code: &str) -> Result<()> {
        if !self.store.write(ctx, |tx| namespaces::delete(tx, code))? {
            return Err(Error::NotFound("namespace"));
        }
        tracing::info!(namespace = code, "namespace deleted");
        Ok(())
    }

    /// Lists namespaces; `rules` narrows the result for subjects without
    /// admin access to the namespaces section.
    pub fn list(
        &self,
        ctx: &Ctx,
        rules: Option<&[ResourcePermission]>,
        params: &ListParams,
    ) -> Result<Paginated<Namespace>> {
        let mut query = params.sorted(namespaces::select(), namespaces::SORT_COLUMNS);
        if let Some(term) = params.search_term() {
            query = query.filter(Condition::AnyOf(vec![
                Condition::contains("code", term),
                Condition::contains("name", term),
            ]));
        }
        if let Some(rules) = rules {
            query = filter_query_by_namespace(query, rules, "code");
        }
        self.store
            .read(ctx, |conn| namespaces::search(conn, query, params.page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::store;
    use crate::types::{Action, ResourceKind, Scope};

    fn service() -> (tempfile::TempDir, NamespaceService) {
        let (temp, store) = store();
        (temp, NamespaceService::new(Arc::new(store)))
    }

    #[test]
    fn test_create_validates_code() {
        let (_temp, service) = service();
        let ctx = Ctx::new();
        let err = service.create(&ctx, "bad code", "Bad").unwrap_err();
        match err {
            Error::Validation(report) => assert!(report.has("code", "code")),
            other => panic!("expected validation error, got {other:?}"),
        }
        service.create(&ctx, "good-code_1", "Good").unwrap();
        assert!(matches!(
            service.create(&ctx, "good-code_1", "Again"),
            Err(Error::AlreadyExists("namespace"))
        ));
    }

    #[test]
    fn test_list_is_narrowed_by_rules() {
        let (_temp, service) = service();
        let ctx = Ctx::new();
        for code in ["a", "b", "c"] {
            service.create(&ctx, code, code).unwrap();
        }
        let rules = vec![ResourcePermission::new(
            Scope::Exact("b".into()),
            Scope::Any,
            Scope::Exact(ResourceKind::Redirect),
            Scope::Exact(Action::Read),
        )];

        let all = service.list(&ctx, None, &ListParams::default()).unwrap();
        assert_eq!(all.total, 3);

        let narrowed = service.list(&ctx, Some(&rules), &ListParams::default()).unwrap();
        assert_eq!(narrowed.total, 1);
        assert_eq!(narrowed.items[0].code, "b");

        let none = service.list(&ctx, Some(&[]), &ListParams::default()).unwrap();
        assert_eq!(none.total, 0);
    }

    #[test]
    fn test_delete_missing() {
        let (_temp, service) = service();
        assert!(matches!(
            service.delete(&Ctx::new(), "ghost"),
            Err(Error::NotFound("namespace"))
        ));
    }
}
