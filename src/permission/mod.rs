//! Permission engine: effective permission sets and checks against them.
//!
//! Rule matching itself lives on [`SubjectPermissions`]; this module resolves
//! who holds which rules and rewrites list queries accordingly.

pub mod filter;

use std::sync::Arc;

use rusqlite::Connection;

use crate::error::Result;
use crate::store::{Ctx, SqliteStore, permissions, roles, users};
use crate::types::{Action, ResourceKind, RoleType, SubjectPermissions, User};

pub use filter::{
    ScopeColumns, filter_query_by_namespace, filter_query_by_namespace_project,
    filter_query_by_project,
};

/// Permissions of the role `(code, role_type)`; a missing role has none.
pub fn role_permissions(conn: &Connection, code: &str, role_type: RoleType) -> Result<SubjectPermissions> {
    match roles::get_by_code(conn, code, role_type)? {
        Some(role) => permissions::for_roles(conn, &[role.id]),
        None => Ok(SubjectPermissions::default()),
    }
}

/// Union of the user's implicit role and every role linked to the user.
pub fn user_permissions(conn: &Connection, user: &User) -> Result<SubjectPermissions> {
    let mut role_ids = Vec::new();
    if let Some(implicit) = roles::get_by_code(conn, &user.username, RoleType::User)? {
        role_ids.push(implicit.id);
    }
    for id in permissions::role_ids_for_user(conn, user.id)? {
        if !role_ids.contains(&id) {
            role_ids.push(id);
        }
    }
    permissions::for_roles(conn, &role_ids)
}

/// Store-backed permission checks for callers that only know a name.
#[derive(Clone)]
pub struct PermissionEngine {
    store: Arc<SqliteStore>,
}

impl PermissionEngine {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    pub fn for_username(&self, ctx: &Ctx, username: &str) -> Result<SubjectPermissions> {
        self.store.read(ctx, |conn| match users::get_by_username(conn, username)? {
            Some(user) => user_permissions(conn, &user),
            None => Ok(SubjectPermissions::default()),
        })
    }

    pub fn for_role_code(&self, ctx: &Ctx, code: &str, role_type: RoleType) -> Result<SubjectPermissions> {
        self.store.read(ctx, |conn| role_permissions(conn, code, role_type))
    }

    pub fn can_resource_for_username(
        &self,
        ctx: &Ctx,
        username: &str,
        namespace: &str,
        project: &str,
        resource: ResourceKind,
        action: Action,
    ) -> Result<bool> {
        Ok(self
            .for_username(ctx, username)?
            .can_resource(namespace, project, resource, action))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn can_resource_for_role_code(
        &self,
        ctx: &Ctx,
        code: &str,
        role_type: RoleType,
        namespace: &str,
        project: &str,
        resource: ResourceKind,
        action: Action,
    ) -> Result<bool> {
        Ok(self
            .for_role_code(ctx, code, role_type)?
            .can_resource(namespace, project, resource, action))
    }

    /// Soft-deny variant: storage errors count as "no".
    pub fn must_can_resource_for_username(
        &self,
        ctx: &Ctx,
        username: &str,
        namespace: &str,
        project: &str,
        resource: ResourceKind,
        action: Action,
    ) -> bool {
        self.can_resource_for_username(ctx, username, namespace, project, resource, action)
            .unwrap_or_else(|e| {
                tracing::warn!(username, error = %e, "permission lookup failed, denying");
                false
            })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn must_can_resource_for_role_code(
        &self,
        ctx: &Ctx,
        code: &str,
        role_type: RoleType,
        namespace: &str,
        project: &str,
        resource: ResourceKind,
        action: Action,
    ) -> bool {
        self.can_resource_for_role_code(ctx, code, role_type, namespace, project, resource, action)
            .unwrap_or_else(|e| {
                tracing::warn!(role = code, error = %e, "permission lookup failed, denying");
                false
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::test_support::store;
    use crate::types::{AdminPermission, ResourcePermission, Scope};

    fn read_rule(ns: &str) -> ResourcePermission {
        ResourcePermission::new(
            Scope::Exact(ns.to_string()),
            Scope::Any,
            Scope::Any,
            Scope::Exact(Action::Read),
        )
    }

    #[test]
    fn test_user_permissions_union_implicit_and_named_roles() {
        let (_temp, store) = store();
        let ctx = Ctx::new();
        store
            .write(&ctx, |tx| {
                let user = users::insert(
                    tx,
                    &users::NewUser {
                        username: "jane".into(),
                        active: true,
                        ..Default::default()
                    },
                )?;
                let implicit = roles::insert(tx, "jane", RoleType::User)?;
                permissions::insert_for_role(
                    tx,
                    implicit.id,
                    &SubjectPermissions::new(vec![read_rule("n1")], vec![]),
                )?;
                let editors = roles::insert(tx, "editors", RoleType::Role)?;
                permissions::insert_for_role(
                    tx,
                    editors.id,
                    &SubjectPermissions::new(
                        vec![read_rule("n2"), read_rule("n1")],
                        vec![AdminPermission::new(Scope::Any, Scope::Exact(Action::Read))],
                    ),
                )?;
                roles::assign(tx, user.id, editors.id)
            })
            .unwrap();

        let engine = PermissionEngine::new(Arc::new(store));
        let perms = engine.for_username(&ctx, "jane").unwrap();
        assert_eq!(perms.resources, vec![read_rule("n1"), read_rule("n2")]);
        assert_eq!(perms.admin.len(), 1);

        assert!(
            engine
                .can_resource_for_username(&ctx, "jane", "n2", "p", ResourceKind::Page, Action::Read)
                .unwrap()
        );
        assert!(
            !engine
                .can_resource_for_username(&ctx, "jane", "n2", "p", ResourceKind::Page, Action::Write)
                .unwrap()
        );
        assert!(
            !engine
                .can_resource_for_username(&ctx, "ghost", "n1", "p", ResourceKind::Page, Action::Read)
                .unwrap()
        );
    }

    #[test]
    fn test_missing_role_has_no_permissions() {
        let (_temp, store) = store();
        let ctx = Ctx::new();
        let engine = PermissionEngine::new(Arc::new(store));
        let perms = engine.for_role_code(&ctx, "token_x", RoleType::Token).unwrap();
        assert!(perms.is_empty());
    }

    #[test]
    fn test_must_can_swallows_errors() {
        let (_temp, store) = store();
        let engine = PermissionEngine::new(Arc::new(store));
        let ctx = Ctx::new();
        ctx.cancel();

        let strict = engine.can_resource_for_role_code(
            &ctx,
            "admin",
            RoleType::Role,
            "n",
            "p",
            ResourceKind::Redirect,
            Action::Read,
        );
        assert!(matches!(strict, Err(Error::Cancelled)));
        assert!(!engine.must_can_resource_for_role_code(
            &ctx,
            "admin",
            RoleType::Role,
            "n",
            "p",
            ResourceKind::Redirect,
            Action::Read,
        ));
    }
}
