use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::{Condition, Ctx, Paginated, SqliteStore, permissions, roles};
use crate::types::{Role, RoleType, SubjectPermissions};
use crate::validate::{Rule, Validator};

use super::ListParams;

const CODE_MAX: usize = 255;

pub struct RoleService {
    store: Arc<SqliteStore>,
}

impl RoleService {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    /// Creates a named role with an initial permission set.
    pub fn create(&self, ctx: &Ctx, code: &str, permissions: &SubjectPermissions) -> Result<Role> {
        Validator::new()
            .field("code", code, &[Rule::Required, Rule::Max(CODE_MAX), Rule::Code])
            .finish()?;
        let role = self.store.write(ctx, |tx| {
            let role = roles::insert(tx, code, RoleType::Role)?;
            permissions::insert_for_role(tx, role.id, permissions)?;
            Ok(role)
        })?;
        tracing::info!(role = code, "role created");
        Ok(role)
    }

    pub fn get(&self, ctx: &Ctx, code: &str) -> Result<Role> {
        self.store
            .read(ctx, |conn| roles::get_by_code(conn, code, RoleType::Role))?
            .ok_or_else(|| Error::RoleNotFound(code.to_string()))
    }

    /// Only named roles can be deleted here; implicit ones go with their owner.
    pub fn delete(&self, ctx: &Ctx, code: &str) -> Result<()> {
        self.store.write(ctx, |tx| {
            let role = roles::get_by_code(tx, code, RoleType::Role)?
                .ok_or_else(|| Error::RoleNotFound(code.to_string()))?;
            roles::delete(tx, role.id)?;
            Ok(())
        })?;
        tracing::info!(role = code, "role deleted");
        Ok(())
    }

    pub fn list(&self, ctx: &Ctx, params: &ListParams) -> Result<Paginated<Role>> {
        let mut query = params
            .sorted(roles::select(), roles::SORT_COLUMNS)
            .filter(Condition::eq("type", RoleType::Role.as_str()));
        if let Some(term) = params.search_term() {
            query = query.filter(Condition::contains("code", term));
        }
        self.store.read(ctx, |conn| roles::search(conn, query, params.page))
    }

    pub fn permissions(&self, ctx: &Ctx, code: &str) -> Result<SubjectPermissions> {
        self.store.read(ctx, |conn| {
            let role = roles::get_by_code(conn, code, RoleType::Role)?
                .ok_or_else(|| Error::RoleNotFound(code.to_string()))?;
            permissions::for_roles(conn, &[role.id])
        })
    }

    /// Replaces every permission of the role in one transaction.
    pub fn update_permissions(
        &self,
        ctx: &Ctx,
        code: &str,
        permissions: &SubjectPermissions,
    ) -> Result<SubjectPermissions> {
        replace_role_permissions(&self.store, ctx, code, RoleType::Role, permissions)?;
        tracing::info!(
            role = code,
            resources = permissions.resources.len(),
            admin = permissions.admin.len(),
            "role permissions replaced"
        );
        self.permissions(ctx, code)
    }
}

pub(crate) fn replace_role_permissions(
    store: &SqliteStore,
    ctx: &Ctx,
    code: &str,
    role_type: RoleType,
    permissions: &SubjectPermissions,
) -> Result<()> {
    store.write(ctx, |tx| {
        let role = roles::get_by_code(tx, code, role_type)?
            .ok_or_else(|| Error::RoleNotFound(code.to_string()))?;
        permissions::replace_for_role(tx, role.id, permissions)?;
        roles::touch(tx, role.id)
    })
}
