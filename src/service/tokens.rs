use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::token;
use crate::error::{Error, Result};
use crate::permission::role_permissions;
use crate::store::{Condition, Ctx, Paginated, SqliteStore, now, permissions, roles, tokens};
use crate::types::{RoleType, SubjectPermissions, Token, token_role_code};
use crate::validate::{Rule, Validator};

use super::ListParams;

const NAME_MAX: usize = 300;

/// A freshly issued token. `plain` is never stored and never shown again.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedToken {
    #[serde(flatten)]
    pub token: Token,
    pub plain: String,
}

pub struct TokenService {
    store: Arc<SqliteStore>,
}

impl TokenService {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    /// Issues a token, its implicit role and the role's permissions at once.
    pub fn create(
        &self,
        ctx: &Ctx,
        name: &str,
        expires_at: Option<DateTime<Utc>>,
        permissions: &SubjectPermissions,
    ) -> Result<CreatedToken> {
        Validator::new()
            .field("name", name, &[Rule::Required, Rule::Max(NAME_MAX)])
            .finish()?;

        let plain = token::generate();
        let hash = token::hash(&plain);
        let preview = token::preview(&plain);
        let role_code = token_role_code(name);

        let created = self.store.write(ctx, |tx| {
            if tokens::get_by_name(tx, name)?.is_some() {
                return Err(Error::AlreadyExists("token"));
            }
            let token = tokens::insert(tx, name, &hash, &preview, expires_at)?;
            let role = roles::insert(tx, &role_code, RoleType::Token)?;
            permissions::insert_for_role(tx, role.id, permissions)?;
            Ok(token)
        })?;
        tracing::info!(token_id = created.id, name, preview = %created.preview, "api token created");
        Ok(CreatedToken { token: created, plain })
    }

    /// Resolves a plain token to its row and permissions.
    pub fn validate(&self, ctx: &Ctx, plain: &str) -> Result<(Token, SubjectPermissions)> {
        if !token::has_token_shape(plain) {
            return Err(Error::InvalidToken);
        }
        let hash = token::hash(plain);
        self.store.read(ctx, |conn| {
            let found = tokens::get_by_hash(conn, &hash)?.ok_or(Error::InvalidToken)?;
            if !token::hashes_match(&found.token_hash, &hash) {
                return Err(Error::InvalidToken);
            }
            if found.is_expired(now()) {
                return Err(Error::TokenExpired);
            }
            let permissions = role_permissions(conn, &token_role_code(&found.name), RoleType::Token)?;
            Ok((found, permissions))
        })
    }

    pub fn get(&self, ctx: &Ctx, id: i64) -> Result<Token> {
        self.store
            .read(ctx, |conn| tokens::get(conn, id))?
            .ok_or(Error::TokenNotFound)
    }

    pub fn permissions(&self, ctx: &Ctx, id: i64) -> Result<SubjectPermissions> {
        self.store.read(ctx, |conn| {
            let found = tokens::get(conn, id)?.ok_or(Error::TokenNotFound)?;
            role_permissions(conn, &token_role_code(&found.name), RoleType::Token)
        })
    }

    /// Deletes the token and its implicit role.
    pub fn delete(&self, ctx: &Ctx, id: i64) -> Result<()> {
        let name = self.store.write(ctx, |tx| {
            let found = tokens::get(tx, id)?.ok_or(Error::TokenNotFound)?;
            if let Some(role) = roles::get_by_code(tx, &token_role_code(&found.name), RoleType::Token)? {
                roles::delete(tx, role.id)?;
            }
            tokens::delete(tx, id)?;
            Ok(found.name)
        })?;
        tracing::info!(token_id = id, name = %name, "api token deleted");
        Ok(())
    }

    pub fn list(&self, ctx: &Ctx, params: &ListParams) -> Result<Paginated<Token>> {
        let mut query = params.sorted(tokens::select(), tokens::SORT_COLUMNS);
        if let Some(term) = params.search_term() {
            query = query.filter(Condition::contains("name", term));
        }
        self.store.read(ctx, |conn| tokens::search(conn, query, params.page))
    }
}
