//! Password login, refresh rotation and bearer authentication.

use std::sync::Arc;

use crate::auth::jwt::{TokenPair, TokenType};
use crate::auth::{AuthContext, AuthType, JwtIssuer, PasswordManager, token};
use crate::error::{Error, Result};
use crate::permission::user_permissions;
use crate::store::{Ctx, SqliteStore, users};
use crate::types::{SubjectPermissions, User};

use super::TokenService;

pub struct AuthService {
    store: Arc<SqliteStore>,
    passwords: PasswordManager,
    jwt: Arc<JwtIssuer>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(store: Arc<SqliteStore>, passwords: PasswordManager, jwt: Arc<JwtIssuer>) -> Self {
        Self {
            tokens: TokenService::new(store.clone()),
            store,
            passwords,
            jwt,
        }
    }

    /// Exchanges a username and password for a token pair.
    ///
    /// Unknown users and wrong passwords are both `InvalidCredentials`;
    /// inactive users and users without a password are `UserNotFound`.
    pub fn login(&self, ctx: &Ctx, username: &str, password: &str) -> Result<(User, TokenPair)> {
        let user = self.store.read(ctx, |conn| users::get_by_username(conn, username))?;
        let Some(user) = user else {
            tracing::warn!(username, "login failed: unknown user");
            return Err(Error::InvalidCredentials);
        };
        if !user.can_authenticate() {
            tracing::warn!(username, "login refused: user inactive or without password");
            return Err(Error::UserNotFound);
        }
        let hash = user.password_hash.as_deref().unwrap_or_default();
        if !self.passwords.verify(password, hash)? {
            tracing::warn!(username, "login failed: password mismatch");
            return Err(Error::InvalidCredentials);
        }

        let pair = self.jwt.issue_pair(user.id, &user.username)?;
        let refresh_hash = token::hash(&pair.refresh_token);
        self.store
            .write(ctx, |tx| users::set_refresh_token_hash(tx, user.id, &refresh_hash))?;
        tracing::info!(user_id = user.id, username, "user logged in");
        Ok((user, pair))
    }

    /// Rotates a refresh token; the presented one stops working.
    pub fn refresh(&self, ctx: &Ctx, refresh_token: &str) -> Result<(User, TokenPair)> {
        let claims = self.jwt.parse(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(Error::InvalidToken);
        }
        let user_id = claims.user_id()?;
        let presented = token::hash(refresh_token);

        // Compare and rotate under one write lock so a token is used once.
        let pair = self.store.write(ctx, |tx| {
            let user = users::get(tx, user_id)?.ok_or(Error::UserNotFound)?;
            if !user.active {
                return Err(Error::UserInactive);
            }
            if !token::hashes_match(&user.refresh_token_hash, &presented) {
                return Err(Error::InvalidToken);
            }
            let pair = self.jwt.issue_pair(user.id, &user.username)?;
            users::set_refresh_token_hash(tx, user.id, &token::hash(&pair.refresh_token))?;
            Ok((user, pair))
        });
        if let Err(e) = &pair {
            tracing::warn!(user_id, error = %e, "token refresh refused");
        }
        pair
    }

    /// Clears the stored refresh hash so no refresh token remains valid.
    pub fn logout(&self, ctx: &Ctx, user_id: i64) -> Result<()> {
        self.store
            .write(ctx, |tx| users::set_refresh_token_hash(tx, user_id, ""))?;
        tracing::info!(user_id, "user logged out");
        Ok(())
    }

    pub fn me(&self, ctx: &Ctx, user_id: i64) -> Result<(User, SubjectPermissions)> {
        self.store.read(ctx, |conn| {
            let user = users::get(conn, user_id)?.ok_or(Error::UserNotFound)?;
            let permissions = user_permissions(conn, &user)?;
            Ok((user, permissions))
        })
    }

    /// Resolves the credential of an `Authorization: Bearer` header.
    ///
    /// Values with the API token prefix are looked up as tokens, anything
    /// else must be an access JWT of an active user.
    pub fn authenticate_bearer(&self, ctx: &Ctx, raw: &str) -> Result<AuthContext> {
        if raw.starts_with(token::TOKEN_PREFIX) {
            let (found, permissions) = self.tokens.validate(ctx, raw)?;
            return Ok(AuthContext {
                user_id: 0,
                username: found.name,
                auth_type: AuthType::Token,
                permissions,
            });
        }

        let claims = self.jwt.parse(raw)?;
        if claims.token_type != TokenType::Access {
            return Err(Error::InvalidToken);
        }
        let user_id = claims.user_id()?;
        self.store.read(ctx, |conn| {
            let user = users::get(conn, user_id)?.ok_or(Error::InvalidToken)?;
            if !user.active {
                return Err(Error::UserInactive);
            }
            let permissions = user_permissions(conn, &user)?;
            Ok(AuthContext {
                user_id: user.id,
                username: user.username,
                auth_type: AuthType::Basic,
                permissions,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::service::users::{NewUserRequest, UserService};
    use crate::store::test_support::store;
    use crate::types::{Action, ResourceKind, ResourcePermission, Scope};

    struct Fixture {
        _temp: tempfile::TempDir,
        users: UserService,
        tokens: TokenService,
        auth: AuthService,
    }

    fn fixture() -> Fixture {
        let (temp, store) = store();
        let store = Arc::new(store);
        let jwt = JwtIssuer::new(&JwtConfig {
            secret: "test-secret".into(),
            ..JwtConfig::default()
        })
        .unwrap();
        Fixture {
            _temp: temp,
            users: UserService::new(store.clone(), PasswordManager::new()),
            tokens: TokenService::new(store.clone()),
            auth: AuthService::new(store, PasswordManager::new(), Arc::new(jwt)),
        }
    }

    fn create_user(f: &Fixture, username: &str, active: bool) -> User {
        f.users
            .create(
                &Ctx::new(),
                &NewUserRequest {
                    username: username.into(),
                    password: Some("correct horse".into()),
                    active,
                    ..Default::default()
                },
            )
            .unwrap()
    }

    #[test]
    fn test_login_outcomes() {
        let f = fixture();
        let ctx = Ctx::new();
        create_user(&f, "jane", true);
        create_user(&f, "sleepy", false);

        assert!(matches!(f.auth.login(&ctx, "ghost", "x"), Err(Error::InvalidCredentials)));
        assert!(matches!(f.auth.login(&ctx, "jane", "wrong"), Err(Error::InvalidCredentials)));
        assert!(matches!(
            f.auth.login(&ctx, "sleepy", "correct horse"),
            Err(Error::UserNotFound)
        ));

        let (user, pair) = f.auth.login(&ctx, "jane", "correct horse").unwrap();
        let stored = f.users.get(&ctx, user.id).unwrap();
        assert_eq!(stored.refresh_token_hash, token::hash(&pair.refresh_token));
    }

    #[test]
    fn test_refresh_rotates_and_old_token_dies() {
        let f = fixture();
        let ctx = Ctx::new();
        create_user(&f, "jane", true);
        let (_, first) = f.auth.login(&ctx, "jane", "correct horse").unwrap();

        let (_, second) = f.auth.refresh(&ctx, &first.refresh_token).unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);
        assert!(matches!(
            f.auth.refresh(&ctx, &first.refresh_token),
            Err(Error::InvalidToken)
        ));
        f.auth.refresh(&ctx, &second.refresh_token).unwrap();
    }

    #[test]
    fn test_refresh_rejects_access_token_and_inactive_user() {
        let f = fixture();
        let ctx = Ctx::new();
        let user = create_user(&f, "jane", true);
        let (_, pair) = f.auth.login(&ctx, "jane", "correct horse").unwrap();
        assert!(matches!(f.auth.refresh(&ctx, &pair.access_token), Err(Error::InvalidToken)));

        f.users.update_profile(&ctx, user.id, "", "", false).unwrap();
        assert!(matches!(
            f.auth.refresh(&ctx, &pair.refresh_token),
            Err(Error::UserInactive)
        ));
    }

    #[test]
    fn test_logout_invalidates_refresh() {
        let f = fixture();
        let ctx = Ctx::new();
        let user = create_user(&f, "jane", true);
        let (_, pair) = f.auth.login(&ctx, "jane", "correct horse").unwrap();
        f.auth.logout(&ctx, user.id).unwrap();
        assert!(matches!(f.auth.refresh(&ctx, &pair.refresh_token), Err(Error::InvalidToken)));
    }

    #[test]
    fn test_authenticate_bearer_jwt_and_token() {
        let f = fixture();
        let ctx = Ctx::new();
        let user = create_user(&f, "jane", true);
        let (_, pair) = f.auth.login(&ctx, "jane", "correct horse").unwrap();

        let basic = f.auth.authenticate_bearer(&ctx, &pair.access_token).unwrap();
        assert_eq!(basic.auth_type, AuthType::Basic);
        assert_eq!(basic.user_id, user.id);
        assert!(matches!(
            f.auth.authenticate_bearer(&ctx, &pair.refresh_token),
            Err(Error::InvalidToken)
        ));

        let rules = SubjectPermissions::new(
            vec![ResourcePermission::new(Scope::Any, Scope::Any, Scope::Exact(ResourceKind::Page), Scope::Any)],
            vec![],
        );
        let created = f.tokens.create(&ctx, "ci", None, &rules).unwrap();
        let token_auth = f.auth.authenticate_bearer(&ctx, &created.plain).unwrap();
        assert_eq!(token_auth.auth_type, AuthType::Token);
        assert_eq!(token_auth.user_id, 0);
        assert_eq!(token_auth.username, "ci");
        assert!(token_auth.can_resource("x", "y", ResourceKind::Page, Action::Write));
        assert!(!token_auth.can_resource("x", "y", ResourceKind::Redirect, Action::Read));

        assert!(matches!(f.auth.authenticate_bearer(&ctx, "garbage"), Err(Error::InvalidToken)));
    }
}
