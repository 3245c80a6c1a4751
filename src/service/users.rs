use std::sync::Arc;

use crate::auth::PasswordManager;
use crate::error::{Error, Result};
use crate::store::users::NewUser;
use crate::store::{Condition, Ctx, Paginated, SqliteStore, permissions, roles, users};
use crate::types::{Role, RoleType, SubjectPermissions, User};
use crate::validate::{Rule, Validator};

use super::ListParams;
use super::roles::replace_role_permissions;

const USERNAME_MAX: usize = 255;
const NAME_MAX: usize = 255;
const PASSWORD_MIN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUserRequest {
    pub username: String,
    /// `None` creates a user that cannot log in with a password.
    pub password: Option<String>,
    pub active: bool,
    pub firstname: String,
    pub lastname: String,
}

pub struct UserService {
    store: Arc<SqliteStore>,
    passwords: PasswordManager,
}

fn check_password(password: &str) -> Result<()> {
    Validator::new()
        .check("password", "", "min", password.chars().count() >= PASSWORD_MIN)
        .finish()
        .map_err(Error::from)
}

impl UserService {
    pub fn new(store: Arc<SqliteStore>, passwords: PasswordManager) -> Self {
        Self { store, passwords }
    }

    /// Creates the user together with its implicit role.
    pub fn create(&self, ctx: &Ctx, request: &NewUserRequest) -> Result<User> {
        Validator::new()
            .field("username", &request.username, &[Rule::Required, Rule::Max(USERNAME_MAX), Rule::Code])
            .field("firstname", &request.firstname, &[Rule::Max(NAME_MAX)])
            .field("lastname", &request.lastname, &[Rule::Max(NAME_MAX)])
            .finish()?;
        let password_hash = match request.password.as_deref() {
            Some(password) => {
                check_password(password)?;
                Some(self.passwords.hash(password)?)
            }
            None => None,
        };

        let new_user = NewUser {
            username: request.username.clone(),
            password_hash,
            active: request.active,
            firstname: request.firstname.clone(),
            lastname: request.lastname.clone(),
        };
        let user = self.store.write(ctx, |tx| {
            let user = users::insert(tx, &new_user)?;
            roles::insert(tx, &user.username, RoleType::User)?;
            Ok(user)
        })?;
        tracing::info!(user_id = user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub fn get(&self, ctx: &Ctx, id: i64) -> Result<User> {
        self.store
            .read(ctx, |conn| users::get(conn, id))?
            .ok_or(Error::UserNotFound)
    }

    pub fn get_by_username(&self, ctx: &Ctx, username: &str) -> Result<User> {
        self.store
            .read(ctx, |conn| users::get_by_username(conn, username))?
            .ok_or(Error::UserNotFound)
    }

    pub fn update_profile(
        &self,
        ctx: &Ctx,
        id: i64,
        firstname: &str,
        lastname: &str,
        active: bool,
    ) -> Result<User> {
        Validator::new()
            .field("firstname", firstname, &[Rule::Max(NAME_MAX)])
            .field("lastname", lastname, &[Rule::Max(NAME_MAX)])
            .finish()?;
        self.store.write(ctx, |tx| {
            users::update_profile(tx, id, firstname, lastname, active)?;
            // A deactivated user keeps no usable refresh token.
            if !active {
                users::set_refresh_token_hash(tx, id, "")?;
            }
            users::get(tx, id)?.ok_or(Error::UserNotFound)
        })
    }

    /// Sets or clears the password; clearing disables password login.
    pub fn set_password(&self, ctx: &Ctx, id: i64, password: Option<&str>) -> Result<()> {
        let hash = match password {
            Some(password) => {
                check_password(password)?;
                Some(self.passwords.hash(password)?)
            }
            None => None,
        };
        self.store.write(ctx, |tx| {
            users::set_password(tx, id, hash.as_deref())?;
            users::set_refresh_token_hash(tx, id, "")
        })?;
        tracing::info!(user_id = id, "user password changed");
        Ok(())
    }

    /// Deletes the user and its implicit role.
    pub fn delete(&self, ctx: &Ctx, id: i64) -> Result<()> {
        let username = self.store.write(ctx, |tx| {
            let user = users::get(tx, id)?.ok_or(Error::UserNotFound)?;
            if let Some(role) = roles::get_by_code(tx, &user.username, RoleType::User)? {
                roles::delete(tx, role.id)?;
            }
            users::delete(tx, id)?;
            Ok(user.username)
        })?;
        tracing::info!(user_id = id, username = %username, "user deleted");
        Ok(())
    }

    pub fn list(&self, ctx: &Ctx, params: &ListParams) -> Result<Paginated<User>> {
        let mut query = params.sorted(users::select(), users::SORT_COLUMNS);
        if let Some(term) = params.search_term() {
            query = query.filter(Condition::AnyOf(vec![
                Condition::contains("username", term),
                Condition::contains("firstname", term),
                Condition::contains("lastname", term),
            ]));
        }
        self.store.read(ctx, |conn| users::search(conn, query, params.page))
    }

    pub fn roles(&self, ctx: &Ctx, id: i64) -> Result<Vec<Role>> {
        self.store.read(ctx, |conn| {
            users::get(conn, id)?.ok_or(Error::UserNotFound)?;
            roles::named_roles_for_user(conn, id)
        })
    }

    /// Replaces the user's named roles; implicit role links are kept.
    ///
    /// Any unknown code aborts the whole update.
    pub fn update_roles(&self, ctx: &Ctx, id: i64, codes: &[String]) -> Result<Vec<Role>> {
        let assigned = self.store.write(ctx, |tx| {
            users::get(tx, id)?.ok_or(Error::UserNotFound)?;
            roles::unassign_named(tx, id)?;
            for code in codes {
                let role = roles::get_by_code(tx, code, RoleType::Role)?
                    .ok_or_else(|| Error::RoleNotFound(code.clone()))?;
                roles::assign(tx, id, role.id)?;
            }
            roles::named_roles_for_user(tx, id)
        })?;
        tracing::info!(user_id = id, roles = assigned.len(), "user roles replaced");
        Ok(assigned)
    }

    /// Permissions granted directly through the user's implicit role.
    pub fn permissions(&self, ctx: &Ctx, id: i64) -> Result<SubjectPermissions> {
        self.store.read(ctx, |conn| {
            let user = users::get(conn, id)?.ok_or(Error::UserNotFound)?;
            match roles::get_by_code(conn, &user.username, RoleType::User)? {
                Some(role) => permissions::for_roles(conn, &[role.id]),
                None => Ok(SubjectPermissions::default()),
            }
        })
    }

    pub fn update_permissions(&self, ctx: &Ctx, id: i64, permissions: &SubjectPermissions) -> Result<SubjectPermissions> {
        let user = self.get(ctx, id)?;
        replace_role_permissions(&self.store, ctx, &user.username, RoleType::User, permissions)?;
        tracing::info!(user_id = id, "user permissions replaced");
        self.permissions(ctx, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::RoleService;
    use crate::store::test_support::store;
    use crate::types::{Action, ResourcePermission, Scope};

    fn request(username: &str) -> NewUserRequest {
        NewUserRequest {
            username: username.to_string(),
            password: Some("correct horse".to_string()),
            active: true,
            ..Default::default()
        }
    }

    fn services() -> (tempfile::TempDir, UserService, RoleService) {
        let (temp, store) = store();
        let store = Arc::new(store);
        (
            temp,
            UserService::new(store.clone(), PasswordManager::new()),
            RoleService::new(store),
        )
    }

    #[test]
    fn test_create_hashes_password_and_adds_implicit_role() {
        let (_temp, users, _roles) = services();
        let ctx = Ctx::new();
        let user = users.create(&ctx, &request("jane")).unwrap();
        let hash = user.password_hash.clone().unwrap();
        assert_ne!(hash, "correct horse");
        assert!(PasswordManager::new().verify("correct horse", &hash).unwrap());
        assert!(users.permissions(&ctx, user.id).unwrap().is_empty());

        assert!(matches!(
            users.create(&ctx, &request("jane")),
            Err(Error::AlreadyExists("user"))
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        let (_temp, users, _roles) = services();
        let mut req = request("jane");
        req.password = Some("short".into());
        assert!(matches!(users.create(&Ctx::new(), &req), Err(Error::Validation(_))));
    }

    #[test]
    fn test_update_roles_is_atomic() {
        let (_temp, users, roles) = services();
        let ctx = Ctx::new();
        let user = users.create(&ctx, &request("jane")).unwrap();
        roles.create(&ctx, "editors", &SubjectPermissions::default()).unwrap();
        roles.create(&ctx, "viewers", &SubjectPermissions::default()).unwrap();

        users.update_roles(&ctx, user.id, &["editors".to_string()]).unwrap();
        let err = users
            .update_roles(&ctx, user.id, &["viewers".to_string(), "ghost".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::RoleNotFound(code) if code == "ghost"));

        let codes: Vec<_> = users.roles(&ctx, user.id).unwrap().into_iter().map(|r| r.code).collect();
        assert_eq!(codes, vec!["editors"]);
    }

    #[test]
    fn test_user_permissions_use_implicit_role() {
        let (_temp, users, _roles) = services();
        let ctx = Ctx::new();
        let user = users.create(&ctx, &request("jane")).unwrap();
        let perms = SubjectPermissions::new(
            vec![ResourcePermission::new(Scope::Any, Scope::Any, Scope::Any, Scope::Exact(Action::Read))],
            vec![],
        );
        assert_eq!(users.update_permissions(&ctx, user.id, &perms).unwrap(), perms);
    }

    #[test]
    fn test_delete_removes_implicit_role() {
        let (_temp, users, _roles) = services();
        let ctx = Ctx::new();
        let user = users.create(&ctx, &request("jane")).unwrap();
        users.delete(&ctx, user.id).unwrap();
        assert!(matches!(users.get(&ctx, user.id), Err(Error::UserNotFound)));
        // The username can be reused because the implicit role is gone.
        users.create(&ctx, &request("jane")).unwrap();
    }

    #[test]
    fn test_clear_password() {
        let (_temp, users, _roles) = services();
        let ctx = Ctx::new();
        let user = users.create(&ctx, &request("jane")).unwrap();
        users.set_password(&ctx, user.id, None).unwrap();
        assert!(!users.get(&ctx, user.id).unwrap().can_authenticate());
    }
}
