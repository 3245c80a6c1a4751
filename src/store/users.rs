use rusqlite::{Connection, OptionalExtension, Row, params};

use super::query::{self, Paginated, Pagination, Select};
use super::{format_datetime, now, parse_datetime};
use crate::error::{Error, Result};
use crate::types::User;

pub const TABLE: &str = "users";
const COLUMNS: &str =
    "id, username, password, active, firstname, lastname, refresh_token_hash, created_at, updated_at";

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("username", "username"),
    ("firstname", "firstname"),
    ("lastname", "lastname"),
    ("active", "active"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

/// Fields of a user row supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password_hash: Option<String>,
    pub active: bool,
    pub firstname: String,
    pub lastname: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        active: row.get(3)?,
        firstname: row.get(4)?,
        lastname: row.get(5)?,
        refresh_token_hash: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

#[must_use]
pub fn select() -> Select {
    Select::from(TABLE, COLUMNS)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        map_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn get_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE username = ?1"),
        params![username],
        map_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert(conn: &Connection, user: &NewUser) -> Result<User> {
    let ts = now();
    let result = conn.execute(
        "INSERT INTO users (username, password, active, firstname, lastname, refresh_token_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, '', ?6, ?6)",
        params![
            user.username,
            user.password_hash,
            user.active,
            user.firstname,
            user.lastname,
            format_datetime(&ts),
        ],
    );
    if let Err(e) = result {
        return match Error::from(e) {
            err if err.is_constraint() => Err(Error::AlreadyExists("user")),
            err => Err(err),
        };
    }

    Ok(User {
        id: conn.last_insert_rowid(),
        username: user.username.clone(),
        password_hash: user.password_hash.clone(),
        active: user.active,
        firstname: user.firstname.clone(),
        lastname: user.lastname.clone(),
        refresh_token_hash: String::new(),
        created_at: ts,
        updated_at: ts,
    })
}

pub fn update_profile(
    conn: &Connection,
    id: i64,
    firstname: &str,
    lastname: &str,
    active: bool,
) -> Result<()> {
    let rows = conn.execute(
        "UPDATE users SET firstname = ?1, lastname = ?2, active = ?3, updated_at = ?4 WHERE id = ?5",
        params![firstname, lastname, active, format_datetime(&now()), id],
    )?;
    if rows == 0 {
        return Err(Error::UserNotFound);
    }
    Ok(())
}

/// `None` removes password login for the user.
pub fn set_password(conn: &Connection, id: i64, password_hash: Option<&str>) -> Result<()> {
    let rows = conn.execute(
        "UPDATE users SET password = ?1, updated_at = ?2 WHERE id = ?3",
        params![password_hash, format_datetime(&now()), id],
    )?;
    if rows == 0 {
        return Err(Error::UserNotFound);
    }
    Ok(())
}

/// Stores the hash of the current refresh token; `""` revokes it.
pub fn set_refresh_token_hash(conn: &Connection, id: i64, hash: &str) -> Result<()> {
    let rows = conn.execute(
        "UPDATE users SET refresh_token_hash = ?1 WHERE id = ?2",
        params![hash, id],
    )?;
    if rows == 0 {
        return Err(Error::UserNotFound);
    }
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

pub fn search(conn: &Connection, query: Select, page: Pagination) -> Result<Paginated<User>> {
    let query = if query.has_order() {
        query
    } else {
        query.order_by("id", query::Direction::Asc)
    };
    query::search_paginate(conn, query, page, map_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Ctx;
    use crate::store::test_support::store;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: Some("$argon2id$stub".to_string()),
            active: true,
            firstname: "Jane".to_string(),
            lastname: "Doe".to_string(),
        }
    }

    #[test]
    fn test_user_crud() {
        let (_temp, store) = store();
        let ctx = Ctx::new();

        let user = store.write(&ctx, |tx| insert(tx, &new_user("jane"))).unwrap();
        let dup = store.write(&ctx, |tx| insert(tx, &new_user("jane")));
        assert!(matches!(dup, Err(Error::AlreadyExists("user"))));

        store
            .write(&ctx, |tx| {
                update_profile(tx, user.id, "J", "D", false)?;
                set_refresh_token_hash(tx, user.id, "abc")?;
                set_password(tx, user.id, None)
            })
            .unwrap();

        let loaded = store
            .read(&ctx, |conn| get_by_username(conn, "jane"))
            .unwrap()
            .unwrap();
        assert_eq!(loaded.firstname, "J");
        assert!(!loaded.active);
        assert_eq!(loaded.refresh_token_hash, "abc");
        assert!(loaded.password_hash.is_none());

        assert!(store.write(&ctx, |tx| delete(tx, user.id)).unwrap());
        assert!(store.read(&ctx, |conn| get(conn, user.id)).unwrap().is_none());
    }

    #[test]
    fn test_update_missing_user() {
        let (_temp, store) = store();
        let ctx = Ctx::new();
        let result = store.write(&ctx, |tx| set_refresh_token_hash(tx, 42, ""));
        assert!(matches!(result, Err(Error::UserNotFound)));
    }
}
