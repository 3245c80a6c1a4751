use rusqlite::{Connection, OptionalExtension, Row, params};

use super::query::{self, Paginated, Pagination, Select};
use super::{format_datetime, now, parse_column, parse_datetime};
use crate::error::{Error, Result};
use crate::types::{Role, RoleType};

pub const TABLE: &str = "roles";
const COLUMNS: &str = "id, code, type, created_at, updated_at";

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("code", "code"),
    ("type", "type"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

fn map_row(row: &Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        id: row.get(0)?,
        code: row.get(1)?,
        role_type: parse_column(row, 2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

#[must_use]
pub fn select() -> Select {
    Select::from(TABLE, COLUMNS)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Role>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM roles WHERE id = ?1"),
        params![id],
        map_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn get_by_code(conn: &Connection, code: &str, role_type: RoleType) -> Result<Option<Role>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM roles WHERE code = ?1 AND type = ?2"),
        params![code, role_type.as_str()],
        map_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert(conn: &Connection, code: &str, role_type: RoleType) -> Result<Role> {
    let ts = now();
    let result = conn.execute(
        "INSERT INTO roles (code, type, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![code, role_type.as_str(), format_datetime(&ts)],
    );
    if let Err(e) = result {
        return match Error::from(e) {
            err if err.is_constraint() => Err(Error::AlreadyExists("role")),
            err => Err(err),
        };
    }
    Ok(Role {
        id: conn.last_insert_rowid(),
        code: code.to_string(),
        role_type,
        created_at: ts,
        updated_at: ts,
    })
}

pub fn touch(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "UPDATE roles SET updated_at = ?1 WHERE id = ?2",
        params![format_datetime(&now()), id],
    )?;
    Ok(())
}

/// Deletes the role; its permissions and user links cascade.
pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn.execute("DELETE FROM roles WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

pub fn search(conn: &Connection, query: Select, page: Pagination) -> Result<Paginated<Role>> {
    let query = if query.has_order() {
        query
    } else {
        query.order_by("id", query::Direction::Asc)
    };
    query::search_paginate(conn, query, page, map_row)
}

// User <-> role links

pub fn assign(conn: &Connection, user_id: i64, role_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
        params![user_id, role_id],
    )?;
    Ok(())
}

/// Drops the user's links to named roles, keeping implicit ones.
pub fn unassign_named(conn: &Connection, user_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM user_roles WHERE user_id = ?1
         AND role_id IN (SELECT id FROM roles WHERE type = 'role')",
        params![user_id],
    )?)
}

/// Named roles linked to the user.
pub fn named_roles_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Role>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.code, r.type, r.created_at, r.updated_at
         FROM roles r JOIN user_roles ur ON ur.role_id = r.id
         WHERE ur.user_id = ?1 AND r.type = 'role' ORDER BY r.code",
    )?;
    let rows = stmt.query_map(params![user_id], map_row)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
