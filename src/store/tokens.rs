use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::query::{self, Paginated, Pagination, Select};
use super::{format_datetime, now, parse_datetime, parse_optional_datetime};
use crate::error::{Error, Result};
use crate::types::Token;

pub const TABLE: &str = "tokens";
const COLUMNS: &str = "id, name, token_hash, preview, expires_at, created_at, updated_at";

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("name", "name"),
    ("expiresAt", "expires_at"),
    ("createdAt", "created_at"),
];

fn map_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        name: row.get(1)?,
        token_hash: row.get(2)?,
        preview: row.get(3)?,
        expires_at: parse_optional_datetime(row.get(4)?),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

#[must_use]
pub fn select() -> Select {
    Select::from(TABLE, COLUMNS)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Token>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM tokens WHERE id = ?1"),
        params![id],
        map_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Token>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM tokens WHERE name = ?1"),
        params![name],
        map_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn get_by_hash(conn: &Connection, token_hash: &str) -> Result<Option<Token>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM tokens WHERE token_hash = ?1"),
        params![token_hash],
        map_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert(
    conn: &Connection,
    name: &str,
    token_hash: &str,
    preview: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<Token> {
    let ts = now();
    let result = conn.execute(
        "INSERT INTO tokens (name, token_hash, preview, expires_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            name,
            token_hash,
            preview,
            expires_at.as_ref().map(format_datetime),
            format_datetime(&ts),
        ],
    );
    if let Err(e) = result {
        return match Error::from(e) {
            err if err.is_constraint() => Err(Error::AlreadyExists("token")),
            err => Err(err),
        };
    }
    Ok(Token {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        token_hash: token_hash.to_string(),
        preview: preview.to_string(),
        expires_at,
        created_at: ts,
        updated_at: ts,
    })
}

pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn.execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

pub fn search(conn: &Connection, query: Select, page: Pagination) -> Result<Paginated<Token>> {
    let query = if query.has_order() {
        query
    } else {
        query.order_by("id", query::Direction::Asc)
    };
    query::search_paginate(conn, query, page, map_row)
}
