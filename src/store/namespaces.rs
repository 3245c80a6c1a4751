use rusqlite::{Connection, OptionalExtension, Row, params};

use super::query::{self, Paginated, Pagination, Select};
use super::{format_datetime, now, parse_datetime};
use crate::error::{Error, Result};
use crate::types::Namespace;

pub const TABLE: &str = "namespaces";
const COLUMNS: &str = "code, name, created_at, updated_at";

/// External sort keys accepted by namespace listings.
pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("code", "code"),
    ("name", "name"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

fn map_row(row: &Row<'_>) -> rusqlite::Result<Namespace> {
    Ok(Namespace {
        code: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
        updated_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

#[must_use]
pub fn select() -> Select {
    Select::from(TABLE, COLUMNS)
}

pub fn get(conn: &Connection, code: &str) -> Result<Option<Namespace>> {
    conn.query_row(
        "SELECT code, name, created_at, updated_at FROM namespaces WHERE code = ?1",
        params![code],
        map_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert(conn: &Connection, code: &str, name: &str) -> Result<Namespace> {
    let ts = now();
    let result = conn.execute(
        "INSERT INTO namespaces (code, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![code, name, format_datetime(&ts)],
    );
    match result {
        Ok(_) => Ok(Namespace {
            code: code.to_string(),
            name: name.to_string(),
            created_at: ts,
            updated_at: ts,
        }),
        Err(e) => match Error::from(e) {
            err if err.is_constraint() => Err(Error::AlreadyExists("namespace")),
            err => Err(err),
        },
    }
}

pub fn update(conn: &Connection, code: &str, name: &str) -> Result<Namespace> {
    let rows = conn.execute(
        "UPDATE namespaces SET name = ?1, updated_at = ?2 WHERE code = ?3",
        params![name, format_datetime(&now()), code],
    )?;
    if rows == 0 {
        return Err(Error::NotFound("namespace"));
    }
    get(conn, code)?.ok_or(Error::NotFound("namespace"))
}

/// Deletes the namespace; its projects and everything they own cascade.
pub fn delete(conn: &Connection, code: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM namespaces WHERE code = ?1", params![code])?;
    Ok(rows > 0)
}

pub fn search(conn: &Connection, query: Select, page: Pagination) -> Result<Paginated<Namespace>> {
    let query = if query.has_order() {
        query
    } else {
        query.order_by("code", query::Direction::Asc)
    };
    query::search_paginate(conn, query, page, map_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Ctx;
    use crate::store::query::Condition;
    use crate::store::test_support::store;

    #[test]
    fn test_namespace_crud() {
        let (_temp, store) = store();
        let ctx = Ctx::new();

        store.write(&ctx, |tx| insert(tx, "acme", "Acme")).unwrap();
        let dup = store.write(&ctx, |tx| insert(tx, "acme", "Other"));
        assert!(matches!(dup, Err(Error::AlreadyExists("namespace"))));

        let updated = store.write(&ctx, |tx| update(tx, "acme", "Acme Corp")).unwrap();
        assert_eq!(updated.name, "Acme Corp");

        let missing = store.write(&ctx, |tx| update(tx, "nope", "x"));
        assert!(matches!(missing, Err(Error::NotFound("namespace"))));

        assert!(store.write(&ctx, |tx| delete(tx, "acme")).unwrap());
        assert!(store.read(&ctx, |conn| get(conn, "acme")).unwrap().is_none());
    }

    #[test]
    fn test_search_filters_and_counts() {
        let (_temp, store) = store();
        let ctx = Ctx::new();
        store
            .write(&ctx, |tx| {
                for code in ["a", "b", "c"] {
                    insert(tx, code, code)?;
                }
                Ok(())
            })
            .unwrap();

        let page = store
            .read(&ctx, |conn| {
                search(
                    conn,
                    select().filter(Condition::is_in("code", ["a", "c"])),
                    Pagination::new(Some(1), None),
                )
            })
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].code, "a");
    }
}
