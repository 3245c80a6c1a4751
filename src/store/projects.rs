use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::query::{self, Paginated, Pagination, Select};
use super::{format_datetime, now, parse_datetime, parse_optional_datetime};
use crate::error::{Error, Result};
use crate::types::Project;

pub const TABLE: &str = "projects";
const COLUMNS: &str = "namespace_code, code, name, version, published_at, created_at, updated_at";

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("namespaceCode", "namespace_code"),
    ("code", "code"),
    ("name", "name"),
    ("version", "version"),
    ("publishedAt", "published_at"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

fn map_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        namespace_code: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        version: row.get(3)?,
        published_at: parse_optional_datetime(row.get(4)?),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

#[must_use]
pub fn select() -> Select {
    Select::from(TABLE, COLUMNS)
}

pub fn get(conn: &Connection, namespace: &str, code: &str) -> Result<Option<Project>> {
    conn.query_row(
        "SELECT namespace_code, code, name, version, published_at, created_at, updated_at
         FROM projects WHERE namespace_code = ?1 AND code = ?2",
        params![namespace, code],
        map_row,
    )
    .optional()
    .map_err(Error::from)
}

/// Fetches the project or fails with `NotFound("project")`.
pub fn require(conn: &Connection, namespace: &str, code: &str) -> Result<Project> {
    get(conn, namespace, code)?.ok_or(Error::NotFound("project"))
}

pub fn insert(conn: &Connection, namespace: &str, code: &str, name: &str) -> Result<Project> {
    let ts = now();
    let result = conn.execute(
        "INSERT INTO projects (namespace_code, code, name, version, published_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, 1, NULL, ?4, ?4)",
        params![namespace, code, name, format_datetime(&ts)],
    );
    match result {
        Ok(_) => Ok(Project {
            namespace_code: namespace.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            version: 1,
            published_at: None,
            created_at: ts,
            updated_at: ts,
        }),
        Err(e) => match Error::from(e) {
            err if err.is_constraint() => Err(Error::AlreadyExists("project")),
            err => Err(err),
        },
    }
}

pub fn update_name(conn: &Connection, namespace: &str, code: &str, name: &str) -> Result<Project> {
    let rows = conn.execute(
        "UPDATE projects SET name = ?1, updated_at = ?2 WHERE namespace_code = ?3 AND code = ?4",
        params![name, format_datetime(&now()), namespace, code],
    )?;
    if rows == 0 {
        return Err(Error::NotFound("project"));
    }
    require(conn, namespace, code)
}

pub fn delete(conn: &Connection, namespace: &str, code: &str) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM projects WHERE namespace_code = ?1 AND code = ?2",
        params![namespace, code],
    )?;
    Ok(rows > 0)
}

/// Marks the project as publishing, stamped with `claimed_at`.
///
/// Succeeds when no claim is held or the held one is older than
/// `stale_before`; otherwise fails with `PublishInProgress`.
pub fn claim_publish(
    conn: &Connection,
    namespace: &str,
    code: &str,
    claimed_at: DateTime<Utc>,
    stale_before: DateTime<Utc>,
) -> Result<()> {
    let rows = conn.execute(
        "UPDATE projects SET publishing_since = ?1
         WHERE namespace_code = ?2 AND code = ?3
         AND (publishing_since IS NULL OR publishing_since < ?4)",
        params![format_datetime(&claimed_at), namespace, code, format_datetime(&stale_before)],
    )?;
    if rows == 0 {
        require(conn, namespace, code)?;
        return Err(Error::PublishInProgress);
    }
    Ok(())
}

/// The start of the publish currently holding the project, if any.
pub fn publishing_since(conn: &Connection, namespace: &str, code: &str) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT publishing_since FROM projects WHERE namespace_code = ?1 AND code = ?2",
            params![namespace, code],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(Error::NotFound("project"))?;
    Ok(parse_optional_datetime(raw))
}

/// Clears the claim stamped `claimed_at`. A claim taken over by another
/// publish is left alone. Returns whether the claim was still held.
pub fn release_publish(conn: &Connection, namespace: &str, code: &str, claimed_at: DateTime<Utc>) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE projects SET publishing_since = NULL
         WHERE namespace_code = ?1 AND code = ?2 AND publishing_since = ?3",
        params![namespace, code, format_datetime(&claimed_at)],
    )?;
    Ok(rows > 0)
}

pub fn record_publish(
    conn: &Connection,
    namespace: &str,
    code: &str,
    version: i64,
    published_at: DateTime<Utc>,
) -> Result<()> {
    let ts = format_datetime(&published_at);
    conn.execute(
        "UPDATE projects SET version = ?1, published_at = ?2, updated_at = ?2, publishing_since = NULL
         WHERE namespace_code = ?3 AND code = ?4",
        params![version, ts, namespace, code],
    )?;
    Ok(())
}

pub fn search(conn: &Connection, query: Select, page: Pagination) -> Result<Paginated<Project>> {
    let query = if query.has_order() {
        query
    } else {
        query
            .order_by("namespace_code", query::Direction::Asc)
            .order_by("code", query::Direction::Asc)
    };
    query::search_paginate(conn, query, page, map_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::store;
    use crate::store::{Ctx, namespaces};

    #[test]
    fn test_project_crud() {
        let (_temp, store) = store();
        let ctx = Ctx::new();
        store.write(&ctx, |tx| namespaces::insert(tx, "ns", "ns")).unwrap();

        let project = store.write(&ctx, |tx| insert(tx, "ns", "web", "Website")).unwrap();
        assert_eq!(project.version, 1);
        assert!(project.published_at.is_none());

        let dup = store.write(&ctx, |tx| insert(tx, "ns", "web", "Again"));
        assert!(matches!(dup, Err(Error::AlreadyExists("project"))));

        let renamed = store.write(&ctx, |tx| update_name(tx, "ns", "web", "Site")).unwrap();
        assert_eq!(renamed.name, "Site");
        assert_eq!(renamed.created_at, project.created_at);
    }

    #[test]
    fn test_namespace_delete_cascades() {
        let (_temp, store) = store();
        let ctx = Ctx::new();
        store
            .write(&ctx, |tx| {
                namespaces::insert(tx, "ns", "ns")?;
                insert(tx, "ns", "web", "Website")?;
                namespaces::delete(tx, "ns")
            })
            .unwrap();
        assert!(store.read(&ctx, |conn| get(conn, "ns", "web")).unwrap().is_none());
    }

    #[test]
    fn test_record_publish() {
        let (_temp, store) = store();
        let ctx = Ctx::new();
        let at = now();
        let project = store
            .write(&ctx, |tx| {
                namespaces::insert(tx, "ns", "ns")?;
                insert(tx, "ns", "web", "Website")?;
                let current = require(tx, "ns", "web")?;
                claim_publish(tx, "ns", "web", at, at)?;
                record_publish(tx, "ns", "web", current.version + 1, at)?;
                require(tx, "ns", "web")
            })
            .unwrap();
        assert_eq!(project.version, 2);
        assert_eq!(project.published_at, Some(at));
        assert_eq!(store.read(&ctx, |conn| publishing_since(conn, "ns", "web")).unwrap(), None);
    }

    #[test]
    fn test_publish_claim_is_exclusive_until_released() {
        let (_temp, store) = store();
        let ctx = Ctx::new();
        store
            .write(&ctx, |tx| {
                namespaces::insert(tx, "ns", "ns")?;
                insert(tx, "ns", "web", "Website")?;
                insert(tx, "ns", "blog", "Blog")
            })
            .unwrap();

        let first = now();
        let stale_before = first - chrono::Duration::minutes(10);
        store.write(&ctx, |tx| claim_publish(tx, "ns", "web", first, stale_before)).unwrap();
        assert!(matches!(
            store.write(&ctx, |tx| claim_publish(tx, "ns", "web", now(), stale_before)),
            Err(Error::PublishInProgress)
        ));
        // Claims are per project.
        store.write(&ctx, |tx| claim_publish(tx, "ns", "blog", now(), stale_before)).unwrap();

        assert!(store.write(&ctx, |tx| release_publish(tx, "ns", "web", first)).unwrap());
        assert!(!store.write(&ctx, |tx| release_publish(tx, "ns", "web", first)).unwrap());
        store.write(&ctx, |tx| claim_publish(tx, "ns", "web", now(), stale_before)).unwrap();
    }

    #[test]
    fn test_stale_publish_claim_is_taken_over() {
        let (_temp, store) = store();
        let ctx = Ctx::new();
        let abandoned = now() - chrono::Duration::hours(1);
        store
            .write(&ctx, |tx| {
                namespaces::insert(tx, "ns", "ns")?;
                insert(tx, "ns", "web", "Website")?;
                claim_publish(tx, "ns", "web", abandoned, abandoned)
            })
            .unwrap();

        let fresh = now();
        store
            .write(&ctx, |tx| claim_publish(tx, "ns", "web", fresh, fresh - chrono::Duration::minutes(10)))
            .unwrap();
        assert_eq!(store.read(&ctx, |conn| publishing_since(conn, "ns", "web")).unwrap(), Some(fresh));
        // The abandoned publish no longer owns the claim.
        assert!(!store.write(&ctx, |tx| release_publish(tx, "ns", "web", abandoned)).unwrap());
    }

    #[test]
    fn test_claim_missing_project() {
        let (_temp, store) = store();
        let ctx = Ctx::new();
        let at = now();
        let result = store.write(&ctx, |tx| claim_publish(tx, "ns", "nope", at, at));
        assert!(matches!(result, Err(Error::NotFound("project"))));
    }
}
