//! Storage shared by the two draftable row kinds (redirects and pages).
//!
//! Each kind has a row table holding published rows and unpublished stubs,
//! and a draft table whose `new_*` columns embed a copy of the payload.
//! The payload type describes its columns through [`DraftPayload`].

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::query::{self, Condition, Paginated, Pagination, Select};
use super::{format_datetime, now, parse_column, parse_datetime, parse_optional_datetime};
use crate::error::{Error, Result};
use crate::types::{ChangeType, Draft, Record};

/// Rows deleted per statement when removing by id.
const DELETE_CHUNK: usize = 500;

pub trait DraftPayload: Sized + Clone {
    /// Human readable entity name used in `NotFound` errors.
    const ENTITY: &'static str;
    const ROW_TABLE: &'static str;
    const DRAFT_TABLE: &'static str;
    const OLD_ID_COLUMN: &'static str;
    /// Column that must be unique per project (`source` or `path`).
    const KEY_COLUMN: &'static str;
    /// Payload columns of the row table; draft columns carry a `new_` prefix.
    const COLUMNS: &'static [&'static str];

    fn key(&self) -> &str;

    /// Values for [`COLUMNS`](Self::COLUMNS), in order.
    fn to_values(&self) -> Vec<Value>;

    /// Reads the payload starting at `offset`. NULL payload columns mean a stub.
    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<Self>>;
}

fn draft_key_column<P: DraftPayload>() -> String {
    format!("new_{}", P::KEY_COLUMN)
}

fn draft_payload_columns<P: DraftPayload>() -> Vec<String> {
    P::COLUMNS.iter().map(|c| format!("new_{c}")).collect()
}

fn row_columns<P: DraftPayload>() -> String {
    format!(
        "id, namespace_code, project_code, {}, is_published, published_at, created_at, updated_at",
        P::COLUMNS.join(", ")
    )
}

fn draft_columns<P: DraftPayload>() -> String {
    format!(
        "id, namespace_code, project_code, change_type, {}, {}, created_at, updated_at",
        P::OLD_ID_COLUMN,
        draft_payload_columns::<P>().join(", ")
    )
}

fn map_record<P: DraftPayload>(row: &Row<'_>) -> rusqlite::Result<Record<P>> {
    let n = P::COLUMNS.len();
    Ok(Record {
        id: row.get(0)?,
        namespace_code: row.get(1)?,
        project_code: row.get(2)?,
        data: P::from_row(row, 3)?,
        is_published: row.get(3 + n)?,
        published_at: parse_optional_datetime(row.get(4 + n)?),
        created_at: parse_datetime(&row.get::<_, String>(5 + n)?),
        updated_at: parse_datetime(&row.get::<_, String>(6 + n)?),
    })
}

fn map_draft<P: DraftPayload>(row: &Row<'_>) -> rusqlite::Result<Draft<P>> {
    let n = P::COLUMNS.len();
    Ok(Draft {
        id: row.get(0)?,
        namespace_code: row.get(1)?,
        project_code: row.get(2)?,
        change_type: parse_column(row, 3)?,
        old_id: row.get(4)?,
        new_data: P::from_row(row, 5)?,
        created_at: parse_datetime(&row.get::<_, String>(5 + n)?),
        updated_at: parse_datetime(&row.get::<_, String>(6 + n)?),
    })
}

fn payload_values<P: DraftPayload>(payload: Option<&P>) -> Vec<Value> {
    match payload {
        Some(p) => p.to_values(),
        None => vec![Value::Null; P::COLUMNS.len()],
    }
}

// Rows

#[must_use]
pub fn select_records<P: DraftPayload>() -> Select {
    Select::from(P::ROW_TABLE, row_columns::<P>())
}

#[must_use]
pub fn select_published<P: DraftPayload>(namespace: &str, project: &str) -> Select {
    select_records::<P>()
        .filter(Condition::eq("namespace_code", namespace))
        .filter(Condition::eq("project_code", project))
        .filter(Condition::eq("is_published", true))
}

pub fn get_record<P: DraftPayload>(
    conn: &Connection,
    namespace: &str,
    project: &str,
    id: i64,
) -> Result<Option<Record<P>>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1 AND namespace_code = ?2 AND project_code = ?3",
        row_columns::<P>(),
        P::ROW_TABLE
    );
    conn.query_row(&sql, params![id, namespace, project], map_record::<P>)
        .optional()
        .map_err(Error::from)
}

pub fn search_records<P: DraftPayload>(
    conn: &Connection,
    query: Select,
    page: Pagination,
) -> Result<Paginated<Record<P>>> {
    let query = if query.has_order() {
        query
    } else {
        query.order_by("id", query::Direction::Asc)
    };
    query::search_paginate(conn, query, page, map_record::<P>)
}

/// All published rows of a project, oldest first.
pub fn list_published<P: DraftPayload>(
    conn: &Connection,
    namespace: &str,
    project: &str,
) -> Result<Vec<Record<P>>> {
    let query = select_published::<P>(namespace, project).order_by("id", query::Direction::Asc);
    query::fetch_all(conn, &query, map_record::<P>)
}

/// Published row currently holding `key`, if any.
pub fn find_published_by_key<P: DraftPayload>(
    conn: &Connection,
    namespace: &str,
    project: &str,
    key: &str,
) -> Result<Option<Record<P>>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE namespace_code = ?1 AND project_code = ?2
         AND is_published = 1 AND {} = ?3 ORDER BY id LIMIT 1",
        row_columns::<P>(),
        P::ROW_TABLE,
        P::KEY_COLUMN
    );
    conn.query_row(&sql, params![namespace, project, key], map_record::<P>)
        .optional()
        .map_err(Error::from)
}

/// Inserts an unpublished row with no payload and returns its id.
pub fn insert_stub<P: DraftPayload>(conn: &Connection, namespace: &str, project: &str) -> Result<i64> {
    let sql = format!(
        "INSERT INTO {} (namespace_code, project_code, is_published, created_at, updated_at)
         VALUES (?1, ?2, 0, ?3, ?3)",
        P::ROW_TABLE
    );
    conn.execute(&sql, params![namespace, project, format_datetime(&now())])?;
    Ok(conn.last_insert_rowid())
}

/// Writes `payload` onto the row and marks it published.
pub fn publish_row<P: DraftPayload>(
    conn: &Connection,
    id: i64,
    payload: &P,
    published_at: DateTime<Utc>,
) -> Result<()> {
    let assignments: Vec<String> = P::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{c} = ?{}", i + 1))
        .collect();
    let n = P::COLUMNS.len();
    let sql = format!(
        "UPDATE {} SET {}, is_published = 1, published_at = ?{}, updated_at = ?{} WHERE id = ?{}",
        P::ROW_TABLE,
        assignments.join(", "),
        n + 1,
        n + 1,
        n + 2
    );
    let mut values = payload.to_values();
    values.push(Value::Text(format_datetime(&published_at)));
    values.push(Value::Integer(id));
    let mut stmt = conn.prepare_cached(&sql)?;
    stmt.execute(params_from_iter(values.iter()))?;
    Ok(())
}

pub fn delete_row<P: DraftPayload>(conn: &Connection, id: i64) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", P::ROW_TABLE);
    Ok(conn.execute(&sql, params![id])? > 0)
}

pub fn delete_rows<P: DraftPayload>(conn: &Connection, ids: &[i64]) -> Result<usize> {
    let mut deleted = 0;
    for chunk in ids.chunks(DELETE_CHUNK) {
        let sql = format!(
            "DELETE FROM {} WHERE id IN ({})",
            P::ROW_TABLE,
            vec!["?"; chunk.len()].join(", ")
        );
        deleted += conn.execute(&sql, params_from_iter(chunk.iter()))?;
    }
    Ok(deleted)
}

/// Removes every row of the project that was never published.
pub fn delete_unpublished<P: DraftPayload>(
    conn: &Connection,
    namespace: &str,
    project: &str,
) -> Result<usize> {
    let sql = format!(
        "DELETE FROM {} WHERE namespace_code = ?1 AND project_code = ?2 AND is_published = 0",
        P::ROW_TABLE
    );
    Ok(conn.execute(&sql, params![namespace, project])?)
}

// Drafts

#[must_use]
pub fn select_drafts<P: DraftPayload>(namespace: &str, project: &str) -> Select {
    Select::from(P::DRAFT_TABLE, draft_columns::<P>())
        .filter(Condition::eq("namespace_code", namespace))
        .filter(Condition::eq("project_code", project))
}

pub fn get_draft<P: DraftPayload>(
    conn: &Connection,
    namespace: &str,
    project: &str,
    id: i64,
) -> Result<Option<Draft<P>>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1 AND namespace_code = ?2 AND project_code = ?3",
        draft_columns::<P>(),
        P::DRAFT_TABLE
    );
    conn.query_row(&sql, params![id, namespace, project], map_draft::<P>)
        .optional()
        .map_err(Error::from)
}

/// The pending draft owning row `old_id`, if any.
pub fn draft_for_row<P: DraftPayload>(conn: &Connection, old_id: i64) -> Result<Option<Draft<P>>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?1",
        draft_columns::<P>(),
        P::DRAFT_TABLE,
        P::OLD_ID_COLUMN
    );
    conn.query_row(&sql, params![old_id], map_draft::<P>)
        .optional()
        .map_err(Error::from)
}

/// Non-delete draft whose new payload holds `key`, if any.
pub fn find_draft_by_key<P: DraftPayload>(
    conn: &Connection,
    namespace: &str,
    project: &str,
    key: &str,
) -> Result<Option<Draft<P>>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE namespace_code = ?1 AND project_code = ?2
         AND change_type != 'DELETE' AND {} = ?3 ORDER BY id LIMIT 1",
        draft_columns::<P>(),
        P::DRAFT_TABLE,
        draft_key_column::<P>()
    );
    conn.query_row(&sql, params![namespace, project, key], map_draft::<P>)
        .optional()
        .map_err(Error::from)
}

pub fn list_drafts<P: DraftPayload>(
    conn: &Connection,
    namespace: &str,
    project: &str,
) -> Result<Vec<Draft<P>>> {
    let query = select_drafts::<P>(namespace, project).order_by("id", query::Direction::Asc);
    query::fetch_all(conn, &query, map_draft::<P>)
}

pub fn search_drafts<P: DraftPayload>(
    conn: &Connection,
    query: Select,
    page: Pagination,
) -> Result<Paginated<Draft<P>>> {
    let query = if query.has_order() {
        query
    } else {
        query.order_by("id", query::Direction::Asc)
    };
    query::search_paginate(conn, query, page, map_draft::<P>)
}

pub fn count_drafts<P: DraftPayload>(conn: &Connection, namespace: &str, project: &str) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE namespace_code = ?1 AND project_code = ?2",
        P::DRAFT_TABLE
    );
    Ok(conn.query_row(&sql, params![namespace, project], |row| row.get(0))?)
}

pub fn insert_draft<P: DraftPayload>(
    conn: &Connection,
    namespace: &str,
    project: &str,
    change_type: ChangeType,
    old_id: i64,
    payload: Option<&P>,
) -> Result<Draft<P>> {
    let payload_columns = draft_payload_columns::<P>();
    let placeholders: Vec<String> = (0..payload_columns.len()).map(|i| format!("?{}", i + 6)).collect();
    let sql = format!(
        "INSERT INTO {} (namespace_code, project_code, change_type, {}, created_at, updated_at, {})
         VALUES (?1, ?2, ?3, ?4, ?5, ?5, {})",
        P::DRAFT_TABLE,
        P::OLD_ID_COLUMN,
        payload_columns.join(", "),
        placeholders.join(", ")
    );

    let ts = now();
    let mut values = vec![
        Value::Text(namespace.to_string()),
        Value::Text(project.to_string()),
        Value::Text(change_type.as_str().to_string()),
        Value::Integer(old_id),
        Value::Text(format_datetime(&ts)),
    ];
    values.extend(payload_values(payload));

    if let Err(e) = conn.execute(&sql, params_from_iter(values.iter())) {
        return match Error::from(e) {
            err if err.is_constraint() => Err(Error::AlreadyExists("draft")),
            err => Err(err),
        };
    }

    Ok(Draft {
        id: conn.last_insert_rowid(),
        namespace_code: namespace.to_string(),
        project_code: project.to_string(),
        change_type,
        old_id,
        new_data: payload.cloned(),
        created_at: ts,
        updated_at: ts,
    })
}

/// Replaces the embedded payload (and change type) of a draft.
pub fn update_draft<P: DraftPayload>(
    conn: &Connection,
    id: i64,
    change_type: ChangeType,
    payload: &P,
) -> Result<()> {
    let assignments: Vec<String> = draft_payload_columns::<P>()
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{c} = ?{}", i + 1))
        .collect();
    let n = P::COLUMNS.len();
    let sql = format!(
        "UPDATE {} SET {}, change_type = ?{}, updated_at = ?{} WHERE id = ?{}",
        P::DRAFT_TABLE,
        assignments.join(", "),
        n + 1,
        n + 2,
        n + 3
    );
    let mut values = payload.to_values();
    values.push(Value::Text(change_type.as_str().to_string()));
    values.push(Value::Text(format_datetime(&now())));
    values.push(Value::Integer(id));
    let rows = conn.execute(&sql, params_from_iter(values.iter()))?;
    if rows == 0 {
        return Err(Error::NotFound("draft"));
    }
    Ok(())
}

pub fn delete_draft<P: DraftPayload>(conn: &Connection, id: i64) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", P::DRAFT_TABLE);
    Ok(conn.execute(&sql, params![id])? > 0)
}

pub fn delete_drafts<P: DraftPayload>(conn: &Connection, namespace: &str, project: &str) -> Result<usize> {
    let sql = format!(
        "DELETE FROM {} WHERE namespace_code = ?1 AND project_code = ?2",
        P::DRAFT_TABLE
    );
    Ok(conn.execute(&sql, params![namespace, project])?)
}

/// True when no published row and no pending non-delete draft of the
/// project uses `key`.
///
/// `exclude_old_id` skips the published row being edited; `exclude_draft_id`
/// skips the draft being edited.
pub fn key_available<P: DraftPayload>(
    conn: &Connection,
    namespace: &str,
    project: &str,
    key: &str,
    exclude_old_id: Option<i64>,
    exclude_draft_id: Option<i64>,
) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(
             SELECT 1 FROM {rows} WHERE namespace_code = ?1 AND project_code = ?2
             AND is_published = 1 AND {key} = ?3 AND (?4 IS NULL OR id != ?4)
         ) OR EXISTS(
             SELECT 1 FROM {drafts} WHERE namespace_code = ?1 AND project_code = ?2
             AND change_type != 'DELETE' AND {draft_key} = ?3 AND (?5 IS NULL OR id != ?5)
         )",
        rows = P::ROW_TABLE,
        key = P::KEY_COLUMN,
        drafts = P::DRAFT_TABLE,
        draft_key = draft_key_column::<P>(),
    );
    let taken: bool = conn.query_row(
        &sql,
        params![namespace, project, key, exclude_old_id, exclude_draft_id],
        |row| row.get(0),
    )?;
    Ok(!taken)
}

/// Counts per value of `column` in the row table (published rows only).
pub fn count_published_by<P: DraftPayload>(
    conn: &Connection,
    namespace: &str,
    project: &str,
    column: &str,
) -> Result<Vec<(String, i64)>> {
    let sql = format!(
        "SELECT {column}, COUNT(*) FROM {} WHERE namespace_code = ?1 AND project_code = ?2
         AND is_published = 1 GROUP BY {column} ORDER BY {column}",
        P::ROW_TABLE
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![namespace, project], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Counts pending drafts per change type.
pub fn count_drafts_by_change_type<P: DraftPayload>(
    conn: &Connection,
    namespace: &str,
    project: &str,
) -> Result<Vec<(String, i64)>> {
    let sql = format!(
        "SELECT change_type, COUNT(*) FROM {} WHERE namespace_code = ?1 AND project_code = ?2
         GROUP BY change_type ORDER BY change_type",
        P::DRAFT_TABLE
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![namespace, project], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{seed_project, store};
    use crate::store::Ctx;
    use crate::types::{RedirectData, RedirectStatus, RedirectType};

    fn redirect(source: &str, target: &str) -> RedirectData {
        RedirectData::new(RedirectType::Basic, source, target, RedirectStatus::MovedPermanent)
    }

    #[test]
    fn test_stub_and_create_draft() {
        let (_temp, store) = store();
        seed_project(&store, "ns", "p");
        let ctx = Ctx::new();

        let draft = store
            .write(&ctx, |tx| {
                let stub = insert_stub::<RedirectData>(tx, "ns", "p")?;
                insert_draft(tx, "ns", "p", ChangeType::Create, stub, Some(&redirect("/a", "/b")))
            })
            .unwrap();

        let (stub, loaded) = store
            .read(&ctx, |conn| {
                Ok((
                    get_record::<RedirectData>(conn, "ns", "p", draft.old_id)?,
                    get_draft::<RedirectData>(conn, "ns", "p", draft.id)?,
                ))
            })
            .unwrap();
        let stub = stub.unwrap();
        assert!(!stub.is_published);
        assert!(stub.data.is_none());
        assert_eq!(loaded.unwrap(), draft);
    }

    #[test]
    fn test_one_draft_per_row() {
        let (_temp, store) = store();
        seed_project(&store, "ns", "p");
        let ctx = Ctx::new();
        let result = store.write(&ctx, |tx| {
            let stub = insert_stub::<RedirectData>(tx, "ns", "p")?;
            insert_draft(tx, "ns", "p", ChangeType::Create, stub, Some(&redirect("/a", "/b")))?;
            insert_draft(tx, "ns", "p", ChangeType::Update, stub, Some(&redirect("/a", "/c")))
        });
        assert!(matches!(result, Err(Error::AlreadyExists("draft"))));
    }

    #[test]
    fn test_key_available_considers_published_and_drafts() {
        let (_temp, store) = store();
        seed_project(&store, "ns", "p");
        let ctx = Ctx::new();

        let (published_id, draft) = store
            .write(&ctx, |tx| {
                let id = insert_stub::<RedirectData>(tx, "ns", "p")?;
                publish_row(tx, id, &redirect("/pub", "/x"), now())?;
                let stub = insert_stub::<RedirectData>(tx, "ns", "p")?;
                let draft =
                    insert_draft(tx, "ns", "p", ChangeType::Create, stub, Some(&redirect("/draft", "/x")))?;
                Ok((id, draft))
            })
            .unwrap();

        store
            .read(&ctx, |conn| {
                assert!(!key_available::<RedirectData>(conn, "ns", "p", "/pub", None, None)?);
                assert!(key_available::<RedirectData>(conn, "ns", "p", "/pub", Some(published_id), None)?);
                assert!(!key_available::<RedirectData>(conn, "ns", "p", "/draft", None, None)?);
                assert!(key_available::<RedirectData>(conn, "ns", "p", "/draft", None, Some(draft.id))?);
                assert!(key_available::<RedirectData>(conn, "ns", "p", "/free", None, None)?);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_delete_drafts_are_ignored_by_uniqueness() {
        let (_temp, store) = store();
        seed_project(&store, "ns", "p");
        let ctx = Ctx::new();
        store
            .write(&ctx, |tx| {
                let id = insert_stub::<RedirectData>(tx, "ns", "p")?;
                insert_draft(tx, "ns", "p", ChangeType::Delete, id, Some(&redirect("/gone", "/x")))?;
                Ok(())
            })
            .unwrap();
        let available = store
            .read(&ctx, |conn| key_available::<RedirectData>(conn, "ns", "p", "/gone", None, None))
            .unwrap();
        assert!(available);
    }

    #[test]
    fn test_delete_unpublished_keeps_published() {
        let (_temp, store) = store();
        seed_project(&store, "ns", "p");
        let ctx = Ctx::new();
        let removed = store
            .write(&ctx, |tx| {
                let id = insert_stub::<RedirectData>(tx, "ns", "p")?;
                publish_row(tx, id, &redirect("/keep", "/x"), now())?;
                insert_stub::<RedirectData>(tx, "ns", "p")?;
                insert_stub::<RedirectData>(tx, "ns", "p")?;
                delete_unpublished::<RedirectData>(tx, "ns", "p")
            })
            .unwrap();
        assert_eq!(removed, 2);
        let published = store
            .read(&ctx, |conn| list_published::<RedirectData>(conn, "ns", "p"))
            .unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].data.as_ref().unwrap().source, "/keep");
    }

    #[test]
    fn test_delete_rows_in_chunks() {
        let (_temp, store) = store();
        seed_project(&store, "ns", "p");
        let ctx = Ctx::new();
        let deleted = store
            .write(&ctx, |tx| {
                let mut ids = Vec::new();
                for _ in 0..1203 {
                    ids.push(insert_stub::<RedirectData>(tx, "ns", "p")?);
                }
                delete_rows::<RedirectData>(tx, &ids)
            })
            .unwrap();
        assert_eq!(deleted, 1203);
    }
}
