use rusqlite::types::{Type, Value};
use rusqlite::{Connection, Row, params};

use super::drafts::DraftPayload;
use crate::error::Result;
use crate::types::{PageData, PageType};

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("type", "type"),
    ("path", "path"),
    ("contentType", "content_type"),
    ("contentSize", "content_size"),
    ("publishedAt", "published_at"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

pub const DRAFT_SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("changeType", "change_type"),
    ("type", "new_type"),
    ("path", "new_path"),
    ("contentSize", "new_content_size"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

impl DraftPayload for PageData {
    const ENTITY: &'static str = "page";
    const ROW_TABLE: &'static str = "pages";
    const DRAFT_TABLE: &'static str = "page_drafts";
    const OLD_ID_COLUMN: &'static str = "old_page_id";
    const KEY_COLUMN: &'static str = "path";
    // content_size is derived from content but stored for quota queries
    const COLUMNS: &'static [&'static str] = &["type", "path", "content", "content_type", "content_size"];

    fn key(&self) -> &str {
        &self.path
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.page_type.as_str().to_string()),
            Value::Text(self.path.clone()),
            Value::Text(self.content.clone()),
            Value::Text(self.content_type.clone()),
            Value::Integer(self.content_size()),
        ]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<Self>> {
        let Some(raw_type) = row.get::<_, Option<String>>(offset)? else {
            return Ok(None);
        };
        let page_type: PageType = raw_type.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(offset, Type::Text, e.into())
        })?;
        Ok(Some(PageData {
            page_type,
            path: row.get(offset + 1)?,
            content: row.get(offset + 2)?,
            content_type: row.get(offset + 3)?,
        }))
    }
}

/// Total size of the project's published pages.
pub fn published_content_size(conn: &Connection, namespace: &str, project: &str) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(content_size), 0) FROM pages
         WHERE namespace_code = ?1 AND project_code = ?2 AND is_published = 1",
        params![namespace, project],
        |row| row.get(0),
    )?)
}
