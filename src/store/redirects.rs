use rusqlite::Row;
use rusqlite::types::{Type, Value};

use super::drafts::DraftPayload;
use crate::types::{RedirectData, RedirectStatus, RedirectType};

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("type", "type"),
    ("source", "source"),
    ("target", "target"),
    ("status", "status"),
    ("publishedAt", "published_at"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

pub const DRAFT_SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("changeType", "change_type"),
    ("type", "new_type"),
    ("source", "new_source"),
    ("target", "new_target"),
    ("status", "new_status"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

fn conversion_error(idx: usize, ty: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, message.into())
}

impl DraftPayload for RedirectData {
    const ENTITY: &'static str = "redirect";
    const ROW_TABLE: &'static str = "redirects";
    const DRAFT_TABLE: &'static str = "redirect_drafts";
    const OLD_ID_COLUMN: &'static str = "old_redirect_id";
    const KEY_COLUMN: &'static str = "source";
    const COLUMNS: &'static [&'static str] = &["type", "source", "target", "status"];

    fn key(&self) -> &str {
        &self.source
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.redirect_type.as_str().to_string()),
            Value::Text(self.source.clone()),
            Value::Text(self.target.clone()),
            Value::Integer(i64::from(self.status.code())),
        ]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<Self>> {
        let Some(raw_type) = row.get::<_, Option<String>>(offset)? else {
            return Ok(None);
        };
        let redirect_type: RedirectType = raw_type
            .parse()
            .map_err(|e| conversion_error(offset, Type::Text, e))?;
        let code: i64 = row.get(offset + 3)?;
        let status = u16::try_from(code)
            .ok()
            .and_then(RedirectStatus::from_code)
            .ok_or_else(|| conversion_error(offset + 3, Type::Integer, format!("unsupported status {code}")))?;

        Ok(Some(RedirectData {
            redirect_type,
            source: row.get(offset + 1)?,
            target: row.get(offset + 2)?,
            status,
        }))
    }
}
