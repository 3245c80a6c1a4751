use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of mutation a draft stages against its owning row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

impl ChangeType {
    pub const ALL: [ChangeType; 3] = [ChangeType::Create, ChangeType::Update, ChangeType::Delete];

    /// Derives the change type from which halves of a draft request are present.
    ///
    /// Returns `None` when neither an existing row nor a new payload is given.
    #[must_use]
    pub fn derive(has_old_row: bool, has_new_payload: bool) -> Option<ChangeType> {
        match (has_old_row, has_new_payload) {
            (true, true) => Some(ChangeType::Update),
            (false, true) => Some(ChangeType::Create),
            (true, false) => Some(ChangeType::Delete),
            (false, false) => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ChangeType::Create => "CREATE",
            ChangeType::Update => "UPDATE",
            ChangeType::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(ChangeType::Create),
            "UPDATE" => Ok(ChangeType::Update),
            "DELETE" => Ok(ChangeType::Delete),
            other => Err(format!("unknown change type '{other}'")),
        }
    }
}

/// A draftable row (redirect or page) as stored.
///
/// `data` is `None` only for stubs that were created to back a pending
/// CREATE draft and have never been published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<P> {
    pub id: i64,
    pub namespace_code: String,
    pub project_code: String,
    #[serde(flatten)]
    pub data: Option<P>,
    pub is_published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A staged mutation of a draftable row.
///
/// `old_id` always points at the owning row: the stub for CREATE drafts,
/// the published row for UPDATE and DELETE drafts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft<P> {
    pub id: i64,
    pub namespace_code: String,
    pub project_code: String,
    pub change_type: ChangeType,
    pub old_id: i64,
    #[serde(rename = "new", skip_serializing_if = "Option::is_none")]
    pub new_data: Option<P>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_cases_are_exclusive() {
        assert_eq!(ChangeType::derive(true, true), Some(ChangeType::Update));
        assert_eq!(ChangeType::derive(false, true), Some(ChangeType::Create));
        assert_eq!(ChangeType::derive(true, false), Some(ChangeType::Delete));
        assert_eq!(ChangeType::derive(false, false), None);
    }

    #[test]
    fn test_change_type_parse() {
        for ct in ChangeType::ALL {
            assert_eq!(ct.as_str().parse::<ChangeType>().unwrap(), ct);
        }
        assert!("create".parse::<ChangeType>().is_err());
    }
}
