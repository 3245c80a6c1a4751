use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Draft, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Basic,
    BasicHost,
}

impl PageType {
    pub const ALL: [PageType; 2] = [PageType::Basic, PageType::BasicHost];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PageType::Basic => "basic",
            PageType::BasicHost => "basic_host",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown page type '{s}'"))
    }
}

/// The payload of a page, shared by published rows and drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageData {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub path: String,
    pub content: String,
    pub content_type: String,
}

impl PageData {
    pub fn new(
        page_type: PageType,
        path: impl Into<String>,
        content: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            page_type,
            path: path.into(),
            content: content.into(),
            content_type: content_type.into(),
        }
    }

    /// Size of the body in bytes, the unit every page quota is expressed in.
    #[must_use]
    pub fn content_size(&self) -> i64 {
        i64::try_from(self.content.len()).unwrap_or(i64::MAX)
    }
}

pub type Page = Record<PageData>;
pub type PageDraft = Draft<PageData>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_size_counts_bytes() {
        let page = PageData::new(PageType::Basic, "/p", "héllo", "text/plain");
        assert_eq!(page.content_size(), 6);
    }
}
