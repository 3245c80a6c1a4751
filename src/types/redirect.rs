use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Draft, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectType {
    Basic,
    BasicHost,
    Regex,
    RegexHost,
}

impl RedirectType {
    pub const ALL: [RedirectType; 4] = [
        RedirectType::Basic,
        RedirectType::BasicHost,
        RedirectType::Regex,
        RedirectType::RegexHost,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RedirectType::Basic => "basic",
            RedirectType::BasicHost => "basic_host",
            RedirectType::Regex => "regex",
            RedirectType::RegexHost => "regex_host",
        }
    }

    #[must_use]
    pub const fn is_regex(self) -> bool {
        matches!(self, RedirectType::Regex | RedirectType::RegexHost)
    }
}

impl fmt::Display for RedirectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedirectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RedirectType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown redirect type '{s}'"))
    }
}

/// HTTP status used by a redirect. Serialized as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum RedirectStatus {
    MovedPermanent,
    Found,
    TemporaryRedirect,
    PermanentRedirect,
}

impl RedirectStatus {
    pub const ALL: [RedirectStatus; 4] = [
        RedirectStatus::MovedPermanent,
        RedirectStatus::Found,
        RedirectStatus::TemporaryRedirect,
        RedirectStatus::PermanentRedirect,
    ];

    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            RedirectStatus::MovedPermanent => 301,
            RedirectStatus::Found => 302,
            RedirectStatus::TemporaryRedirect => 307,
            RedirectStatus::PermanentRedirect => 308,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            RedirectStatus::MovedPermanent => "MOVED_PERMANENT",
            RedirectStatus::Found => "FOUND",
            RedirectStatus::TemporaryRedirect => "TEMPORARY_REDIRECT",
            RedirectStatus::PermanentRedirect => "PERMANENT_REDIRECT",
        }
    }

    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        RedirectStatus::ALL.into_iter().find(|s| s.code() == code)
    }
}

impl From<RedirectStatus> for u16 {
    fn from(status: RedirectStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u16> for RedirectStatus {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        RedirectStatus::from_code(code).ok_or_else(|| format!("unsupported redirect status {code}"))
    }
}

/// The payload of a redirect, shared by published rows and drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectData {
    #[serde(rename = "type")]
    pub redirect_type: RedirectType,
    pub source: String,
    pub target: String,
    pub status: RedirectStatus,
}

impl RedirectData {
    pub fn new(
        redirect_type: RedirectType,
        source: impl Into<String>,
        target: impl Into<String>,
        status: RedirectStatus,
    ) -> Self {
        Self {
            redirect_type,
            source: source.into(),
            target: target.into(),
            status,
        }
    }
}

/// Import comparator: both present and equal on every field.
/// Two absent payloads compare equal; absent never equals present.
#[must_use]
pub fn redirects_equal(a: Option<&RedirectData>, b: Option<&RedirectData>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        (None, None) => true,
        _ => false,
    }
}

pub type Redirect = Record<RedirectData>;
pub type RedirectDraft = Draft<RedirectData>;
