//! Declarative field validation.
//!
//! Validation never fails fast: every broken rule is collected into a
//! [`ValidationReport`] so callers can show all problems at once.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::types::{PageData, PageType, RedirectData, RedirectType};

static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").unwrap_or_else(|e| panic!("invalid code regex: {e}"))
});

const MAX_SOURCE_LEN: usize = 2048;
const MAX_TARGET_LEN: usize = 2048;
const MAX_PATH_LEN: usize = 2048;
const MAX_CONTENT_TYPE_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub rule: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<FieldViolation>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn push(&mut self, field: &str, rule: &str, value: &str) {
        self.violations.push(FieldViolation {
            field: field.to_string(),
            rule: rule.to_string(),
            value: value.to_string(),
        });
    }

    #[must_use]
    pub fn has(&self, field: &str, rule: &str) -> bool {
        self.violations
            .iter()
            .any(|v| v.field == field && v.rule == rule)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("field '{}' failed rule '{}'", v.field, v.rule))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// A single field rule.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Non-empty after trimming.
    Required,
    /// At most `n` characters.
    Max(usize),
    /// `^[A-Za-z0-9_-]+$`; empty values are left to `Required`.
    Code,
    Regex(&'static str, &'static LazyLock<Regex>),
    OneOf(&'static [&'static str]),
}

impl Rule {
    fn name(&self) -> String {
        match self {
            Rule::Required => "required".to_string(),
            Rule::Max(n) => format!("max={n}"),
            Rule::Code => "code".to_string(),
            Rule::Regex(name, _) => (*name).to_string(),
            Rule::OneOf(_) => "oneof".to_string(),
        }
    }

    fn check(&self, value: &str) -> bool {
        match self {
            Rule::Required => !value.trim().is_empty(),
            Rule::Max(n) => value.chars().count() <= *n,
            Rule::Code => value.is_empty() || CODE_RE.is_match(value),
            Rule::Regex(_, re) => value.is_empty() || re.is_match(value),
            Rule::OneOf(allowed) => allowed.contains(&value),
        }
    }
}

/// Collects violations for one struct.
#[derive(Debug, Default)]
pub struct Validator {
    report: ValidationReport,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `rules` in order; the first failing rule is recorded for the field.
    #[must_use]
    pub fn field(mut self, name: &str, value: &str, rules: &[Rule]) -> Self {
        if let Some(rule) = rules.iter().find(|rule| !rule.check(value)) {
            self.report.push(name, &rule.name(), value);
        }
        self
    }

    /// Records a custom rule outcome.
    #[must_use]
    pub fn check(mut self, name: &str, value: &str, rule: &str, ok: bool) -> Self {
        if !ok {
            self.report.push(name, rule, value);
        }
        self
    }

    pub fn finish(self) -> Result<(), ValidationReport> {
        if self.report.is_empty() {
            Ok(())
        } else {
            Err(self.report)
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationReport>;
}

/// Checks the `code` rule on its own (namespace, project and role codes).
#[must_use]
pub fn is_valid_code(value: &str) -> bool {
    CODE_RE.is_match(value)
}

/// Splits `<host>[:port]/<path>` into its host and path parts.
///
/// The path keeps its leading slash, so it is never empty.
#[must_use]
pub fn split_host_path(value: &str) -> Option<(&str, &str)> {
    let slash = value.find('/')?;
    let (host, path) = value.split_at(slash);
    if host.is_empty() {
        return None;
    }
    let url = Url::parse(&format!("http://{host}")).ok()?;
    match url.host_str() {
        Some(h) if !h.is_empty() => Some((host, path)),
        _ => None,
    }
}

impl Validate for RedirectData {
    fn validate(&self) -> Result<(), ValidationReport> {
        let v = Validator::new()
            .field("source", &self.source, &[Rule::Required, Rule::Max(MAX_SOURCE_LEN)])
            .field("target", &self.target, &[Rule::Required, Rule::Max(MAX_TARGET_LEN)]);

        if self.source.is_empty() {
            return v.finish();
        }

        let v = match self.redirect_type {
            RedirectType::Basic => v.check(
                "source",
                &self.source,
                "basic_source",
                self.source.starts_with('/'),
            ),
            RedirectType::BasicHost => v.check(
                "source",
                &self.source,
                "basic_host_source",
                split_host_path(&self.source).is_some(),
            ),
            RedirectType::Regex | RedirectType::RegexHost => v.check(
                "source",
                &self.source,
                "regex_source",
                Regex::new(&self.source).is_ok(),
            ),
        };
        v.finish()
    }
}

impl Validate for PageData {
    fn validate(&self) -> Result<(), ValidationReport> {
        let v = Validator::new()
            .field("path", &self.path, &[Rule::Required, Rule::Max(MAX_PATH_LEN)])
            .field(
                "content_type",
                &self.content_type,
                &[Rule::Required, Rule::Max(MAX_CONTENT_TYPE_LEN)],
            );

        if self.path.is_empty() {
            return v.finish();
        }

        let v = match self.page_type {
            PageType::Basic => {
                v.check("path", &self.path, "basic_path", self.path.starts_with('/'))
            }
            PageType::BasicHost => v.check(
                "path",
                &self.path,
                "basic_host_path",
                split_host_path(&self.path).is_some_and(|(h, p)| !h.is_empty() && !p.is_empty()),
            ),
        };
        v.finish()
    }
}
