//! Composable SELECT builder, sorting whitelist and pagination.
//!
//! Queries are plain values: the permission engine rewrites them by adding
//! conditions, and the repositories render them to SQL with positional
//! parameters right before execution.

use rusqlite::types::Value;
use rusqlite::{Connection, Row, params_from_iter};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 1000;

/// Values that can be bound as query parameters.
pub trait IntoSqlValue {
    fn into_sql_value(self) -> Value;
}

impl IntoSqlValue for &str {
    fn into_sql_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoSqlValue for &String {
    fn into_sql_value(self) -> Value {
        Value::Text(self.clone())
    }
}

impl IntoSqlValue for String {
    fn into_sql_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoSqlValue for i64 {
    fn into_sql_value(self) -> Value {
        Value::Integer(self)
    }
}

impl IntoSqlValue for i32 {
    fn into_sql_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoSqlValue for bool {
    fn into_sql_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    In(String, Vec<Value>),
    /// Case-insensitive substring match.
    Contains(String, String),
    All(Vec<Condition>),
    AnyOf(Vec<Condition>),
    /// Matches no row.
    Never,
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: impl IntoSqlValue) -> Self {
        Condition::Eq(column.into(), value.into_sql_value())
    }

    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoSqlValue,
    {
        Condition::In(
            column.into(),
            values.into_iter().map(IntoSqlValue::into_sql_value).collect(),
        )
    }

    pub fn contains(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Condition::Contains(column.into(), needle.into())
    }

    fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Condition::Eq(column, value) => {
                sql.push_str(column);
                sql.push_str(" = ?");
                params.push(value.clone());
            }
            Condition::In(_, values) if values.is_empty() => sql.push_str("1 = 0"),
            Condition::In(column, values) => {
                sql.push_str(column);
                sql.push_str(" IN (");
                sql.push_str(&vec!["?"; values.len()].join(", "));
                sql.push(')');
                params.extend(values.iter().cloned());
            }
            Condition::Contains(column, needle) => {
                sql.push_str("LOWER(");
                sql.push_str(column);
                sql.push_str(") LIKE ? ESCAPE '\\'");
                params.push(Value::Text(format!("%{}%", escape_like(&needle.to_lowercase()))));
            }
            Condition::All(parts) if parts.is_empty() => sql.push_str("1 = 1"),
            Condition::AnyOf(parts) if parts.is_empty() => sql.push_str("1 = 0"),
            Condition::All(parts) => render_joined(parts, " AND ", sql, params),
            Condition::AnyOf(parts) => render_joined(parts, " OR ", sql, params),
            Condition::Never => sql.push_str("1 = 0"),
        }
    }
}

fn render_joined(parts: &[Condition], sep: &str, sql: &mut String, params: &mut Vec<Value>) {
    sql.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push_str(sep);
        }
        part.render(sql, params);
    }
    sql.push(')');
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// Unknown directions sort ascending.
    #[must_use]
    pub fn parse_or_asc(s: &str) -> Direction {
        if s.eq_ignore_ascii_case("desc") {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }

    const fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// A requested sort entry, keyed by its external (API) name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SortParam {
    pub column: String,
    #[serde(default)]
    pub direction: String,
}

impl SortParam {
    pub fn new(column: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: direction.into(),
        }
    }

    /// Parses `name:desc,code` style query strings.
    #[must_use]
    pub fn parse_list(raw: &str) -> Vec<SortParam> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|entry| match entry.split_once(':') {
                Some((column, direction)) => SortParam::new(column.trim(), direction.trim()),
                None => SortParam::new(entry, ""),
            })
            .collect()
    }
}

/// Limit/offset window; out-of-range values fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    #[must_use]
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        };
        let offset = match offset {
            Some(o) if o > 0 => o,
            _ => 0,
        };
        Self { limit, offset }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    table: String,
    columns: String,
    conditions: Vec<Condition>,
    order_by: Vec<(String, Direction)>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Select {
    #[must_use]
    pub fn from(table: impl Into<String>, columns: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: columns.into(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push((column.into(), direction));
        self
    }

    #[must_use]
    pub fn paginate(mut self, page: Pagination) -> Self {
        self.limit = Some(page.limit);
        self.offset = Some(page.offset);
        self
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    #[must_use]
    pub fn has_order(&self) -> bool {
        !self.order_by.is_empty()
    }

    fn render_where(&self, sql: &mut String, params: &mut Vec<Value>) {
        if self.conditions.is_empty() {
            return;
        }
        sql.push_str(" WHERE ");
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            condition.render(sql, params);
        }
    }

    #[must_use]
    pub fn build(&self) -> (String, Vec<Value>) {
        let mut sql = format!("SELECT {} FROM {}", self.columns, self.table);
        let mut params = Vec::new();
        self.render_where(&mut sql, &mut params);
        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, dir)| format!("{column} {}", dir.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(limit));
            sql.push_str(" OFFSET ?");
            params.push(Value::Integer(self.offset.unwrap_or(0)));
        }
        (sql, params)
    }

    #[must_use]
    pub fn build_count(&self) -> (String, Vec<Value>) {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let mut params = Vec::new();
        self.render_where(&mut sql, &mut params);
        (sql, params)
    }
}

/// Applies whitelisted sort keys.
///
/// Keys missing from `whitelist` are skipped; `prefix` qualifies the physical
/// column when the query joins several tables.
#[must_use]
pub fn apply_sort(
    mut query: Select,
    whitelist: &[(&str, &str)],
    sorts: &[SortParam],
    prefix: Option<&str>,
) -> Select {
    for sort in sorts {
        let Some((_, column)) = whitelist.iter().find(|(key, _)| *key == sort.column) else {
            continue;
        };
        let column = match prefix {
            Some(prefix) => format!("{prefix}.{column}"),
            None => (*column).to_string(),
        };
        query = query.order_by(column, Direction::parse_or_asc(&sort.direction));
    }
    query
}

pub fn fetch_all<T, F>(conn: &Connection, query: &Select, map: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let (sql, params) = query.build();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), map)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Runs `query` for one page and counts the full result set.
pub fn search_paginate<T, F>(
    conn: &Connection,
    query: Select,
    page: Pagination,
    map: F,
) -> Result<Paginated<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let (count_sql, count_params) = query.build_count();
    let total: i64 = conn.query_row(&count_sql, params_from_iter(count_params.iter()), |row| {
        row.get(0)
    })?;
    let items = fetch_all(conn, &query.paginate(page), map)?;
    Ok(Paginated {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITELIST: &[(&str, &str)] = &[("name", "name"), ("createdAt", "created_at")];

    #[test]
    fn test_build_without_conditions() {
        let (sql, params) = Select::from("namespaces", "code, name").build();
        assert_eq!(sql, "SELECT code, name FROM namespaces");
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_with_conditions_and_pagination() {
        let q = Select::from("projects", "code")
            .filter(Condition::eq("namespace_code", "ns"))
            .filter(Condition::is_in("code", ["a", "b"]))
            .order_by("code", Direction::Asc)
            .paginate(Pagination::new(Some(10), Some(5)));
        let (sql, params) = q.build();
        assert_eq!(
            sql,
            "SELECT code FROM projects WHERE namespace_code = ? AND code IN (?, ?) ORDER BY code ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(params.len(), 5);
        assert_eq!(params[3], Value::Integer(10));
    }

    #[test]
    fn test_empty_in_and_any_of_match_nothing() {
        let (sql, _) = Select::from("t", "*")
            .filter(Condition::is_in("a", Vec::<String>::new()))
            .build();
        assert!(sql.ends_with("WHERE 1 = 0"));

        let (sql, _) = Select::from("t", "*").filter(Condition::AnyOf(vec![])).build();
        assert!(sql.ends_with("WHERE 1 = 0"));
    }

    #[test]
    fn test_nested_any_of() {
        let cond = Condition::AnyOf(vec![
            Condition::is_in("ns", ["a"]),
            Condition::All(vec![Condition::eq("ns", "b"), Condition::is_in("p", ["x", "y"])]),
        ]);
        let (sql, params) = Select::from("t", "*").filter(cond).build_count();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM t WHERE (ns IN (?) OR (ns = ? AND p IN (?, ?)))"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_apply_sort_skips_unknown_and_defaults_direction() {
        let sorts = vec![
            SortParam::new("name", "DESC"),
            SortParam::new("password", "asc"),
            SortParam::new("createdAt", "sideways"),
        ];
        let (sql, _) = apply_sort(Select::from("users", "*"), WHITELIST, &sorts, None).build();
        assert_eq!(sql, "SELECT * FROM users ORDER BY name DESC, created_at ASC");
    }

    #[test]
    fn test_apply_sort_with_prefix() {
        let sorts = vec![SortParam::new("name", "asc")];
        let (sql, _) = apply_sort(Select::from("users u", "*"), WHITELIST, &sorts, Some("u")).build();
        assert!(sql.ends_with("ORDER BY u.name ASC"));
    }

    #[test]
    fn test_parse_sort_list() {
        let sorts = SortParam::parse_list("name:desc, code ,");
        assert_eq!(sorts, vec![SortParam::new("name", "desc"), SortParam::new("code", "")]);
    }

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(Pagination::default(), Pagination { limit: 20, offset: 0 });
        assert_eq!(Pagination::new(Some(-1), Some(-5)), Pagination { limit: 20, offset: 0 });
        assert_eq!(Pagination::new(Some(5000), None).limit, MAX_LIMIT);
    }

    #[test]
    fn test_contains_escapes_wildcards() {
        let (_, params) = Select::from("t", "*")
            .filter(Condition::contains("name", "50%_Off"))
            .build();
        assert_eq!(params[0], Value::Text("%50\\%\\_off%".to_string()));
    }
}
