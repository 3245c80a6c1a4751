use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::query::{self, Paginated, Pagination, Select};
use super::{format_datetime, parse_column, parse_datetime};
use crate::error::{Error, Result};
use crate::types::{Agent, AgentStatus, AgentType};

pub const TABLE: &str = "agents";
const COLUMNS: &str = "id, namespace_code, project_code, name, type, status, version, error, \
                       load_duration_ms, last_hit_at, created_at, updated_at";

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("name", "name"),
    ("type", "type"),
    ("status", "status"),
    ("version", "version"),
    ("lastHitAt", "last_hit_at"),
    ("createdAt", "created_at"),
];

/// State reported by an agent on each poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReport {
    pub name: String,
    pub agent_type: AgentType,
    pub status: AgentStatus,
    pub version: i64,
    pub error: String,
    pub load_duration_ms: i64,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        namespace_code: row.get(1)?,
        project_code: row.get(2)?,
        name: row.get(3)?,
        agent_type: parse_column(row, 4)?,
        status: parse_column(row, 5)?,
        version: row.get(6)?,
        error: row.get(7)?,
        load_duration_ms: row.get(8)?,
        last_hit_at: parse_datetime(&row.get::<_, String>(9)?),
        created_at: parse_datetime(&row.get::<_, String>(10)?),
        updated_at: parse_datetime(&row.get::<_, String>(11)?),
    })
}

#[must_use]
pub fn select() -> Select {
    Select::from(TABLE, COLUMNS)
}

pub fn get(conn: &Connection, namespace: &str, project: &str, id: i64) -> Result<Option<Agent>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM agents WHERE id = ?1 AND namespace_code = ?2 AND project_code = ?3"),
        params![id, namespace, project],
        map_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn get_by_name(conn: &Connection, namespace: &str, project: &str, name: &str) -> Result<Option<Agent>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM agents WHERE namespace_code = ?1 AND project_code = ?2 AND name = ?3"),
        params![namespace, project, name],
        map_row,
    )
    .optional()
    .map_err(Error::from)
}

/// Inserts or refreshes the agent identified by `(namespace, project, name)`.
pub fn upsert(
    conn: &Connection,
    namespace: &str,
    project: &str,
    report: &AgentReport,
    at: DateTime<Utc>,
) -> Result<Agent> {
    let ts = format_datetime(&at);
    conn.execute(
        "INSERT INTO agents (namespace_code, project_code, name, type, status, version, error,
                             load_duration_ms, last_hit_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?9)
         ON CONFLICT(namespace_code, project_code, name) DO UPDATE SET
             type = excluded.type,
             status = excluded.status,
             version = excluded.version,
             error = excluded.error,
             load_duration_ms = excluded.load_duration_ms,
             last_hit_at = excluded.last_hit_at,
             updated_at = excluded.updated_at",
        params![
            namespace,
            project,
            report.name,
            report.agent_type.as_str(),
            report.status.as_str(),
            report.version,
            report.error,
            report.load_duration_ms,
            ts,
        ],
    )?;
    get_by_name(conn, namespace, project, &report.name)?.ok_or(Error::NotFound("agent"))
}

/// Refreshes liveness only.
pub fn update_last_hit(
    conn: &Connection,
    namespace: &str,
    project: &str,
    name: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    let rows = conn.execute(
        "UPDATE agents SET last_hit_at = ?1 WHERE namespace_code = ?2 AND project_code = ?3 AND name = ?4",
        params![format_datetime(&at), namespace, project, name],
    )?;
    if rows == 0 {
        return Err(Error::NotFound("agent"));
    }
    Ok(())
}

pub fn delete(conn: &Connection, namespace: &str, project: &str, id: i64) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM agents WHERE id = ?1 AND namespace_code = ?2 AND project_code = ?3",
        params![id, namespace, project],
    )?;
    Ok(rows > 0)
}

pub fn search(conn: &Connection, query: Select, page: Pagination) -> Result<Paginated<Agent>> {
    let query = if query.has_order() {
        query
    } else {
        query.order_by("name", query::Direction::Asc)
    };
    query::search_paginate(conn, query, page, map_row)
}

/// Agents seen after `since`, and how many of them report an error.
pub fn count_online(
    conn: &Connection,
    namespace: &str,
    project: &str,
    since: DateTime<Utc>,
) -> Result<(i64, i64)> {
    Ok(conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = ?4 THEN 1 ELSE 0 END), 0)
         FROM agents WHERE namespace_code = ?1 AND project_code = ?2 AND last_hit_at > ?3",
        params![namespace, project, format_datetime(&since), AgentStatus::Error.as_str()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?)
}
