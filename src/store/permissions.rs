use rusqlite::{Connection, Row, params, params_from_iter};

use super::parse_column;
use crate::error::Result;
use crate::types::{AdminPermission, ResourcePermission, Scope, SubjectPermissions};

fn scope(raw: String) -> Scope<String> {
    if raw == "*" { Scope::Any } else { Scope::Exact(raw) }
}

fn map_resource(row: &Row<'_>) -> rusqlite::Result<ResourcePermission> {
    Ok(ResourcePermission {
        namespace: scope(row.get(0)?),
        project: scope(row.get(1)?),
        resource: parse_column(row, 2)?,
        action: parse_column(row, 3)?,
    })
}

fn map_admin(row: &Row<'_>) -> rusqlite::Result<AdminPermission> {
    Ok(AdminPermission {
        section: parse_column(row, 0)?,
        action: parse_column(row, 1)?,
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Union of the permissions of `role_ids`, in insertion order and deduplicated.
pub fn for_roles(conn: &Connection, role_ids: &[i64]) -> Result<SubjectPermissions> {
    if role_ids.is_empty() {
        return Ok(SubjectPermissions::default());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT namespace, project, resource, action FROM resource_permissions
         WHERE role_id IN ({}) ORDER BY id",
        placeholders(role_ids.len())
    ))?;
    let resources = stmt
        .query_map(params_from_iter(role_ids.iter()), map_resource)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT section, action FROM admin_permissions WHERE role_id IN ({}) ORDER BY id",
        placeholders(role_ids.len())
    ))?;
    let admin = stmt
        .query_map(params_from_iter(role_ids.iter()), map_admin)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut permissions = SubjectPermissions::new(resources, admin);
    permissions.dedup();
    Ok(permissions)
}

/// Every role id linked to the user, implicit role included.
pub fn role_ids_for_user(conn: &Connection, user_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT role_id FROM user_roles WHERE user_id = ?1 ORDER BY role_id")?;
    let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn delete_for_role(conn: &Connection, role_id: i64) -> Result<()> {
    conn.execute("DELETE FROM resource_permissions WHERE role_id = ?1", params![role_id])?;
    conn.execute("DELETE FROM admin_permissions WHERE role_id = ?1", params![role_id])?;
    Ok(())
}

pub fn insert_for_role(conn: &Connection, role_id: i64, permissions: &SubjectPermissions) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO resource_permissions (role_id, namespace, project, resource, action)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for rule in &permissions.resources {
        stmt.execute(params![
            role_id,
            rule.namespace.to_string(),
            rule.project.to_string(),
            rule.resource.to_string(),
            rule.action.to_string(),
        ])?;
    }

    let mut stmt = conn.prepare_cached(
        "INSERT INTO admin_permissions (role_id, section, action) VALUES (?1, ?2, ?3)",
    )?;
    for rule in &permissions.admin {
        stmt.execute(params![role_id, rule.section.to_string(), rule.action.to_string()])?;
    }
    Ok(())
}

/// Replaces every permission of the role.
pub fn replace_for_role(conn: &Connection, role_id: i64, permissions: &SubjectPermissions) -> Result<()> {
    delete_for_role(conn, role_id)?;
    insert_for_role(conn, role_id, permissions)
}
