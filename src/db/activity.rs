//! Append-only activity log.

use super::{now_ms, Database};
use crate::types::{ActivityEntry, ActivityFilter, NewActivity};
use anyhow::Result;
use rusqlite::{params, Connection, Row};

fn parse_activity_row(row: &Row) -> rusqlite::Result<ActivityEntry> {
    Ok(ActivityEntry {
        id: row.get("id")?,
        org_id: row.get("org_id")?,
        actor_id: row.get("actor_id")?,
        action: row.get("action")?,
        entity_type: row.get("entity_type")?,
        entity_id: row.get("entity_id")?,
        description: row.get("description")?,
        autonomy_level: row.get("autonomy_level")?,
        created_at: row.get("created_at")?,
    })
}

/// Insert an entry using an existing connection, so callers can log inside
/// their own transaction.
pub(crate) fn insert_activity(conn: &Connection, entry: &NewActivity) -> Result<i64> {
    conn.execute(
        "INSERT INTO activity_log (org_id, actor_id, action, entity_type, entity_id,
             description, autonomy_level, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.org_id,
            entry.actor_id,
            entry.action,
            entry.entity_type,
            entry.entity_id,
            entry.description,
            entry.autonomy_level,
            now_ms(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Record a standalone activity entry.
pub fn record_activity(db: &Database, entry: &NewActivity) -> Result<i64> {
    db.with_conn(|conn| insert_activity(conn, entry))
}

/// List recent activity for an organization, newest first, optionally
/// narrowed to an entity or action.
pub fn list_activity(
    db: &Database,
    org_id: i64,
    filter: &ActivityFilter,
    limit: i64,
) -> Result<Vec<ActivityEntry>> {
    db.with_conn(|conn| {
        let mut sql = String::from("SELECT * FROM activity_log WHERE org_id = ?1");
        let mut values: Vec<rusqlite::types::Value> = vec![org_id.into()];

        if let Some(entity_type) = &filter.entity_type {
            values.push(entity_type.clone().into());
            sql.push_str(&format!(" AND entity_type = ?{}", values.len()));
        }
        if let Some(entity_id) = filter.entity_id {
            values.push(entity_id.into());
            sql.push_str(&format!(" AND entity_id = ?{}", values.len()));
        }
        if let Some(action) = &filter.action {
            values.push(action.clone().into());
            sql.push_str(&format!(" AND action = ?{}", values.len()));
        }
        values.push(limit.into());
        sql.push_str(&format!(
            " ORDER BY created_at DESC, id DESC LIMIT ?{}",
            values.len()
        ));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values), parse_activity_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    })
}
