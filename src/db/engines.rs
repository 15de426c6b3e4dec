//! Value engine CRUD.

use super::Database;
use crate::types::{Engine, NewEngine};
use anyhow::Result;
use rusqlite::{params, Row};

fn parse_engine_row(row: &Row) -> rusqlite::Result<Engine> {
    Ok(Engine {
        id: row.get("id")?,
        org_id: row.get("org_id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        goal: row.get("goal")?,
        emoji: row.get("emoji")?,
        color: row.get("color")?,
        status: row.get("status")?,
    })
}

/// Create an engine.
pub fn create_engine(db: &Database, org_id: i64, input: &NewEngine) -> Result<Engine> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO engines (org_id, name, slug, description, goal, emoji, color)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                org_id,
                input.name,
                input.slug,
                input.description,
                input.goal,
                input.emoji,
                input.color,
            ],
        )?;
        let engine = conn.query_row(
            "SELECT * FROM engines WHERE id = ?1",
            params![conn.last_insert_rowid()],
            parse_engine_row,
        )?;
        Ok(engine)
    })
}

/// Get an engine by ID.
pub fn get_engine(db: &Database, engine_id: i64) -> Result<Option<Engine>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM engines WHERE id = ?1")?;
        let result = stmt.query_row(params![engine_id], parse_engine_row);
        match result {
            Ok(engine) => Ok(Some(engine)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    })
}

/// List engines for an organization.
pub fn list_engines(db: &Database, org_id: i64) -> Result<Vec<Engine>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM engines WHERE org_id = ?1 ORDER BY id ASC")?;
        let rows = stmt.query_map(params![org_id], parse_engine_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    })
}
