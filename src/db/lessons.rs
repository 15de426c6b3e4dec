//! Lessons learned storage.

use super::{now_ms, Database};
use crate::types::{Lesson, NewLesson};
use anyhow::Result;
use rusqlite::{params, Connection, Row};

fn parse_lesson_row(row: &Row) -> rusqlite::Result<Lesson> {
    Ok(Lesson {
        id: row.get("id")?,
        org_id: row.get("org_id")?,
        title: row.get("title")?,
        insight: row.get("insight")?,
        context: row.get("context")?,
        action: row.get("action")?,
        source_task_id: row.get("source_task_id")?,
        created_by_id: row.get("created_by_id")?,
        created_at: row.get("created_at")?,
    })
}

/// Insert a lesson using an existing connection. Evaluation uses this to
/// record a lesson in the same transaction as the status write.
pub(crate) fn insert_lesson(conn: &Connection, org_id: i64, input: &NewLesson) -> Result<i64> {
    conn.execute(
        "INSERT INTO lessons_learned (org_id, title, insight, context, action,
             source_task_id, created_by_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            org_id,
            input.title,
            input.insight,
            input.context,
            input.action,
            input.source_task_id,
            input.created_by_id,
            now_ms(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Record a standalone lesson.
pub fn create_lesson(db: &Database, org_id: i64, input: &NewLesson) -> Result<Lesson> {
    db.with_conn(|conn| {
        let id = insert_lesson(conn, org_id, input)?;
        let lesson = conn.query_row(
            "SELECT * FROM lessons_learned WHERE id = ?1",
            params![id],
            parse_lesson_row,
        )?;
        Ok(lesson)
    })
}

/// List lessons for an organization, newest first.
pub fn list_lessons(db: &Database, org_id: i64) -> Result<Vec<Lesson>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM lessons_learned WHERE org_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![org_id], parse_lesson_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    })
}
