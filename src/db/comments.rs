//! Task comments.

use super::{now_ms, Database};
use crate::types::{Comment, NewComment};
use anyhow::Result;
use rusqlite::{params, Row};

fn parse_comment_row(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        author_id: row.get("author_id")?,
        content: row.get("content")?,
        confidence: row.get("confidence")?,
        autonomy_level: row.get("autonomy_level")?,
        created_at: row.get("created_at")?,
    })
}

/// Add a comment to a task.
pub fn create_comment(db: &Database, task_id: i64, input: &NewComment) -> Result<Comment> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO task_comments (task_id, author_id, content, confidence,
                 autonomy_level, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                task_id,
                input.author_id,
                input.content,
                input.confidence,
                input.autonomy_level,
                now_ms(),
            ],
        )?;
        let comment = conn.query_row(
            "SELECT * FROM task_comments WHERE id = ?1",
            params![conn.last_insert_rowid()],
            parse_comment_row,
        )?;
        Ok(comment)
    })
}

/// List comments on a task, oldest first.
pub fn list_comments(db: &Database, task_id: i64) -> Result<Vec<Comment>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM task_comments WHERE task_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![task_id], parse_comment_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    })
}
