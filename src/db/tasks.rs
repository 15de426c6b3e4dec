//! Task CRUD and the conditional status write used by the lifecycle engine.

use super::activity::insert_activity;
use super::lessons::insert_lesson;
use super::{now_ms, Database};
use crate::types::{
    NewActivity, NewLesson, NewTask, Priority, Task, TaskFilter, TaskPatch, TaskStatus,
};
use anyhow::Result;
use rusqlite::{params, Connection, Row};

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let status_raw: String = row.get("status")?;
    let status = TaskStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown task status: {}", status_raw).into(),
        )
    })?;
    let priority_raw: String = row.get("priority")?;

    Ok(Task {
        id: row.get("id")?,
        org_id: row.get("org_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        priority: Priority::parse(&priority_raw),
        engine_id: row.get("engine_id")?,
        owner_id: row.get("owner_id")?,
        reviewer_id: row.get("reviewer_id")?,
        blocker_reason: row.get("blocker_reason")?,
        blocked_since: row.get("blocked_since")?,
        estimated_hours: row.get("estimated_hours")?,
        impact: row.get("impact")?,
        output: row.get("output")?,
        learnings: row.get("learnings")?,
        evaluation_rating: row.get("evaluation_rating")?,
        sort_order: row.get("sort_order")?,
        started_at: row.get("started_at")?,
        due_at: row.get("due_at")?,
        completed_at: row.get("completed_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
fn get_task_internal(conn: &Connection, task_id: i64) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

    let result = stmt.query_row(params![task_id], parse_task_row);

    match result {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Create a task and log the creation in the same transaction.
pub fn create_task(db: &Database, org_id: i64, input: &NewTask) -> Result<Task> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let now = now_ms();
        let status = input.status.unwrap_or(TaskStatus::Inbox);
        let priority = input.priority.unwrap_or_default();

        tx.execute(
            "INSERT INTO tasks (org_id, title, description, status, priority, engine_id,
                 owner_id, reviewer_id, estimated_hours, impact, sort_order, due_at,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                org_id,
                input.title,
                input.description,
                status.as_str(),
                priority.as_str(),
                input.engine_id,
                input.owner_id,
                input.reviewer_id,
                input.estimated_hours,
                input.impact,
                input.sort_order.unwrap_or(0),
                input.due_at,
                now,
            ],
        )?;
        let task_id = tx.last_insert_rowid();

        insert_activity(
            &tx,
            &NewActivity {
                org_id,
                actor_id: input.owner_id,
                action: "task_created".to_string(),
                entity_type: "task".to_string(),
                entity_id: task_id,
                description: format!("Task created: {}", input.title),
                autonomy_level: None,
            },
        )?;

        let task = get_task_internal(&tx, task_id)?
            .ok_or_else(|| anyhow::anyhow!("task vanished after insert"))?;
        tx.commit()?;
        Ok(task)
    })
}

/// Get a task by ID.
pub fn get_task(db: &Database, task_id: i64) -> Result<Option<Task>> {
    db.with_conn(|conn| get_task_internal(conn, task_id))
}

/// List tasks for an organization, optionally filtered.
pub fn list_tasks(db: &Database, org_id: i64, filter: &TaskFilter) -> Result<Vec<Task>> {
    db.with_conn(|conn| {
        let mut sql = String::from("SELECT * FROM tasks WHERE org_id = ?1");
        let mut values: Vec<rusqlite::types::Value> = vec![org_id.into()];

        if let Some(status) = filter.status {
            values.push(status.as_str().to_string().into());
            sql.push_str(&format!(" AND status = ?{}", values.len()));
        }
        if let Some(engine_id) = filter.engine_id {
            values.push(engine_id.into());
            sql.push_str(&format!(" AND engine_id = ?{}", values.len()));
        }
        if let Some(owner_id) = filter.owner_id {
            values.push(owner_id.into());
            sql.push_str(&format!(" AND owner_id = ?{}", values.len()));
        }
        if let Some(priority) = filter.priority {
            values.push(priority.as_str().to_string().into());
            sql.push_str(&format!(" AND priority = ?{}", values.len()));
        }
        sql.push_str(" ORDER BY sort_order ASC, created_at DESC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values), parse_task_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    })
}

/// Apply a field-level patch. Status and its side-effect timestamps are
/// not reachable from here; those writes go through [`apply_transition`].
pub fn update_task(db: &Database, task_id: i64, patch: &TaskPatch) -> Result<Option<Task>> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let Some(task) = get_task_internal(&tx, task_id)? else {
            return Ok(None);
        };

        let title = patch.title.clone().unwrap_or(task.title);
        let description = patch.description.clone().or(task.description);
        let priority = patch.priority.unwrap_or(task.priority);
        let engine_id = patch.engine_id.unwrap_or(task.engine_id);
        let owner_id = patch.owner_id.unwrap_or(task.owner_id);
        let reviewer_id = patch.reviewer_id.unwrap_or(task.reviewer_id);
        let estimated_hours = patch.estimated_hours.unwrap_or(task.estimated_hours);
        let impact = patch.impact.clone().or(task.impact);
        let output = patch.output.clone().or(task.output);
        let learnings = patch.learnings.clone().or(task.learnings);
        let sort_order = patch.sort_order.unwrap_or(task.sort_order);
        let due_at = patch.due_at.unwrap_or(task.due_at);

        tx.execute(
            "UPDATE tasks SET title = ?2, description = ?3, priority = ?4, engine_id = ?5,
                 owner_id = ?6, reviewer_id = ?7, estimated_hours = ?8, impact = ?9,
                 output = ?10, learnings = ?11, sort_order = ?12, due_at = ?13,
                 updated_at = ?14
             WHERE id = ?1",
            params![
                task_id,
                title,
                description,
                priority.as_str(),
                engine_id,
                owner_id,
                reviewer_id,
                estimated_hours,
                impact,
                output,
                learnings,
                sort_order,
                due_at,
                now_ms(),
            ],
        )?;

        let task = get_task_internal(&tx, task_id)?;
        tx.commit()?;
        Ok(task)
    })
}

/// Delete a task. Returns false if it did not exist.
pub fn delete_task(db: &Database, task_id: i64) -> Result<bool> {
    db.with_conn(|conn| {
        let rows = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
        Ok(rows > 0)
    })
}

/// A status write computed by the lifecycle engine from a task snapshot.
/// All lifecycle fields carry their final values; the write only lands if
/// the stored status still matches `expected_status`.
#[derive(Debug, Clone)]
pub struct TransitionWrite {
    pub expected_status: TaskStatus,
    pub new_status: TaskStatus,
    /// Set by claim; None leaves the owner untouched.
    pub set_owner_id: Option<i64>,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub blocker_reason: Option<String>,
    pub blocked_since: Option<i64>,
    /// Evaluation fields; None leaves the stored value untouched.
    pub impact: Option<String>,
    pub learnings: Option<String>,
    pub evaluation_rating: Option<i32>,
    pub activity: NewActivity,
    pub lesson: Option<NewLesson>,
}

/// Outcome of a conditional status write.
#[derive(Debug)]
pub enum TransitionOutcome {
    Applied(Task),
    /// The task exists but its status no longer matches the snapshot.
    Conflict,
    Missing,
}

/// Apply a status transition with compare-and-swap semantics. The UPDATE
/// is conditioned on the status the engine read; zero rows affected while
/// the task still exists means a concurrent writer won.
pub fn apply_transition(
    db: &Database,
    task_id: i64,
    write: &TransitionWrite,
) -> Result<TransitionOutcome> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let rows = tx.execute(
            "UPDATE tasks SET status = ?2,
                 owner_id = COALESCE(?3, owner_id),
                 started_at = ?4, completed_at = ?5,
                 blocker_reason = ?6, blocked_since = ?7,
                 impact = COALESCE(?8, impact),
                 learnings = COALESCE(?9, learnings),
                 evaluation_rating = COALESCE(?10, evaluation_rating),
                 updated_at = ?11
             WHERE id = ?1 AND status = ?12",
            params![
                task_id,
                write.new_status.as_str(),
                write.set_owner_id,
                write.started_at,
                write.completed_at,
                write.blocker_reason,
                write.blocked_since,
                write.impact,
                write.learnings,
                write.evaluation_rating,
                now_ms(),
                write.expected_status.as_str(),
            ],
        )?;

        if rows == 0 {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1)",
                params![task_id],
                |row| row.get(0),
            )?;
            tx.commit()?;
            return Ok(if exists {
                TransitionOutcome::Conflict
            } else {
                TransitionOutcome::Missing
            });
        }

        insert_activity(&tx, &write.activity)?;
        if let Some(lesson) = &write.lesson {
            insert_lesson(&tx, write.activity.org_id, lesson)?;
        }

        let task = get_task_internal(&tx, task_id)?
            .ok_or_else(|| anyhow::anyhow!("task vanished during transition"))?;
        tx.commit()?;
        Ok(TransitionOutcome::Applied(task))
    })
}
