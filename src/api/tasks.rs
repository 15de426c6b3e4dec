//! Task endpoints: CRUD plus the lifecycle operations.

use super::AppState;
use crate::db::{comments, engines, tasks};
use crate::error::{ApiError, ApiResult};
use crate::lifecycle::{self, Evaluation, TransitionRequest};
use crate::types::{Comment, NewComment, NewTask, Task, TaskFilter, TaskPatch, TaskStatus};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = tasks::list_tasks(&state.db, state.org_id, &filter)?;
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(input): Json<NewTask>,
) -> ApiResult<Json<Task>> {
    if input.title.trim().is_empty() {
        return Err(ApiError::missing_field("title"));
    }
    if let Some(status) = input.status {
        if !lifecycle::valid_initial(status) {
            return Err(ApiError::invalid_value(
                "status",
                "new tasks must start in inbox or backlog",
            ));
        }
    }
    if let Some(engine_id) = input.engine_id {
        if engines::get_engine(&state.db, engine_id)?.is_none() {
            return Err(ApiError::invalid_value("engine_id", "unknown engine"));
        }
    }
    let task = tasks::create_task(&state.db, state.org_id, &input)?;
    Ok(Json(task))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Task>> {
    let task = tasks::get_task(&state.db, task_id)?
        .ok_or_else(|| ApiError::not_found("Task", task_id))?;
    Ok(Json(task))
}

/// Generic field patch. Status is rejected here; lifecycle moves go
/// through the status, claim, and evaluate endpoints.
pub async fn patch_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<Task>> {
    if body.get("status").is_some() {
        return Err(ApiError::invalid_value(
            "status",
            "status cannot be set directly, use the status endpoint",
        ));
    }
    let patch: TaskPatch = serde_json::from_value(body)
        .map_err(|e| ApiError::invalid_value("body", &e.to_string()))?;
    let task = tasks::update_task(&state.db, task_id, &patch)?
        .ok_or_else(|| ApiError::not_found("Task", task_id))?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    if !tasks::delete_task(&state.db, task_id)? {
        return Err(ApiError::not_found("Task", task_id));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: TaskStatus,
    pub actor_id: Option<i64>,
    pub blocker_reason: Option<String>,
}

pub async fn change_status(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(body): Json<StatusChangeRequest>,
) -> ApiResult<Json<Task>> {
    let req = TransitionRequest {
        actor_id: body.actor_id,
        blocker_reason: body.blocker_reason,
    };
    let task = state.engine.transition(task_id, body.status, &req)?;
    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub agent_id: Option<i64>,
}

pub async fn claim_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(body): Json<ClaimRequest>,
) -> ApiResult<Json<Task>> {
    let agent_id = body.agent_id.ok_or_else(|| ApiError::missing_field("agent_id"))?;
    let task = state.engine.claim(task_id, agent_id)?;
    Ok(Json(task))
}

fn default_approve() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default = "default_approve")]
    pub approve: bool,
    pub evaluator_id: Option<i64>,
    pub impact: Option<String>,
    pub learnings: Option<String>,
    pub rating: Option<i32>,
    pub lesson_title: Option<String>,
    pub lesson_insight: Option<String>,
    pub lesson_context: Option<String>,
    pub lesson_action: Option<String>,
}

pub async fn evaluate_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(body): Json<EvaluateRequest>,
) -> ApiResult<Json<Task>> {
    let eval = Evaluation {
        approve: body.approve,
        evaluator_id: body.evaluator_id,
        impact: body.impact,
        learnings: body.learnings,
        rating: body.rating,
        lesson_title: body.lesson_title,
        lesson_insight: body.lesson_insight,
        lesson_context: body.lesson_context,
        lesson_action: body.lesson_action,
    };
    let task = state.engine.evaluate(task_id, &eval)?;
    Ok(Json(task))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<Comment>>> {
    if tasks::get_task(&state.db, task_id)?.is_none() {
        return Err(ApiError::not_found("Task", task_id));
    }
    let comments = comments::list_comments(&state.db, task_id)?;
    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(input): Json<NewComment>,
) -> ApiResult<Json<Comment>> {
    if input.content.trim().is_empty() {
        return Err(ApiError::missing_field("content"));
    }
    if tasks::get_task(&state.db, task_id)?.is_none() {
        return Err(ApiError::not_found("Task", task_id));
    }
    let comment = comments::create_comment(&state.db, task_id, &input)?;
    Ok(Json(comment))
}
