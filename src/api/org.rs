//! Organization endpoints: team roster, engines, activity, lessons.

use super::AppState;
use crate::db::{activity, engines, lessons, members};
use crate::error::{ApiError, ApiResult};
use crate::types::{
    ActivityEntry, ActivityFilter, Engine, Lesson, NewEngine, NewLesson, NewTeamMember, TeamMember,
    TeamMemberPatch,
};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;

pub async fn list_members(State(state): State<AppState>) -> ApiResult<Json<Vec<TeamMember>>> {
    let members = members::list_members(&state.db, state.org_id)?;
    Ok(Json(members))
}

pub async fn create_member(
    State(state): State<AppState>,
    Json(input): Json<NewTeamMember>,
) -> ApiResult<Json<TeamMember>> {
    if input.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    if input.slug.trim().is_empty() {
        return Err(ApiError::missing_field("slug"));
    }
    let member = members::create_member(&state.db, state.org_id, &input)?;
    Ok(Json(member))
}

pub async fn get_member(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
) -> ApiResult<Json<TeamMember>> {
    let member = members::get_member(&state.db, member_id)?
        .ok_or_else(|| ApiError::not_found("Team member", member_id))?;
    Ok(Json(member))
}

pub async fn patch_member(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
    Json(patch): Json<TeamMemberPatch>,
) -> ApiResult<Json<TeamMember>> {
    let member = members::update_member(&state.db, member_id, &patch)?
        .ok_or_else(|| ApiError::not_found("Team member", member_id))?;
    Ok(Json(member))
}

pub async fn delete_member(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    if !members::delete_member(&state.db, member_id)? {
        return Err(ApiError::not_found("Team member", member_id));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn list_engines(State(state): State<AppState>) -> ApiResult<Json<Vec<Engine>>> {
    let engines = engines::list_engines(&state.db, state.org_id)?;
    Ok(Json(engines))
}

pub async fn create_engine(
    State(state): State<AppState>,
    Json(input): Json<NewEngine>,
) -> ApiResult<Json<Engine>> {
    if input.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    if input.slug.trim().is_empty() {
        return Err(ApiError::missing_field("slug"));
    }
    let engine = engines::create_engine(&state.db, state.org_id, &input)?;
    Ok(Json(engine))
}

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub action: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_activity(
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> ApiResult<Json<Vec<ActivityEntry>>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let filter = ActivityFilter {
        entity_type: params.entity_type,
        entity_id: params.entity_id,
        action: params.action,
    };
    let entries = activity::list_activity(&state.db, state.org_id, &filter, limit)?;
    Ok(Json(entries))
}

pub async fn list_lessons(State(state): State<AppState>) -> ApiResult<Json<Vec<Lesson>>> {
    let lessons = lessons::list_lessons(&state.db, state.org_id)?;
    Ok(Json(lessons))
}

pub async fn create_lesson(
    State(state): State<AppState>,
    Json(input): Json<NewLesson>,
) -> ApiResult<Json<Lesson>> {
    if input.title.trim().is_empty() {
        return Err(ApiError::missing_field("title"));
    }
    if input.insight.trim().is_empty() {
        return Err(ApiError::missing_field("insight"));
    }
    let lesson = lessons::create_lesson(&state.db, state.org_id, &input)?;
    Ok(Json(lesson))
}
