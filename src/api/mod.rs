//! REST API layer.

pub mod org;
pub mod server;
pub mod tasks;

use crate::db::Database;
use crate::error::ApiError;
use crate::lifecycle::LifecycleEngine;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: LifecycleEngine,
    /// Organization all requests are scoped to.
    pub org_id: i64,
}

impl AppState {
    pub fn new(db: Database, org_id: i64) -> Self {
        let engine = LifecycleEngine::new(db.clone());
        Self { db, engine, org_id }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(serde_json::json!({ "error": self }))).into_response()
    }
}
