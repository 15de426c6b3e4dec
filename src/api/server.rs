//! HTTP server setup: router, middleware, and lifecycle.

use super::{org, tasks, AppState};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    // Permissive CORS so the dashboard frontend can be served separately
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        // Tasks and lifecycle operations
        .route(
            "/api/v1/tasks",
            get(tasks::list_tasks).post(tasks::create_task),
        )
        .route(
            "/api/v1/tasks/{id}",
            get(tasks::get_task)
                .patch(tasks::patch_task)
                .delete(tasks::delete_task),
        )
        .route("/api/v1/tasks/{id}/status", axum::routing::patch(tasks::change_status))
        .route("/api/v1/tasks/{id}/claim", post(tasks::claim_task))
        .route("/api/v1/tasks/{id}/evaluate", post(tasks::evaluate_task))
        .route(
            "/api/v1/tasks/{id}/comments",
            get(tasks::list_comments).post(tasks::create_comment),
        )
        // Organization
        .route(
            "/api/v1/team",
            get(org::list_members).post(org::create_member),
        )
        .route(
            "/api/v1/team/{id}",
            get(org::get_member)
                .patch(org::patch_member)
                .delete(org::delete_member),
        )
        .route(
            "/api/v1/engines",
            get(org::list_engines).post(org::create_engine),
        )
        .route("/api/v1/activity", get(org::list_activity))
        .route(
            "/api/v1/memory/lessons",
            get(org::list_lessons).post(org::create_lesson),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the specified port.
///
/// Returns a oneshot sender that can be used to signal shutdown,
/// and the actual address the server is bound to.
pub async fn start_server(
    state: AppState,
    port: u16,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("API server listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            })
            .await
        {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
