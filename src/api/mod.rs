pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;

use crate::core::engine::RankingEngine;
use crate::utils::error::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub engine: RankingEngine,
}

impl AppState {
    pub fn new(engine: RankingEngine) -> Self {
        Self { engine }
    }
}

pub fn router(state: AppState) -> Router {
    use handlers::*;

    Router::new()
        .route("/health", get(health))
        .route("/api/users", post(create_user))
        .route("/api/users/:owner_id", get(get_user))
        .route("/api/users/:owner_id/rankings", get(get_rankings))
        .route("/api/users/:owner_id/rankings/:item_id", delete(remove_ranking))
        .route("/api/users/:owner_id/next-comparison", get(next_comparison))
        .route("/api/users/:owner_id/insert-ranking", post(insert_ranking))
        .route("/api/users/:owner_id/sessions", post(start_session))
        .route("/api/users/:owner_id/sessions/answer", post(answer_session))
        .route("/api/users/:owner_id/sessions/commit", post(commit_session))
        .route("/api/courses", get(list_courses).post(create_course))
        .route("/api/courses/:course_id", get(get_course).delete(delete_course))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("🚀 Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
