mod handlers;
mod routes;

use axum::{routing::get, Router};
use sqlx::{Pool, Sqlite};
use std::net::SocketAddr;

use crate::insights::InsightsEngine;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub insights: InsightsEngine,
}

impl AppState {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            insights: InsightsEngine::new(pool.clone()),
            db: pool,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes())
        .with_state(state)
}

pub async fn run_server(pool: Pool<Sqlite>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(AppState::new(pool));

    tracing::info!("server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
