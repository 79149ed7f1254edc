// src/main.rs
use std::net::SocketAddr;

use dotenvy::dotenv;
use pocket_tracker::{backend, database};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pool = database::db::connection::get_db_pool().await?;

    database::db::migrate::run_migrations(&pool).await?;
    database::db::queries::seed_default_categories(&pool).await?;
    tracing::info!("database ready");

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()?;

    backend::run_server(pool, addr).await
}
