use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::env;
use std::str::FromStr;

pub async fn get_db_pool() -> Result<Pool<Sqlite>, sqlx::Error> {
    let db_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./pocket_tracker.db".to_string());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// In-memory pool for tests. A single connection is required: every new
/// `sqlite::memory:` connection would otherwise see its own empty database.
#[cfg(test)]
pub(crate) async fn test_pool() -> Pool<Sqlite> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}
