#![allow(dead_code)]
/// Common helpers for integration tests against a live ClickHouse server.
use clickhouse_conn::{Client, ClientOptions};
use std::env;

/// ClickHouse host from the environment, defaulting to localhost.
pub fn clickhouse_host() -> String {
    env::var("CLICKHOUSE_HOST").unwrap_or_else(|_| "localhost".to_string())
}

/// ClickHouse port from the environment, defaulting to 9000.
pub fn clickhouse_port() -> u16 {
    env::var("CLICKHOUSE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(9000)
}

fn options(database: &str) -> ClientOptions {
    ClientOptions::new(clickhouse_host(), clickhouse_port())
        .database(database)
        .user("default")
        .password("")
}

/// Connect to the default database.
pub async fn create_test_client() -> Result<Client, Box<dyn std::error::Error>> {
    Ok(Client::connect(options("default")).await?)
}

/// Unique database name for test isolation. Nanosecond timestamp keeps
/// parallel runs apart.
pub fn unique_database_name(test_name: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let safe_name = test_name.replace(['-', ' '], "_");
    format!("test_{}_{}", safe_name, timestamp)
}

/// Create an isolated database and a client connected to it.
pub async fn create_isolated_test_client(
    test_name: &str,
) -> Result<(Client, String), Box<dyn std::error::Error>> {
    let db_name = unique_database_name(test_name);

    let bootstrap = Client::connect(options("default")).await?;
    bootstrap
        .command(format!("CREATE DATABASE {}", db_name))
        .await?;
    bootstrap.close().await;

    let client = Client::connect(options(&db_name)).await?;
    Ok((client, db_name))
}

/// Drop a test database, ignoring failures.
pub async fn cleanup_test_database(db_name: &str) {
    if let Ok(client) = Client::connect(options("default")).await {
        let _ = client
            .command(format!("DROP DATABASE IF EXISTS {}", db_name))
            .await;
        client.close().await;
    }
}
