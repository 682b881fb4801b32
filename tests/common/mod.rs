#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use bitacora_api::auth::{generate_jwt, Claims};
use bitacora_api::config::AppConfig;
use bitacora_api::database::Database;
use bitacora_api::services::LogMailer;
use bitacora_api::state::AppState;
use sqlx::MySqlPool;

pub const JWT_SECRET: &str = "integration-test-secret";

/// In-process server bound to a random port. Unless built by [`spawn_live`],
/// the database pool points at a port nothing listens on, so those tests
/// cover everything that answers before the first query.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, bitacora_api::API_PREFIX, path)
    }
}

pub fn test_config(overrides: &[(&str, &str)]) -> Result<AppConfig> {
    let db_port = portpicker::pick_unused_port().context("failed to pick free db port")?;
    let uploads = std::env::temp_dir().join(format!("bitacora-it-{}", db_port));

    let mut vars: HashMap<String, String> = HashMap::from([
        ("APP_ENV".to_string(), "development".to_string()),
        ("DB_HOST".to_string(), "127.0.0.1".to_string()),
        ("DB_PORT".to_string(), db_port.to_string()),
        ("DB_ACQUIRE_TIMEOUT_SECS".to_string(), "1".to_string()),
        ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
        ("UPLOADS_DIR".to_string(), uploads.display().to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }

    Ok(AppConfig::from_lookup(move |key| vars.get(key).cloned()))
}

pub async fn spawn_server() -> Result<TestServer> {
    spawn_with(test_config(&[])?).await
}

pub async fn spawn_with(config: AppConfig) -> Result<TestServer> {
    let db = Database::connect_lazy(&config.database);
    serve(config, db).await
}

/// Server backed by the MySQL database in `DATABASE_URL`, migrated first.
/// Returns `None` when the variable is unset so store tests skip cleanly.
pub async fn spawn_live() -> Result<Option<(TestServer, MySqlPool)>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return Ok(None);
    };
    let pool = MySqlPool::connect(&url).await.context("failed to connect to DATABASE_URL")?;
    let db = Database::from_pool(pool.clone());
    db.migrate().await?;

    let server = serve(test_config(&[])?, db).await?;
    Ok(Some((server, pool)))
}

async fn serve(config: AppConfig, db: Database) -> Result<TestServer> {
    let state = AppState::new(config, db, Arc::new(LogMailer));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind test listener")?;
    let port = listener.local_addr()?.port();

    let app = bitacora_api::app(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        port,
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    })
}

/// Bearer token for a user with the given privilege level (1 = system admin).
pub fn token(login: &str, nivel: i32, fkarea: Option<i32>) -> String {
    let claims = Claims::new(login.to_string(), format!("Usuario {}", login), nivel, fkarea, 1);
    generate_jwt(&claims, JWT_SECRET).expect("failed to sign test token")
}

pub async fn json_body(res: reqwest::Response) -> Result<serde_json::Value> {
    res.json::<serde_json::Value>().await.context("response was not JSON")
}

/// Short random suffix for rows shared test databases must not collide on.
pub fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..10])
}

pub async fn seed_area(pool: &MySqlPool, name: &str) -> Result<i32> {
    let result = sqlx::query("INSERT INTO areas (nombrearea) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(i32::try_from(result.last_insert_id())?)
}

pub async fn seed_user(pool: &MySqlPool, login: &str, nivel: i32, fkarea: Option<i32>) -> Result<()> {
    sqlx::query("INSERT INTO usuarios (login, nombres, nivel, fkarea, password) VALUES (?, ?, ?, ?, ?)")
        .bind(login)
        .bind(format!("Usuario {}", login))
        .bind(nivel)
        .bind(fkarea)
        .bind("sin-acceso")
        .execute(pool)
        .await?;
    Ok(())
}

/// Private, non-public log entry dated today on the database clock.
pub async fn seed_bitacora(pool: &MySqlPool, login: &str, fkarea: i32) -> Result<i32> {
    let result = sqlx::query(
        "INSERT INTO bitacora (fecha, hora, turno, login, tema, descripcion, fkarea, publico) \
         VALUES (CURDATE(), '08:00:00', 'A', ?, 'Fuga en bomba', 'Se detectó fuga en sello', ?, 0)",
    )
    .bind(login)
    .bind(fkarea)
    .execute(pool)
    .await?;
    Ok(i32::try_from(result.last_insert_id())?)
}
