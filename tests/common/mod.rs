#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use motionify_portal::jwt::JwtConfig;
use motionify_portal::models::user::{Role, User};
use motionify_portal::{build_router, AppState};

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub jwt: JwtConfig,
    // dropped last so the sqlite file outlives the pool
    _dir: TempDir,
}

pub async fn setup() -> Result<TestApp> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    let jwt = JwtConfig::new("test-secret", 1);
    let app = build_router(AppState::new(pool.clone(), jwt.clone()));

    Ok(TestApp { app, pool, jwt, _dir: dir })
}

impl TestApp {
    /// Inserts a user directly and returns it with a bearer token.
    pub async fn user(&self, name: &str, role: Role) -> Result<(User, String)> {
        let email = format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4());
        let user = User::new(name, email, role);

        sqlx::query("INSERT INTO users (id, name, email, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.role.as_str())
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await?;

        let token = self.jwt.encode(user.id)?;
        Ok((user, token))
    }

    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("non-json body: {}", String::from_utf8_lossy(&bytes)))?
        };

        Ok((status, value))
    }

    pub async fn expect(&self, expected: StatusCode, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Value> {
        let (status, value) = self.send(method, uri, token, body).await?;
        if status != expected {
            panic!("{} {} returned {} (expected {}): {}", method, uri, status, expected, value);
        }
        Ok(value)
    }
}

pub fn id_of(value: &Value) -> Result<String> {
    value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .context("missing id")
}

pub fn message_of(value: &Value) -> String {
    value.get("message").and_then(Value::as_str).unwrap_or_default().to_string()
}
