#![allow(dead_code)]

use reqwest::Client;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Once,
};

static INIT: Once = Once::new();
static MIGRATIONS_RAN: AtomicBool = AtomicBool::new(false);

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        // The suite hammers endpoints from one IP; the limiter would trip.
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = agripulse::config::jwt::JwtConfig::from_env().unwrap();
        let _ = agripulse::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }

    pub fn ws_url(&self, token: &str) -> String {
        format!("{}/ws?token={}", self.addr.replacen("http", "ws", 1), token)
    }
}

pub async fn spawn_app() -> TestApp {
    init_env();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"));

    let db = sea_orm::Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    if !MIGRATIONS_RAN.swap(true, Ordering::SeqCst) {
        agripulse::migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
    }

    let hub = agripulse::websocket::hub::NotificationHub::new();

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "ok" }))
        .merge(agripulse::routes::create_routes())
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(hub));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
    }
}

/// Register a fresh user with a unique name. Tests isolate by user rather
/// than by wiping tables, so suites can run in parallel against one database.
pub async fn register_user(app: &TestApp, prefix: &str) -> (i32, String) {
    let username = format!("{}_{}", prefix, uuid::Uuid::new_v4().simple());
    let resp = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{}@agripulse.test", username),
            "password": "harvest_password_1",
            "farm_name": "Sunrise Acres",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "registration failed");

    let body: Value = resp.json().await.unwrap();
    let user_id = body["data"]["user_id"].as_i64().unwrap() as i32;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    (user_id, token)
}

pub async fn make_admin(db: &DatabaseConnection, user_id: i32) {
    db.execute(Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Postgres,
        "UPDATE users SET role = 'admin' WHERE id = $1",
        [user_id.into()],
    ))
    .await
    .expect("Failed to promote user to admin");
}

/// Create a notification for the caller via the internal POST surface.
/// Returns the created object from the response envelope.
pub async fn push_notification(app: &TestApp, token: &str, kind: &str, title: &str) -> Value {
    let resp = app
        .client
        .post(app.url("/notifications"))
        .bearer_auth(token)
        .json(&json!({
            "kind": kind,
            "title": title,
            "message": format!("{} message body", title),
            "metadata": {"farm": "Sunrise Acres"},
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "notification create failed");

    let body: Value = resp.json().await.unwrap();
    body["data"].clone()
}
