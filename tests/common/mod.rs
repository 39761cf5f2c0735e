#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use lustre_api::{
    auth::{AuthConfig, AuthService, UserRole},
    config::AppConfig,
    db,
    entities::{Gender, Material},
    events::{self, EventSender},
    handlers::AppServices,
    message_queue::InMemoryMessageQueue,
    services::{
        products::CreateProductInput,
        storage::{ImageStorage, LocalImageStorage},
    },
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseBackend as DbBackend, Statement};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@lustre.test";
pub const CUSTOMER_EMAIL: &str = "customer@lustre.test";
pub const PASSWORD: &str = "correct-horse-battery";

/// Application backed by an in-memory SQLite database, with one admin and
/// one customer already logged in.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub queue: Arc<InMemoryMessageQueue>,
    pub upload_dir: TempDir,
    pub admin_token: String,
    pub customer_token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_queue(Arc::new(InMemoryMessageQueue::new())).await
    }

    pub async fn with_queue(queue: Arc<InMemoryMessageQueue>) -> Self {
        let upload_dir = tempfile::tempdir().expect("create upload dir");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "integration_test_secret_that_is_long_enough_42".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.upload_dir = upload_dir.path().to_string_lossy().into_owned();
        cfg.public_upload_base_url = "/uploads".to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&cfg),
            db_arc.clone(),
        ));

        let storage: Arc<dyn ImageStorage> = Arc::new(LocalImageStorage::from_app_config(&cfg));
        let services = AppServices::with_backends(
            db_arc.clone(),
            event_sender.clone(),
            auth_service.clone(),
            &cfg,
            storage,
            queue.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let admin_token = issue_token(&auth_service, ADMIN_EMAIL, "Admin", UserRole::Admin).await;
        let customer_token =
            issue_token(&auth_service, CUSTOMER_EMAIL, "Customer", UserRole::Customer).await;

        let router = lustre_api::build_app(state.clone());

        Self {
            router,
            state,
            queue,
            upload_dir,
            admin_token,
            customer_token,
            _event_task: event_task,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.admin_token)).await
    }

    pub async fn customer(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.customer_token))
            .await
    }

    pub async fn public(&self, method: Method, uri: &str) -> Response {
        self.request(method, uri, None, None).await
    }

    pub async fn execute(&self, sql: &str) {
        self.state
            .db
            .execute(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
            .await
            .expect("execute raw sql");
    }

    pub async fn seed_product(
        &self,
        name: &str,
        material: Material,
        weight: Decimal,
        price: Option<Decimal>,
    ) -> lustre_api::entities::product::Model {
        self.services()
            .products
            .create_product(product_input(name, material, weight, price))
            .await
            .expect("seed product for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

async fn issue_token(auth: &AuthService, email: &str, name: &str, role: UserRole) -> String {
    auth.create_user(email, name, PASSWORD, role)
        .await
        .expect("create test user");
    auth.login(email, PASSWORD)
        .await
        .expect("log in test user")
        .access_token
}

pub fn product_input(
    name: &str,
    material: Material,
    weight: Decimal,
    price: Option<Decimal>,
) -> CreateProductInput {
    CreateProductInput {
        name: name.to_string(),
        slug: None,
        description: Some(format!("{} for integration tests", name)),
        material,
        gender: Gender::Unisex,
        weight,
        price,
        compare_at_price: None,
        stock: 5,
        is_active: true,
        category_id: None,
        images: Vec::new(),
        attributes: Vec::new(),
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body bytes")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decimals serialize as strings; compare them numerically.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(raw) => Decimal::from_str(raw).expect("decimal string"),
        Value::Number(number) => Decimal::from_str(&number.to_string()).expect("decimal number"),
        other => panic!("expected a decimal, got {other}"),
    }
}

pub async fn response_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body bytes")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn id_of(value: &Value) -> Uuid {
    Uuid::parse_str(value["id"].as_str().expect("id field")).expect("uuid id")
}
