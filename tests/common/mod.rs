#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use cargolink_api::{
    app_router,
    config::AppConfig,
    db,
    events::{self, EventSender},
    logging::discard_logger,
    models::profile::{self, UserType},
    AppState,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str =
    "k3Jf9sQx2LmN8vBp4TzR7wYc1HdG6aEu0oIiPlMnKjHgFdSaQwErTyUiOpZxCvBnMq";

/// Application over a throwaway SQLite file, with one admin and one client.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub admin_id: Uuid,
    pub client_id: Uuid,
    admin_token: String,
    client_token: String,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let db_file = dir.path().join("cargolink_test.sqlite");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.cors_allow_any_origin = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let logger = discard_logger();
        let state = AppState::new(cfg, db_arc, Arc::new(EventSender::new(event_tx)), &logger)
            .expect("app state");
        let router = app_router(state.clone(), &logger).expect("router");

        let admin_id = Uuid::new_v4();
        let client_id = Uuid::new_v4();
        seed_profile(&state, admin_id, "ops@cargolink.test", UserType::Admin).await;
        seed_profile(&state, client_id, "client@example.com", UserType::Client).await;

        let admin_token = token_for(&state, admin_id, "ops@cargolink.test");
        let client_token = token_for(&state, client_id, "client@example.com");

        Self {
            router,
            state,
            admin_id,
            client_id,
            admin_token,
            client_token,
            _event_task: event_task,
            _dir: dir,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn client_token(&self) -> &str {
        &self.client_token
    }

    /// Token for a user with no profile yet
    pub fn token_for_new_user(&self, email: &str) -> (Uuid, String) {
        let id = Uuid::new_v4();
        (id, token_for(&self.state, id, email))
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
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn guest(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, None).await
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(self.admin_token())).await
    }

    pub async fn client(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(self.client_token())).await
    }

    /// Creates a shipment as admin and returns its `data` object.
    pub async fn create_shipment(&self, body: Value) -> Value {
        let response = self
            .admin(Method::POST, "/api/v1/admin/shipments", Some(body))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response_json(response).await["data"].clone()
    }

    /// Appends an event as admin and returns the raw response.
    pub async fn append_event(&self, shipment_id: &str, event: Value) -> Response {
        self.admin(
            Method::POST,
            &format!("/api/v1/admin/shipments/{}/events", shipment_id),
            Some(event),
        )
        .await
    }

    /// Adds an active payment option of the given type.
    pub async fn add_payment_option(&self, method_type: &str) -> Value {
        let response = self
            .admin(
                Method::POST,
                "/api/v1/admin/payment-options",
                Some(json!({
                    "method_type": method_type,
                    "display_name": format!("Pay by {}", method_type),
                    "details": "ACCT 0042-1187",
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response_json(response).await["data"].clone()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

async fn seed_profile(state: &AppState, id: Uuid, email: &str, user_type: UserType) {
    let now = Utc::now();
    profile::ActiveModel {
        id: Set(id),
        email: Set(email.to_string()),
        full_name: Set(None),
        phone: Set(None),
        company_name: Set(None),
        address: Set(None),
        city: Set(None),
        state: Set(None),
        postal_code: Set(None),
        country: Set(None),
        user_type: Set(user_type),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(state.db.as_ref())
    .await
    .expect("seed profile");
}

fn token_for(state: &AppState, id: Uuid, email: &str) -> String {
    state
        .auth
        .issue_token(id, Some(email.to_string()), chrono::Duration::hours(1))
        .expect("issue token")
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Reads a JSON money field; decimals serialize as strings.
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected a decimal string, got {}", value))
        .parse()
        .expect("decimal")
}

/// A valid admin shipment form; `weight_kg` 3, standard, no extras.
pub fn shipment_body(customer_id: Option<Uuid>) -> Value {
    json!({
        "customer_id": customer_id,
        "sender": {
            "name": "Ada Warehouse",
            "email": "dispatch@ada.example",
            "address": "12 Dock Road",
            "city": "Rotterdam",
            "country": "NL"
        },
        "recipient": {
            "name": "Grace Hopper",
            "email": "grace@example.com",
            "address": "1 Navy Way",
            "city": "Arlington",
            "state": "VA",
            "postal_code": "22202",
            "country": "US"
        },
        "package": {
            "package_type": "box",
            "weight_kg": "3",
            "declared_value": "120.00",
            "description": "Books"
        },
        "service": {
            "service_type": "standard",
            "signature_required": false,
            "insurance_required": false
        }
    })
}

pub fn event(event_type: &str) -> Value {
    json!({ "event_type": event_type, "location": "Hub 4" })
}
