#![allow(dead_code)]

use std::{str::FromStr, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use rental_api::{
    clock::{Clock, ManualClock, SharedClock},
    config::AppConfig,
    db, AppState,
};

pub const CUSTOMER_ID: &str = "529.982.247-25";
pub const OTHER_CUSTOMER_ID: &str = "111.444.777-35";

/// Application harness backed by a fresh in-memory SQLite database and a
/// manually driven clock.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::starting_at(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()).await
    }

    pub async fn starting_at(now: DateTime<Utc>) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // In-memory SQLite is per connection
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let clock = Arc::new(ManualClock::new(now));
        let shared: SharedClock = clock.clone();
        let state = AppState::new(Arc::new(pool), cfg, shared);
        let router = rental_api::app_router(state.clone());

        Self {
            router,
            state,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(
                serde_json::to_vec(&json).expect("failed to serialize json request body"),
            )
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

    /// Sends the request and returns status plus decoded JSON (Null when empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn create_garment(&self, code: &str) -> Value {
        self.create_garment_with(garment_body(code)).await
    }

    pub async fn create_garment_with(&self, body: Value) -> Value {
        let (status, json) = self.call(Method::POST, "/api/v1/garments", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "garment create failed: {json}");
        json["data"].clone()
    }

    pub async fn garment(&self, id: &str) -> Value {
        let (status, json) = self
            .call(Method::GET, &format!("/api/v1/garments/{id}"), None)
            .await;
        assert_eq!(status, StatusCode::OK, "garment fetch failed: {json}");
        json["data"].clone()
    }

    pub async fn create_rental(&self, body: Value) -> Value {
        let (status, json) = self.call(Method::POST, "/api/v1/rentals", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "rental create failed: {json}");
        json["data"].clone()
    }

    pub async fn rental(&self, id: &str) -> Value {
        let (status, json) = self
            .call(Method::GET, &format!("/api/v1/rentals/{id}"), None)
            .await;
        assert_eq!(status, StatusCode::OK, "rental fetch failed: {json}");
        json["data"].clone()
    }

    pub async fn update_rental(&self, id: &str, patch: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, &format!("/api/v1/rentals/{id}"), Some(patch))
            .await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response was not JSON")
    }
}

pub fn garment_body(code: &str) -> Value {
    json!({
        "name": format!("Gown {code}"),
        "code": code,
        "category": "party",
        "size": "M",
        "color": "navy",
        "rental_price": "200.00",
    })
}

pub fn rental_body(garment_id: &str, pickup: DateTime<Utc>, due: DateTime<Utc>) -> Value {
    json!({
        "garment_id": garment_id,
        "customer": {
            "full_name": "Maria Souza",
            "national_id": CUSTOMER_ID,
            "phone": "+55 11 91234-5678",
            "address": "Rua das Flores, 100",
        },
        "pickup_date": pickup.to_rfc3339(),
        "return_due": due.to_rfc3339(),
        "agreed_price": "200.00",
        "deposit": "50.00",
        "payment_method": "pix",
    })
}

/// Decimal fields come back as JSON strings or numbers depending on backend
/// precision; compare numerically.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
