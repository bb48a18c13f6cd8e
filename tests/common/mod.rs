//! Shared helpers for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use feedback_server::storage::{
    CredentialIssuer, CredentialService, ObjectStore, TemporaryCredentials,
};
use feedback_server::{routes, AppError, AppState, Config, FeedbackStore};

pub const PUBLIC_BASE_URL: &str = "https://cdn.example.com";

// =============================================================================
// Configuration
// =============================================================================

/// Create a test configuration
pub fn test_config(admin_key: Option<&str>) -> Config {
    let mut vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", "postgres://feedback@127.0.0.1:1/unused".to_string()),
        ("ENVIRONMENT", "test".to_string()),
        ("S3_BUCKET", "bug-reports".to_string()),
        ("S3_REGION", "eu-west-1".to_string()),
        ("S3_PUBLIC_BASE_URL", PUBLIC_BASE_URL.to_string()),
        ("FEEDBACK_DIR", "feedback".to_string()),
        (
            "STS_ROLE_ARN",
            "arn:aws:iam::123456789012:role/feedback-upload".to_string(),
        ),
    ]);
    if let Some(key) = admin_key {
        vars.insert("ADMIN_SECRET_KEY", key.to_string());
    }

    Config::from_vars(|key| vars.get(key).cloned()).expect("test config must be valid")
}

// =============================================================================
// Cloud fakes
// =============================================================================

/// Credential service that records every policy it is asked to sign
#[derive(Default)]
pub struct FakeCredentialService {
    pub policies: Mutex<Vec<String>>,
    pub fail: bool,
}

impl FakeCredentialService {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.policies.lock().unwrap().len()
    }
}

#[async_trait]
impl CredentialService for FakeCredentialService {
    async fn assume_role(
        &self,
        policy: &str,
        duration_secs: i32,
    ) -> feedback_server::Result<TemporaryCredentials> {
        self.policies.lock().unwrap().push(policy.to_string());
        if self.fail {
            return Err(AppError::CredentialService("AccessDenied".to_string()));
        }
        Ok(TemporaryCredentials {
            access_key_id: "ASIATESTKEY".to_string(),
            access_key_secret: "test-secret".to_string(),
            security_token: "test-token".to_string(),
            expiration: Utc::now() + ChronoDuration::seconds(duration_secs as i64),
        })
    }
}

/// Object store that remembers deleted keys
#[derive(Default)]
pub struct RecordingObjectStore {
    pub deleted: Mutex<Vec<String>>,
}

impl RecordingObjectStore {
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingObjectStore {
    async fn delete_object(&self, key: &str) -> feedback_server::Result<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

// =============================================================================
// Application
// =============================================================================

pub struct TestApp {
    pub router: Router,
    pub store: FeedbackStore,
    pub credentials: Arc<FakeCredentialService>,
    pub objects: Arc<RecordingObjectStore>,
}

/// Pool that never connects unless a handler reaches the database
pub fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(500))
        .connect_lazy("postgres://feedback@127.0.0.1:1/unused")
        .expect("lazy pool")
}

/// Build the router around `pool` with fake cloud clients
pub fn build_app(
    pool: PgPool,
    credentials: FakeCredentialService,
    admin_key: Option<&str>,
) -> TestApp {
    let config = test_config(admin_key);
    let credentials = Arc::new(credentials);
    let objects = Arc::new(RecordingObjectStore::default());
    let store = FeedbackStore::new(pool, config.s3_public_base_url.clone());

    let state = AppState::new(
        store.clone(),
        CredentialIssuer::new(credentials.clone(), &config),
        objects.clone(),
        config,
    );

    TestApp {
        router: routes::api_router().with_state(state),
        store,
        credentials,
        objects,
    }
}

impl TestApp {
    /// Send one request and return status plus parsed JSON body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Create a request with JSON body
pub fn json_request(method: &str, uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

/// Create a GET request
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// Pool confined to a private schema that is dropped by `cleanup`
pub struct TestDatabase {
    pub pool: PgPool,
    admin_pool: PgPool,
    schema: String,
}

impl TestDatabase {
    pub async fn cleanup(self) {
        self.pool.close().await;
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&self.admin_pool)
            .await
            .expect("drop test schema");
        self.admin_pool.close().await;
    }

    /// Rows currently in `table`
    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .expect("count rows")
    }
}

/// Connect to `TEST_DATABASE_URL` in a fresh schema, or skip when unset.
pub async fn postgres_or_skip() -> Option<TestDatabase> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("Skipping PostgreSQL test (TEST_DATABASE_URL not set)");
        return None;
    };

    let admin_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");

    let schema = format!("feedback_test_{}", uuid::Uuid::new_v4().simple());
    sqlx::query(&format!("CREATE SCHEMA {}", schema))
        .execute(&admin_pool)
        .await
        .expect("create test schema");

    let options = PgConnectOptions::from_str(&url)
        .expect("parse TEST_DATABASE_URL")
        .options([("search_path", schema.as_str())]);
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .expect("connect test pool");

    feedback_server::db::run_migrations(&pool)
        .await
        .expect("run migrations");

    Some(TestDatabase {
        pool,
        admin_pool,
        schema,
    })
}
