// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test harness: an in-process mock Salesforce org.
//!
//! The mock records every request (method, path, query, body) so tests
//! can assert call counts and call shapes, and it can be programmed
//! with pre-existing records and per-object failures.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use wp_salesforce_sync::config::Config;
use wp_salesforce_sync::models::StoredToken;
use wp_salesforce_sync::services::{MappingRegistry, OAuthManager, SalesforceApi, SyncEngine};
use wp_salesforce_sync::store::{
    KeyValueStore, MappingStore, MemoryStore, SyncStateStore, TokenStore,
};

/// One request the mock org received.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
}

/// Programmable state of the mock org.
#[derive(Default)]
pub struct MockOrg {
    pub requests: Mutex<Vec<RecordedRequest>>,
    /// authorization_code grants served
    pub token_grants: AtomicUsize,
    /// refresh_token grants served
    pub token_refreshes: AtomicUsize,
    /// When set, refresh grants answer 400 invalid_grant
    pub fail_refresh: AtomicBool,
    /// (object, external id value) → record id returned by SOQL lookups
    existing: Mutex<HashMap<(String, String), String>>,
    /// object → (status, message): creates/updates on it fail
    fail_object: Mutex<HashMap<String, (u16, String)>>,
    next_id: AtomicUsize,
}

#[allow(dead_code)]
impl MockOrg {
    fn record(&self, method: &str, path: &str, query: Option<String>, body: Option<Value>) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            path: path.to_string(),
            query,
            body,
        });
    }

    /// Requests whose path contains `fragment`, filtered by method.
    pub fn requests_matching(&self, method: &str, fragment: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path.contains(fragment))
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Program a record that SOQL lookups by external id will find.
    pub fn set_existing(&self, object: &str, external_id: &str, record_id: &str) {
        self.existing.lock().unwrap().insert(
            (object.to_string(), external_id.to_string()),
            record_id.to_string(),
        );
    }

    /// Make creates/updates on `object` fail with the given status.
    pub fn set_failure(&self, object: &str, status: u16, message: &str) {
        self.fail_object
            .lock()
            .unwrap()
            .insert(object.to_string(), (status, message.to_string()));
    }

    pub fn clear_failure(&self, object: &str) {
        self.fail_object.lock().unwrap().remove(object);
    }

    fn failure_for(&self, object: &str) -> Option<(u16, String)> {
        self.fail_object.lock().unwrap().get(object).cloned()
    }

    fn fresh_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("001MOCK{:05}", n)
    }

    /// Naive SOQL evaluation: `SELECT Id, F FROM Obj WHERE F = 'v' LIMIT 1`.
    fn lookup(&self, soql: &str) -> Vec<Value> {
        let object = soql
            .split_whitespace()
            .skip_while(|token| *token != "FROM")
            .nth(1)
            .unwrap_or_default()
            .to_string();
        let value = soql
            .split("= '")
            .nth(1)
            .and_then(|rest| rest.split('\'').next())
            .unwrap_or_default()
            .to_string();

        match self.existing.lock().unwrap().get(&(object.clone(), value)) {
            Some(id) => vec![json!({
                "attributes": {"type": object},
                "Id": id,
            })],
            None => Vec::new(),
        }
    }
}

/// Running mock org plus its base URL.
pub struct MockSalesforce {
    pub base_url: String,
    pub org: Arc<MockOrg>,
}

#[derive(Clone)]
struct MockAppState {
    org: Arc<MockOrg>,
    base_url: String,
}

/// Start the mock org on an ephemeral port.
#[allow(dead_code)]
pub async fn start_mock_salesforce() -> MockSalesforce {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock listener");
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let org = Arc::new(MockOrg::default());
    let state = MockAppState {
        org: org.clone(),
        base_url: base_url.clone(),
    };

    let app = Router::new()
        .route("/services/oauth2/token", post(token_endpoint))
        .route("/services/oauth2/revoke", post(revoke_endpoint))
        .route("/services/data/", get(version_index))
        .route(
            "/services/data/{version}/sobjects/{object}",
            post(create_record),
        )
        .route(
            "/services/data/{version}/sobjects/{object}/{id}",
            patch(update_record),
        )
        .route(
            "/services/data/{version}/sobjects/{object}/describe/",
            get(describe_object),
        )
        .route("/services/data/{version}/query/", get(run_query))
        .with_state(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock org serve");
    });

    MockSalesforce { base_url, org }
}

async fn token_endpoint(
    State(state): State<MockAppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let grant_type = form.get("grant_type").cloned().unwrap_or_default();
    state.org.record(
        "POST",
        "/services/oauth2/token",
        None,
        Some(json!({"grant_type": grant_type})),
    );

    if grant_type == "refresh_token" && state.org.fail_refresh.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "expired access/refresh token"
            })),
        )
            .into_response();
    }

    let serial = match grant_type.as_str() {
        "authorization_code" => state.org.token_grants.fetch_add(1, Ordering::SeqCst) + 1,
        "refresh_token" => state.org.token_refreshes.fetch_add(1, Ordering::SeqCst) + 1,
        _ => 0,
    };

    (
        StatusCode::OK,
        Json(json!({
            "access_token": format!("mock-access-{}-{}", grant_type, serial),
            "refresh_token": "mock-refresh-token",
            "instance_url": state.base_url,
            "token_type": "Bearer",
            "issued_at": "1700000000000",
            "expires_in": 3600
        })),
    )
        .into_response()
}

async fn revoke_endpoint(State(state): State<MockAppState>) -> StatusCode {
    state.org.record("POST", "/services/oauth2/revoke", None, None);
    StatusCode::OK
}

async fn version_index(State(state): State<MockAppState>) -> (StatusCode, Json<Value>) {
    state.org.record("GET", "/services/data/", None, None);
    (
        StatusCode::OK,
        Json(json!([{"label": "Winter '24", "url": "/services/data/v58.0", "version": "58.0"}])),
    )
}

async fn create_record(
    State(state): State<MockAppState>,
    Path((_version, object)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    state
        .org
        .record("POST", &format!("/sobjects/{}", object), None, Some(body));

    if let Some((status, message)) = state.org.failure_for(&object) {
        return api_error(status, &message);
    }

    (
        StatusCode::CREATED,
        Json(json!({"id": state.org.fresh_id(), "success": true, "errors": []})),
    )
        .into_response()
}

async fn update_record(
    State(state): State<MockAppState>,
    Path((_version, object, id)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    state.org.record(
        "PATCH",
        &format!("/sobjects/{}/{}", object, id),
        None,
        Some(body),
    );

    if let Some((status, message)) = state.org.failure_for(&object) {
        return api_error(status, &message);
    }

    StatusCode::NO_CONTENT.into_response()
}

async fn describe_object(
    State(state): State<MockAppState>,
    Path((_version, object)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    state
        .org
        .record("GET", &format!("/sobjects/{}/describe", object), None, None);
    (
        StatusCode::OK,
        Json(json!({"name": object, "fields": [{"name": "Id", "type": "id"}]})),
    )
}

async fn run_query(
    State(state): State<MockAppState>,
    Path(_version): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let soql = params.get("q").cloned().unwrap_or_default();
    state.org.record("GET", "/query", Some(soql.clone()), None);

    let records = state.org.lookup(&soql);
    (
        StatusCode::OK,
        Json(json!({
            "totalSize": records.len(),
            "done": true,
            "records": records
        })),
    )
}

fn api_error(status: u16, message: &str) -> Response {
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(json!([{"message": message, "errorCode": "FIELD_CUSTOM_VALIDATION_EXCEPTION"}])),
    )
        .into_response()
}

// ─── Test context ────────────────────────────────────────────────────

/// Everything a test needs, wired against the mock org.
#[allow(dead_code)]
pub struct TestContext {
    pub mock: MockSalesforce,
    pub store: MemoryStore,
    pub tokens: TokenStore,
    pub oauth: OAuthManager,
    pub registry: MappingRegistry,
    pub state: SyncStateStore,
    pub engine: SyncEngine,
}

/// Build a context with a valid token already seeded.
#[allow(dead_code)]
pub async fn create_test_context() -> TestContext {
    create_test_context_with_token(true).await
}

/// Build a context, optionally seeding a valid token.
#[allow(dead_code)]
pub async fn create_test_context_with_token(seed_token: bool) -> TestContext {
    init_test_logging();

    let mock = start_mock_salesforce().await;
    let config = Config {
        login_url: mock.base_url.clone(),
        ..Config::default()
    };

    let store = MemoryStore::new();
    let kv: Arc<dyn KeyValueStore> = Arc::new(store.clone());
    let tokens = TokenStore::new(kv.clone());
    if seed_token {
        seed_valid_token(&tokens, &mock.base_url).await;
    }

    let oauth = OAuthManager::new(config.clone(), tokens.clone());
    let api = SalesforceApi::new(oauth.clone(), &config.api_version);
    let registry = MappingRegistry::new(MappingStore::new(kv.clone()));
    let state = SyncStateStore::new(kv.clone());
    let engine = SyncEngine::new(api, registry.clone(), state.clone());

    TestContext {
        mock,
        store,
        tokens,
        oauth,
        registry,
        state,
        engine,
    }
}

/// Store a token that stays valid for the whole test.
#[allow(dead_code)]
pub async fn seed_valid_token(tokens: &TokenStore, instance_url: &str) {
    tokens
        .set(&StoredToken {
            access_token: "seeded-access".to_string(),
            refresh_token: "seeded-refresh".to_string(),
            instance_url: instance_url.to_string(),
            expires_at: (Utc::now() + chrono::Duration::hours(1)).to_rfc3339(),
        })
        .await
        .expect("seed token");
}

/// Store a token that expired an hour ago.
#[allow(dead_code)]
pub async fn seed_expired_token(tokens: &TokenStore, instance_url: &str) {
    tokens
        .set(&StoredToken {
            access_token: "expired-access".to_string(),
            refresh_token: "seeded-refresh".to_string(),
            instance_url: instance_url.to_string(),
            expires_at: (Utc::now() - chrono::Duration::hours(1)).to_rfc3339(),
        })
        .await
        .expect("seed token");
}

/// A user entity with enough fields for the default Lead mapping.
#[allow(dead_code)]
pub fn sample_user(id: u64) -> wp_salesforce_sync::models::WpEntity {
    wp_salesforce_sync::models::WpEntity::user(id)
        .with_attribute("ID", id.to_string())
        .with_attribute("first_name", "Ada")
        .with_attribute("last_name", "Lovelace")
        .with_attribute("user_email", "ada@example.com")
        .with_attribute("user_url", "https://ada.example.com")
        .with_meta("phone", "555-0100")
        .with_meta("company_name", "Analytical Engines Ltd")
}

#[allow(dead_code)]
fn init_test_logging() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();
}
