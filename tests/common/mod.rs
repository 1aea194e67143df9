//! In-process mock of the dashboard backend

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use finboard::api::types::User;
use finboard::api::HistoryNavigator;
use finboard::auth::{CredentialStore, MemoryCredentialStore, SessionState, SessionStore, StoredCredentials};
use finboard::core::config::ApiConfig;
use finboard::dashboard::{CachePolicies, Dashboard};
use finboard::ApiGateway;

pub const TOKEN: &str = "tok";
pub const PASSWORD: &str = "secret1";
pub const TAKEN_EMAIL: &str = "taken@example.com";

#[derive(Default)]
pub struct MockState {
    hits: Mutex<HashMap<&'static str, usize>>,
    /// Answer 401 to every authorized request
    pub reject_tokens: AtomicBool,
    /// Answer 500 to logout
    pub fail_logout: AtomicBool,
    /// Accept login and logout requests but never answer them
    pub stall: AtomicBool,
}

impl MockState {
    fn hit(&self, route: &'static str) {
        *self.hits.lock().entry(route).or_default() += 1;
    }

    pub fn hits(&self, route: &str) -> usize {
        self.hits.lock().get(route).copied().unwrap_or(0)
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", TOKEN);
        !self.reject_tokens.load(Ordering::SeqCst)
            && headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(|v| v == expected)
                .unwrap_or(false)
    }
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/api/users/login", post(login))
            .route("/api/users/register", post(register))
            .route("/api/users/logout", post(logout))
            .route("/api/financial/summary", get(summary))
            .route("/api/financial/transactions/recent", get(recent_transactions))
            .route("/api/financial/working-capital", get(working_capital))
            .route("/api/financial/wallet", get(wallet))
            .route("/api/financial/transfers/scheduled", get(transfers))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            server,
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: format!("http://{}/api", self.addr),
            timeout_secs: 5,
        }
    }

    pub fn hits(&self, route: &str) -> usize {
        self.state.hits(route)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub fn user() -> User {
    User {
        id: "42".to_string(),
        full_name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        role: Some("user".to_string()),
    }
}

/// Everything a presentation layer would hold
pub struct Client {
    pub storage: Arc<MemoryCredentialStore>,
    pub state: Arc<SessionState>,
    pub navigator: Arc<HistoryNavigator>,
    pub session: SessionStore,
    pub dashboard: Dashboard,
}

impl Client {
    pub fn anonymous(backend: &MockBackend) -> Self {
        Self::with_storage(backend, MemoryCredentialStore::new())
    }

    /// Session restored from a stored `tok`
    pub fn signed_in(backend: &MockBackend) -> Self {
        Self::with_storage(
            backend,
            MemoryCredentialStore::with_credentials(StoredCredentials {
                token: TOKEN.to_string(),
                user: user(),
            }),
        )
    }

    fn with_storage(backend: &MockBackend, storage: MemoryCredentialStore) -> Self {
        let storage = Arc::new(storage);
        let state = Arc::new(SessionState::new(storage.clone()));
        state.restore_from_storage();

        let navigator = Arc::new(HistoryNavigator::new());
        let api = ApiGateway::new(&backend.api_config(), Arc::clone(&state), navigator.clone())
            .unwrap();
        let session = SessionStore::new(api.clone());
        let dashboard = Dashboard::new(api, CachePolicies::default());

        Self {
            storage,
            state,
            navigator,
            session,
            dashboard,
        }
    }

    pub fn stored(&self) -> Option<StoredCredentials> {
        self.storage.load().unwrap()
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.hit("login");
    if state.stall.load(Ordering::SeqCst) {
        std::future::pending::<()>().await;
    }
    if body["password"] == PASSWORD {
        let user = user();
        Json(json!({
            "data": {
                "user": {
                    "id": 42,
                    "fullName": user.full_name,
                    "email": body["email"],
                    "role": "user"
                },
                "accessToken": TOKEN
            }
        }))
        .into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.hit("register");
    if body["email"] == TAKEN_EMAIL {
        (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Email already registered" })),
        )
            .into_response()
    } else {
        (StatusCode::CREATED, Json(json!({ "data": { "id": 43 } }))).into_response()
    }
}

async fn logout(State(state): State<Arc<MockState>>) -> Response {
    state.hit("logout");
    if state.stall.load(Ordering::SeqCst) {
        std::future::pending::<()>().await;
    }
    if state.fail_logout.load(Ordering::SeqCst) {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn summary(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.hit("summary");
    if !state.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Token expired" })))
            .into_response();
    }
    Json(json!({
        "data": {
            "totalBalance": { "amount": 5240.21, "currency": "USD", "change": { "percentage": 12.5, "trend": "up" } },
            "totalExpense": { "amount": 250.8, "currency": "USD", "change": { "percentage": 2.1, "trend": "down" } },
            "totalSavings": { "amount": 550.25, "currency": "USD" }
        }
    }))
    .into_response()
}

async fn recent_transactions(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hit("transactions");
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    // Slow enough for concurrent callers to overlap
    tokio::time::sleep(Duration::from_millis(50)).await;

    let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(20);
    let transactions: Vec<Value> = (0..limit)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("Payment {}", i),
                "business": "Acme",
                "type": "expense",
                "amount": 10.0 + i as f64,
                "currency": "USD",
                "date": "2024-05-01T10:00:00Z"
            })
        })
        .collect();
    Json(json!({ "data": { "transactions": transactions } })).into_response()
}

async fn working_capital(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.hit("working-capital");
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "data": {
            "data": [
                { "month": "Jan", "income": 4200, "expense": 3100 },
                { "month": "Feb", "income": -15, "expense": 2900 },
                { "month": "Mar", "income": 5100, "expense": 4800 }
            ]
        }
    }))
    .into_response()
}

async fn wallet(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.hit("wallet");
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "data": {} })).into_response()
}

async fn transfers(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.hit("transfers");
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "data": {
            "transfers": [
                { "id": "t1", "name": "Rent", "date": "2024-06-01", "amount": 1200, "currency": "EUR", "status": "scheduled" }
            ]
        }
    }))
    .into_response()
}
