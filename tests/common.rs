#![allow(dead_code)]

use axum::extract::{Form, Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use forms_client::adapters::storage::{MemorySecureStore, SecureStore};
use forms_client::config::{ApiConfig, AuthConfig};
use forms_client::domain::auth::{AuthToken, TOKEN_STORAGE_KEY};
use forms_client::{ClientBuilder, FormsClient};
use reqwest::Url;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, Once};
use time::{Duration, OffsetDateTime};

static INIT: Once = Once::new();

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "correct horse";

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("forms_client=debug".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub query: Option<String>,
}

#[derive(Default)]
struct Backend {
    issued: u32,
    expires_in: i64,
    refresh_disabled: bool,
    valid_access: HashSet<String>,
    valid_refresh: HashSet<String>,
    token_grants: Vec<HashMap<String, String>>,
    requests: Vec<RecordedRequest>,
    scripted: VecDeque<(StatusCode, String)>,
}

/// In-process stand-in for the forms backend.
#[derive(Clone)]
pub struct MockBackend {
    pub url: Url,
    state: Arc<Mutex<Backend>>,
}

impl MockBackend {
    pub async fn spawn() -> Self {
        setup_tracing();
        let state = Arc::new(Mutex::new(Backend { expires_in: 3600, ..Backend::default() }));

        let app = Router::new()
            .route("/api/connect/token", post(token_endpoint))
            .route("/api/forms", get(list_forms).post(create_form))
            .route("/api/forms/{id}", get(get_form).put(update_form).delete(delete_form))
            .route("/api/categories", get(list_categories))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { url: Url::parse(&format!("http://{addr}/")).unwrap(), state }
    }

    pub fn client(&self, store: Arc<dyn SecureStore>) -> FormsClient {
        let api = ApiConfig {
            base_url: self.url.clone(),
            request_timeout_secs: 5,
            user_agent: "forms-client-tests".to_string(),
        };
        ClientBuilder::new(api, AuthConfig::default()).with_store(store).build().unwrap()
    }

    /// Makes the backend accept a token pair that was not issued through a grant.
    pub fn accept(&self, access: &str, refresh: &str) {
        let mut backend = self.state.lock().unwrap();
        backend.valid_access.insert(access.to_string());
        backend.valid_refresh.insert(refresh.to_string());
    }

    /// Server-side invalidation of every outstanding access token.
    pub fn revoke_access_tokens(&self) {
        self.state.lock().unwrap().valid_access.clear();
    }

    pub fn disable_refresh(&self) {
        self.state.lock().unwrap().refresh_disabled = true;
    }

    pub fn set_expires_in(&self, seconds: i64) {
        self.state.lock().unwrap().expires_in = seconds;
    }

    /// Queues a canned response for the next resource request, bypassing auth checks.
    pub fn script(&self, status: StatusCode, body: &str) {
        self.state.lock().unwrap().scripted.push_back((status, body.to_string()));
    }

    pub fn token_grants(&self) -> Vec<HashMap<String, String>> {
        self.state.lock().unwrap().token_grants.clone()
    }

    pub fn grant_count(&self, grant_type: &str) -> usize {
        self.token_grants().iter().filter(|g| g.get("grant_type").map(String::as_str) == Some(grant_type)).count()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

pub fn token(access: &str, refresh: &str, expires_in: i64) -> AuthToken {
    AuthToken {
        access_token: access.to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: Some(refresh.to_string()),
        expires_at: OffsetDateTime::now_utc() + Duration::seconds(expires_in),
    }
}

pub async fn seeded_store(token: &AuthToken) -> Arc<MemorySecureStore> {
    let store = Arc::new(MemorySecureStore::new());
    store.set(TOKEN_STORAGE_KEY, &serde_json::to_string(token).unwrap()).await.unwrap();
    store
}

pub fn sample_form(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "title": format!("Inspection #{id}"),
        "categoryId": 5,
        "status": "Submitted",
        "totalScore": 40 + id,
        "createdBy": "alice",
        "createdAt": "2026-02-14T10:00:00Z",
        "updatedAt": null,
        "data": {"answers": []}
    })
}

type Shared = Arc<Mutex<Backend>>;

fn issue(backend: &mut Backend) -> serde_json::Value {
    backend.issued += 1;
    let access = format!("access-{}", backend.issued);
    let refresh = format!("refresh-{}", backend.issued);
    backend.valid_access.insert(access.clone());
    backend.valid_refresh.insert(refresh.clone());
    json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": backend.expires_in,
        "refresh_token": refresh,
    })
}

async fn token_endpoint(State(state): State<Shared>, Form(params): Form<HashMap<String, String>>) -> Response {
    let mut backend = state.lock().unwrap();
    backend.token_grants.push(params.clone());

    let accepted = match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            params.get("username").map(String::as_str) == Some(USERNAME)
                && params.get("password").map(String::as_str) == Some(PASSWORD)
        }
        Some("refresh_token") => {
            !backend.refresh_disabled
                && params.get("refresh_token").is_some_and(|rt| backend.valid_refresh.remove(rt.as_str()))
        }
        _ => false,
    };

    if accepted {
        Json(issue(&mut backend)).into_response()
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))).into_response()
    }
}

/// Records the request and decides whether it may proceed.
fn admit(state: &Shared, method: &str, path: String, headers: &HeaderMap, query: Option<String>) -> Option<Response> {
    let mut backend = state.lock().unwrap();
    let authorization = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_string);
    backend.requests.push(RecordedRequest { method: method.to_string(), path, authorization: authorization.clone(), query });

    if let Some((status, body)) = backend.scripted.pop_front() {
        return Some((status, [(header::CONTENT_TYPE, "application/json")], body).into_response());
    }

    let authorized = authorization
        .as_deref()
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|access| backend.valid_access.contains(access));
    if authorized { None } else { Some(StatusCode::UNAUTHORIZED.into_response()) }
}

async fn list_forms(State(state): State<Shared>, headers: HeaderMap, RawQuery(query): RawQuery) -> Response {
    if let Some(rejection) = admit(&state, "GET", "/api/forms".to_string(), &headers, query) {
        return rejection;
    }
    Json(json!({ "hasNext": true, "items": [sample_form(1), sample_form(2)] })).into_response()
}

async fn create_form(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<serde_json::Value>) -> Response {
    if let Some(rejection) = admit(&state, "POST", "/api/forms".to_string(), &headers, None) {
        return rejection;
    }
    let mut form = sample_form(99);
    form["title"] = body["title"].clone();
    form["categoryId"] = body["categoryId"].clone();
    form["status"] = json!("Draft");
    (StatusCode::CREATED, Json(form)).into_response()
}

async fn get_form(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Some(rejection) = admit(&state, "GET", format!("/api/forms/{id}"), &headers, None) {
        return rejection;
    }
    if id == 404 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "code": "FORM_NOT_FOUND",
                "message": "Form 404 does not exist",
                "detailedMessage": null,
                "helpUrl": "https://help.example.com/forms",
                "details": []
            })),
        )
            .into_response();
    }
    Json(sample_form(id)).into_response()
}

async fn update_form(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if let Some(rejection) = admit(&state, "PUT", format!("/api/forms/{id}"), &headers, None) {
        return rejection;
    }
    let mut form = sample_form(id);
    for field in ["title", "status", "data"] {
        if let Some(value) = body.get(field) {
            form[field] = value.clone();
        }
    }
    form["updatedAt"] = json!("2026-02-15T09:00:00Z");
    Json(form).into_response()
}

async fn delete_form(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Some(rejection) = admit(&state, "DELETE", format!("/api/forms/{id}"), &headers, None) {
        return rejection;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_categories(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Some(rejection) = admit(&state, "GET", "/api/categories".to_string(), &headers, None) {
        return rejection;
    }
    Json(json!([{ "id": 5, "name": "Safety" }, { "id": 6, "name": "Maintenance" }])).into_response()
}
