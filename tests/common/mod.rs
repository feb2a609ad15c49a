//! In-process mock of the time-clock backend used by the integration tests.
//! Every knob lives on `MockState` so a test can flip behavior between calls.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use timeclock::{ApiClient, AuthService, ClientConfig, SessionContext};

pub const USERNAME: &str = "ann";
pub const PASSWORD: &str = "secret";
pub const EMPLOYEE_ID: i64 = 1;

pub struct MockState {
    token_seq: AtomicUsize,
    valid_token: Mutex<String>,
    pub expires_in: AtomicU64,
    pub include_user_in_grant: AtomicBool,
    pub always_reject: AtomicBool,
    pub me_status: AtomicU16,

    pub login_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub logout_status: AtomicU16,
    pub refresh_calls: AtomicUsize,
    pub refresh_status: AtomicU16,
    pub refresh_delay_ms: AtomicU64,
    pub refresh_saw_bearer: AtomicBool,
    pub refresh_saw_cookie: AtomicBool,

    hits: Mutex<HashMap<&'static str, usize>>,

    pub direction: Mutex<Value>,
    pub direction_status: AtomicU16,
    pub direction_delay_ms: AtomicU64,
    pub jobs: Mutex<Vec<Value>>,
    pub shift: Mutex<Option<Value>>,
    pub shift_status: AtomicU16,
    pub clock_in_payloads: Mutex<Vec<Value>>,
    pub clock_out_payloads: Mutex<Vec<Value>>,
    pub clock_fail: Mutex<Option<(u16, String)>>,
    pub clock_delay_ms: AtomicU64,
    pub employees: Mutex<HashMap<String, Value>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            token_seq: AtomicUsize::new(0),
            valid_token: Mutex::new("tok-0".to_string()),
            expires_in: AtomicU64::new(900),
            include_user_in_grant: AtomicBool::new(true),
            always_reject: AtomicBool::new(false),
            me_status: AtomicU16::new(200),
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            logout_status: AtomicU16::new(200),
            refresh_calls: AtomicUsize::new(0),
            refresh_status: AtomicU16::new(200),
            refresh_delay_ms: AtomicU64::new(0),
            refresh_saw_bearer: AtomicBool::new(false),
            refresh_saw_cookie: AtomicBool::new(false),
            hits: Mutex::new(HashMap::new()),
            direction: Mutex::new(json!("CLOCK_IN")),
            direction_status: AtomicU16::new(200),
            direction_delay_ms: AtomicU64::new(0),
            jobs: Mutex::new(vec![job_json(1, "Cashier", 16.0), job_json(2, "Stocker", 17.5)]),
            shift: Mutex::new(None),
            shift_status: AtomicU16::new(200),
            clock_in_payloads: Mutex::new(Vec::new()),
            clock_out_payloads: Mutex::new(Vec::new()),
            clock_fail: Mutex::new(None),
            clock_delay_ms: AtomicU64::new(0),
            employees: Mutex::new(HashMap::new()),
        }
    }
}

impl MockState {
    pub fn token(&self) -> String { self.valid_token.lock().clone() }

    /// Invalidate the current token server-side, as if it had expired.
    pub fn rotate_token(&self) -> String {
        let n = self.token_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let t = format!("tok-{}", n);
        *self.valid_token.lock() = t.clone();
        t
    }

    pub fn hits(&self, name: &str) -> usize { self.hits.lock().get(name).copied().unwrap_or(0) }

    pub fn refreshes(&self) -> usize { self.refresh_calls.load(Ordering::SeqCst) }

    pub fn set_jobs(&self, jobs: Vec<Value>) { *self.jobs.lock() = jobs; }

    pub fn set_direction(&self, v: Value) { *self.direction.lock() = v; }

    /// Count the hit and check the bearer token. `Some` is the rejection to return.
    fn gate(&self, name: &'static str, headers: &HeaderMap) -> Option<Response> {
        *self.hits.lock().entry(name).or_insert(0) += 1;
        let expected = format!("Bearer {}", self.token());
        let ok = headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(expected.as_str());
        if ok && !self.always_reject.load(Ordering::SeqCst) {
            None
        } else {
            Some((StatusCode::UNAUTHORIZED, Json(json!({"message": "token expired"}))).into_response())
        }
    }
}

pub fn job_json(id: i64, title: &str, wage: f64) -> Value {
    json!({"employeeJobId": id, "jobTitle": title, "hourlyWage": wage, "departmentName": "Front"})
}

pub fn user_json() -> Value {
    json!({"id": EMPLOYEE_ID, "username": USERNAME, "role": "EMPLOYEE", "firstName": "Ann", "lastName": "Lee"})
}

fn status(code: u16) -> StatusCode { StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR) }

async fn login(State(s): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    s.login_calls.fetch_add(1, Ordering::SeqCst);
    if body.get("password").and_then(|v| v.as_str()) != Some(PASSWORD) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid username or password"}))).into_response();
    }
    let mut out = json!({"accessToken": s.token(), "expiresIn": s.expires_in.load(Ordering::SeqCst)});
    if s.include_user_in_grant.load(Ordering::SeqCst) {
        out["user"] = user_json();
    }
    let mut headers = HeaderMap::new();
    headers.insert("set-cookie", HeaderValue::from_static("refresh_token=r1; HttpOnly; Path=/"));
    (StatusCode::OK, headers, Json(out)).into_response()
}

async fn logout(State(s): State<Arc<MockState>>) -> Response {
    s.logout_calls.fetch_add(1, Ordering::SeqCst);
    (status(s.logout_status.load(Ordering::SeqCst)), Json(json!({}))).into_response()
}

async fn refresh(State(s): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    s.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if headers.contains_key("authorization") {
        s.refresh_saw_bearer.store(true, Ordering::SeqCst);
    }
    let cookie = headers.get("cookie").and_then(|v| v.to_str().ok()).unwrap_or_default();
    if cookie.contains("refresh_token=r1") {
        s.refresh_saw_cookie.store(true, Ordering::SeqCst);
    }
    let delay = s.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let code = s.refresh_status.load(Ordering::SeqCst);
    if code != 200 {
        return (status(code), Json(json!({"message": "refresh token invalid"}))).into_response();
    }
    let token = s.rotate_token();
    let mut out = json!({"accessToken": token, "expiresIn": s.expires_in.load(Ordering::SeqCst)});
    if s.include_user_in_grant.load(Ordering::SeqCst) {
        out["user"] = user_json();
    }
    Json(out).into_response()
}

async fn me(State(s): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Some(r) = s.gate("me", &headers) { return r; }
    let code = s.me_status.load(Ordering::SeqCst);
    if code != 200 {
        return (status(code), Json(json!({"message": "user lookup failed"}))).into_response();
    }
    Json(user_json()).into_response()
}

async fn item(State(s): State<Arc<MockState>>, headers: HeaderMap, Path(code): Path<u16>) -> Response {
    if let Some(r) = s.gate("items", &headers) { return r; }
    if code >= 400 {
        return (status(code), Json(json!({"message": format!("item failed with {}", code)}))).into_response();
    }
    Json(json!({"ok": true, "token": s.token()})).into_response()
}

async fn determine_action(State(s): State<Arc<MockState>>, headers: HeaderMap, Path(_id): Path<i64>) -> Response {
    if let Some(r) = s.gate("determine-action", &headers) { return r; }
    // Answer is fixed when the request arrives, so a delayed reply can go stale.
    let code = s.direction_status.load(Ordering::SeqCst);
    let body = s.direction.lock().clone();
    let delay = s.direction_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if code != 200 {
        return (status(code), Json(json!({"message": "lookup failed"}))).into_response();
    }
    Json(body).into_response()
}

async fn employee_jobs(State(s): State<Arc<MockState>>, headers: HeaderMap, Path(_id): Path<i64>) -> Response {
    if let Some(r) = s.gate("jobs", &headers) { return r; }
    Json(Value::Array(s.jobs.lock().clone())).into_response()
}

async fn active_shift(State(s): State<Arc<MockState>>, headers: HeaderMap, Path(_id): Path<i64>) -> Response {
    if let Some(r) = s.gate("shift", &headers) { return r; }
    let code = s.shift_status.load(Ordering::SeqCst);
    if code != 200 {
        return (status(code), Json(json!({"message": "shift lookup failed"}))).into_response();
    }
    match s.shift.lock().clone() {
        Some(v) => Json(v).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "No active shift"}))).into_response(),
    }
}

async fn clock_failure_or_delay(s: &MockState) -> Option<Response> {
    let delay = s.clock_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let fail = s.clock_fail.lock().clone();
    fail.map(|(code, msg)| (status(code), Json(json!({"message": msg}))).into_response())
}

async fn clock_in(State(s): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Some(r) = s.gate("clock-in", &headers) { return r; }
    if let Some(r) = clock_failure_or_delay(&s).await { return r; }
    let job_id = body.get("id").and_then(|v| v.as_i64()).unwrap_or_default();
    s.clock_in_payloads.lock().push(body);
    let title = s
        .jobs
        .lock()
        .iter()
        .find(|j| j.get("employeeJobId").and_then(|v| v.as_i64()) == Some(job_id))
        .and_then(|j| j.get("jobTitle").cloned())
        .unwrap_or(json!("Unknown"));
    *s.shift.lock() = Some(json!({"id": 77, "clockIn": chrono::Utc::now().to_rfc3339(), "jobTitle": title, "hourlyWage": 17.5}));
    s.set_direction(json!("CLOCK_OUT"));
    Json(json!({"message": "Clocked in"})).into_response()
}

async fn clock_out(State(s): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Some(r) = s.gate("clock-out", &headers) { return r; }
    if let Some(r) = clock_failure_or_delay(&s).await { return r; }
    s.clock_out_payloads.lock().push(body);
    *s.shift.lock() = None;
    s.set_direction(json!("CLOCK_IN"));
    Json(json!({"message": "Clocked out"})).into_response()
}

async fn employee_by_username(State(s): State<Arc<MockState>>, headers: HeaderMap, Path(username): Path<String>) -> Response {
    if let Some(r) = s.gate("employee-lookup", &headers) { return r; }
    match s.employees.lock().get(&username).cloned() {
        Some(e) => Json(e).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "Employee not found"}))).into_response(),
    }
}

pub struct MockBackend {
    pub state: Arc<MockState>,
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl MockBackend {
    /// Start the mock on an ephemeral localhost port.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/logout", post(logout))
            .route("/api/auth/refresh", post(refresh))
            .route("/api/auth/me", get(me))
            .route("/api/items/{code}", get(item))
            .route("/api/clock/determine-action/{id}", get(determine_action))
            .route("/api/employee-jobs/employee/{id}", get(employee_jobs))
            .route("/api/shifts/active/{id}", get(active_shift))
            .route("/api/clock/in", post(clock_in))
            .route("/api/clock/out", post(clock_out))
            .route("/api/employees/by-username/{username}", get(employee_by_username))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.expect("bind 127.0.0.1:0");
        let port = listener.local_addr().expect("local addr").port();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("mock backend error: {e:?}");
            }
        });
        Self { state, base_url: format!("http://127.0.0.1:{}/api", port), handle }
    }

    pub fn client(&self) -> ApiClient {
        let cfg = ClientConfig::new(&self.base_url).expect("valid base url");
        ApiClient::new(cfg, SessionContext::new()).expect("client")
    }

    /// Client plus auth service, already logged in as the default employee.
    pub async fn logged_in(&self) -> (ApiClient, AuthService) {
        let client = self.client();
        let auth = AuthService::new(client.clone());
        auth.login(USERNAME, PASSWORD).await.expect("login");
        (client, auth)
    }
}
