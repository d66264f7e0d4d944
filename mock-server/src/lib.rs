//! In-memory stand-in for the LoginTC admin API.
//!
//! Enforces what the real service enforces at the protocol level: the
//! `LoginTC key="..."` authorization header, the versioned media type in
//! `Accept`, and `Content-Length: 0` on `DELETE`. Failures are answered with
//! the service's `{"errors":[{"code","message"}]}` envelope.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const API_KEY: &str = "mock-api-key";
pub const MEDIA_TYPE: &str = "application/vnd.logintc.v1+json";
pub const ORGANIZATION_NAME: &str = "Mock Organization";
pub const DOMAIN_ID: &str = "9120580e94f134cb7c9f27cd1e43dbc82980e152";
pub const DOMAIN_IMAGE: &[u8] = b"\x89PNG\r\n\x1a\nmock-domain-image";

const PAGE_SIZE: usize = 50;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub domains: Vec<String>,
    pub bypasscodes: Vec<String>,
    pub hardware: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub state: String,
}

#[derive(Deserialize)]
pub struct SessionUser {
    pub id: Option<String>,
    pub username: Option<String>,
}

#[derive(Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

#[derive(Deserialize)]
pub struct CreateSession {
    pub user: SessionUser,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BypassCode {
    pub id: String,
    pub code: String,
    pub dt_expiry: Option<String>,
    pub user: String,
    pub uses_allowed: i32,
    pub uses_remaining: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBypassCode {
    #[serde(default = "single_use")]
    pub uses_allowed: i32,
    #[serde(default)]
    pub expiration_time: i32,
}

fn single_use() -> i32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareToken {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub serial_number: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub time_step: u32,
    pub sync_state: String,
    pub user: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHardwareToken {
    pub alias: Option<String>,
    pub serial_number: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub time_step: u32,
    pub seed: String,
}

#[derive(Deserialize)]
pub struct UpdateHardwareToken {
    pub alias: String,
}

#[derive(Deserialize)]
pub struct Page {
    #[serde(default = "first_page")]
    pub page: usize,
}

fn first_page() -> usize {
    1
}

/// Everything the mock server knows. Exposed so tests can act as the
/// mobile app (e.g. loading a token) between HTTP calls.
#[derive(Default)]
pub struct Store {
    pub users: HashMap<String, User>,
    pub tokens: HashMap<(String, String), Token>,
    pub sessions: HashMap<(String, String), Session>,
    pub bypass_codes: HashMap<String, BypassCode>,
    pub hardware: HashMap<String, HardwareToken>,
}

impl Store {
    /// Mark a pending token as loaded. Returns `false` when there is none.
    pub fn activate_token(&mut self, domain_id: &str, user_id: &str) -> bool {
        match self.tokens.get_mut(&(domain_id.to_string(), user_id.to_string())) {
            Some(token) => {
                token.state = "active".to_string();
                token.code = None;
                true
            }
            None => false,
        }
    }

    /// Record a user's answer to a pending session.
    pub fn answer_session(&mut self, domain_id: &str, session_id: &str, approved: bool) -> bool {
        match self.sessions.get_mut(&(domain_id.to_string(), session_id.to_string())) {
            Some(session) => {
                session.state = if approved { "approved" } else { "denied" }.to_string();
                true
            }
            None => false,
        }
    }

    fn user(&self, user_id: &str) -> Result<&User, ApiFailure> {
        self.users.get(user_id).ok_or_else(|| ApiFailure::not_found("user"))
    }

    fn domain_member(&self, domain_id: &str, user_id: &str) -> Result<&User, ApiFailure> {
        let user = self.user(user_id)?;
        if user.domains.iter().any(|d| d == domain_id) {
            Ok(user)
        } else {
            Err(ApiFailure::not_found("user"))
        }
    }

    fn user_mut(&mut self, user_id: &str) -> Result<&mut User, ApiFailure> {
        self.users.get_mut(user_id).ok_or_else(|| ApiFailure::not_found("user"))
    }

    // Unlinks the token from whichever user holds it.
    fn release_hardware(&mut self, hardware_id: &str) {
        if let Some(token) = self.hardware.get_mut(hardware_id) {
            if let Some(user) = self.users.get_mut(&token.user) {
                user.hardware.clear();
            }
            token.user.clear();
        }
    }

    fn leave_domain(&mut self, domain_id: &str, user_id: &str) {
        if let Some(user) = self.users.get_mut(user_id) {
            user.domains.retain(|d| d != domain_id);
        }
        self.tokens.remove(&(domain_id.to_string(), user_id.to_string()));
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Error answer in the service's envelope format.
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    fn not_found(resource: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            &format!("api.error.notfound.{resource}"),
            &format!("The requested {resource} was not found."),
        )
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({"errors": [{"code": self.code, "message": self.message}]});
        (self.status, Json(body)).into_response()
    }
}

pub fn app() -> Router {
    app_with_store(Db::default())
}

pub fn app_with_store(db: Db) -> Router {
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/organization", get(organization))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{user_id}", get(get_user).put(update_user).delete(delete_user))
        .route("/api/domains/{domain_id}", get(get_domain))
        .route("/api/domains/{domain_id}/image", get(domain_image))
        .route(
            "/api/domains/{domain_id}/users",
            get(list_domain_users).put(set_domain_users),
        )
        .route(
            "/api/domains/{domain_id}/users/{user_id}",
            get(get_domain_user).put(add_domain_user).delete(remove_domain_user),
        )
        .route(
            "/api/domains/{domain_id}/users/{user_id}/token",
            get(get_token).put(create_token).delete(delete_token),
        )
        .route(
            "/api/users/{user_id}/bypasscodes",
            get(list_user_bypass_codes)
                .post(create_bypass_code)
                .delete(delete_user_bypass_codes),
        )
        .route(
            "/api/bypasscodes/{bypass_code_id}",
            get(get_bypass_code).delete(delete_bypass_code),
        )
        .route(
            "/api/users/{user_id}/hardware",
            get(get_user_hardware).delete(disassociate_hardware),
        )
        .route("/api/users/{user_id}/hardware/{hardware_id}", put(associate_hardware))
        .route("/api/hardware", get(list_hardware).post(create_hardware))
        .route(
            "/api/hardware/{hardware_id}",
            get(get_hardware).put(update_hardware).delete(delete_hardware),
        )
        .route("/api/domains/{domain_id}/sessions", post(create_session))
        .route(
            "/api/domains/{domain_id}/sessions/{session_id}",
            get(get_session).delete(delete_session),
        )
        .layer(middleware::from_fn(require_client_headers))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_store(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_store(db)).await
}

async fn require_client_headers(request: Request, next: Next) -> Result<Response, ApiFailure> {
    let headers = request.headers();
    let expected_auth = format!("LoginTC key=\"{API_KEY}\"");
    if header_value(headers, header::AUTHORIZATION) != Some(expected_auth.as_str()) {
        return Err(ApiFailure::new(
            StatusCode::UNAUTHORIZED,
            "api.error.unauthorized",
            "Missing or invalid API key.",
        ));
    }

    let is_image = request.uri().path().ends_with("/image");
    let expected_accept = if is_image { "image/png" } else { MEDIA_TYPE };
    if header_value(headers, header::ACCEPT) != Some(expected_accept) {
        return Err(ApiFailure::new(
            StatusCode::NOT_ACCEPTABLE,
            "api.error.notacceptable",
            "Unsupported Accept header.",
        ));
    }

    if *request.method() == Method::DELETE && header_value(headers, header::CONTENT_LENGTH) != Some("0") {
        return Err(ApiFailure::new(
            StatusCode::LENGTH_REQUIRED,
            "api.error.lengthrequired",
            "DELETE requires Content-Length: 0.",
        ));
    }

    let mut response = next.run(request).await;
    if !is_image {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
    }
    Ok(response)
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn new_id() -> String {
    let hex = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    hex[..40].to_string()
}

fn require_domain(domain_id: &str) -> Result<(), ApiFailure> {
    if domain_id == DOMAIN_ID {
        Ok(())
    } else {
        Err(ApiFailure::not_found("domain"))
    }
}

fn paginate(mut users: Vec<User>, page: usize) -> Vec<User> {
    users.sort_by(|a, b| a.username.cmp(&b.username));
    page_of(users, page)
}

fn page_of<T>(items: Vec<T>, page: usize) -> Vec<T> {
    items
        .into_iter()
        .skip(page.saturating_sub(1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect()
}

async fn ping() -> Json<serde_json::Value> {
    Json(json!({"status": "OK"}))
}

async fn organization() -> Json<serde_json::Value> {
    Json(json!({"name": ORGANIZATION_NAME}))
}

async fn list_users(State(db): State<Db>, Query(page): Query<Page>) -> Json<Vec<User>> {
    let store = db.read().await;
    Json(paginate(store.users.values().cloned().collect(), page.page))
}

async fn create_user(State(db): State<Db>, Json(input): Json<CreateUser>) -> Result<(StatusCode, Json<User>), ApiFailure> {
    let mut store = db.write().await;
    if store.users.values().any(|u| u.username == input.username) {
        return Err(ApiFailure::new(
            StatusCode::CONFLICT,
            "api.error.conflict.user",
            "A user with that username already exists.",
        ));
    }
    let user = User {
        id: new_id(),
        username: input.username,
        email: input.email,
        name: input.name,
        domains: Vec::new(),
        bypasscodes: Vec::new(),
        hardware: String::new(),
    };
    store.users.insert(user.id.clone(), user.clone());
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(State(db): State<Db>, Path(user_id): Path<String>) -> Result<Json<User>, ApiFailure> {
    let store = db.read().await;
    store.user(&user_id).cloned().map(Json)
}

async fn update_user(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    Json(input): Json<UpdateUser>,
) -> Result<Json<User>, ApiFailure> {
    let mut store = db.write().await;
    let user = store.users.get_mut(&user_id).ok_or_else(|| ApiFailure::not_found("user"))?;
    if let Some(email) = input.email {
        user.email = email;
    }
    if let Some(name) = input.name {
        user.name = name;
    }
    Ok(Json(user.clone()))
}

async fn delete_user(State(db): State<Db>, Path(user_id): Path<String>) -> Result<StatusCode, ApiFailure> {
    let mut store = db.write().await;
    let user = store.users.remove(&user_id).ok_or_else(|| ApiFailure::not_found("user"))?;
    store.tokens.retain(|(_, u), _| u != &user_id);
    store.bypass_codes.retain(|_, code| code.user != user_id);
    if let Some(token) = store.hardware.get_mut(&user.hardware) {
        token.user.clear();
    }
    Ok(StatusCode::OK)
}

async fn get_domain(Path(domain_id): Path<String>) -> Result<Json<serde_json::Value>, ApiFailure> {
    require_domain(&domain_id)?;
    Ok(Json(json!({
        "id": DOMAIN_ID,
        "name": "Cisco ASA",
        "type": "RADIUS",
        "keyType": "PIN",
        "maxAllowedRetries": "5",
        "requestTimeout": "120",
        "activationCodeExpiration": "365",
        "requestPollingEnabled": "true",
        "bypassEnabled": "true"
    })))
}

async fn domain_image(Path(domain_id): Path<String>) -> Result<impl IntoResponse, ApiFailure> {
    require_domain(&domain_id)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], DOMAIN_IMAGE))
}

async fn list_domain_users(
    State(db): State<Db>,
    Path(domain_id): Path<String>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<User>>, ApiFailure> {
    require_domain(&domain_id)?;
    let store = db.read().await;
    let members = store
        .users
        .values()
        .filter(|u| u.domains.contains(&domain_id))
        .cloned()
        .collect();
    Ok(Json(paginate(members, page.page)))
}

async fn set_domain_users(
    State(db): State<Db>,
    Path(domain_id): Path<String>,
    Json(input): Json<Vec<CreateUser>>,
) -> Result<StatusCode, ApiFailure> {
    require_domain(&domain_id)?;
    let mut store = db.write().await;

    let mut keep = HashSet::new();
    for wanted in input {
        let existing = store
            .users
            .values()
            .find(|u| u.username == wanted.username)
            .map(|u| u.id.clone());
        let id = match existing {
            Some(id) => id,
            None => {
                let user = User {
                    id: new_id(),
                    username: wanted.username,
                    email: wanted.email,
                    name: wanted.name,
                    domains: Vec::new(),
                    bypasscodes: Vec::new(),
                    hardware: String::new(),
                };
                let id = user.id.clone();
                store.users.insert(id.clone(), user);
                id
            }
        };
        if let Some(user) = store.users.get_mut(&id) {
            if !user.domains.contains(&domain_id) {
                user.domains.push(domain_id.clone());
            }
        }
        keep.insert(id);
    }

    let dropped: Vec<String> = store
        .users
        .values()
        .filter(|u| u.domains.contains(&domain_id) && !keep.contains(&u.id))
        .map(|u| u.id.clone())
        .collect();
    for user_id in dropped {
        store.leave_domain(&domain_id, &user_id);
    }
    Ok(StatusCode::OK)
}

async fn get_domain_user(
    State(db): State<Db>,
    Path((domain_id, user_id)): Path<(String, String)>,
) -> Result<Json<User>, ApiFailure> {
    require_domain(&domain_id)?;
    let store = db.read().await;
    store.domain_member(&domain_id, &user_id).cloned().map(Json)
}

async fn add_domain_user(
    State(db): State<Db>,
    Path((domain_id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiFailure> {
    require_domain(&domain_id)?;
    let mut store = db.write().await;
    let user = store.users.get_mut(&user_id).ok_or_else(|| ApiFailure::not_found("user"))?;
    if !user.domains.contains(&domain_id) {
        user.domains.push(domain_id);
    }
    Ok(StatusCode::OK)
}

async fn remove_domain_user(
    State(db): State<Db>,
    Path((domain_id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiFailure> {
    require_domain(&domain_id)?;
    let mut store = db.write().await;
    store.domain_member(&domain_id, &user_id)?;
    store.leave_domain(&domain_id, &user_id);
    Ok(StatusCode::OK)
}

async fn get_token(
    State(db): State<Db>,
    Path((domain_id, user_id)): Path<(String, String)>,
) -> Result<Json<Token>, ApiFailure> {
    require_domain(&domain_id)?;
    let store = db.read().await;
    store.domain_member(&domain_id, &user_id)?;
    store
        .tokens
        .get(&(domain_id, user_id))
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("token"))
}

async fn create_token(
    State(db): State<Db>,
    Path((domain_id, user_id)): Path<(String, String)>,
) -> Result<Json<Token>, ApiFailure> {
    require_domain(&domain_id)?;
    let mut store = db.write().await;
    store.domain_member(&domain_id, &user_id)?;
    let token = store
        .tokens
        .entry((domain_id, user_id))
        .or_insert_with(|| Token {
            state: "pending".to_string(),
            code: Some(Uuid::new_v4().simple().to_string()[..9].to_string()),
        });
    Ok(Json(token.clone()))
}

async fn delete_token(
    State(db): State<Db>,
    Path((domain_id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiFailure> {
    require_domain(&domain_id)?;
    let mut store = db.write().await;
    store
        .tokens
        .remove(&(domain_id, user_id))
        .map(|_| StatusCode::OK)
        .ok_or_else(|| ApiFailure::not_found("token"))
}

async fn create_session(
    State(db): State<Db>,
    Path(domain_id): Path<String>,
    Json(input): Json<CreateSession>,
) -> Result<(StatusCode, Json<Session>), ApiFailure> {
    require_domain(&domain_id)?;
    let mut store = db.write().await;

    let user_id = match (input.user.id, input.user.username) {
        (Some(id), _) => id,
        (None, Some(username)) => store
            .users
            .values()
            .find(|u| u.username == username)
            .map(|u| u.id.clone())
            .ok_or_else(|| ApiFailure::not_found("user"))?,
        (None, None) => {
            return Err(ApiFailure::new(
                StatusCode::BAD_REQUEST,
                "api.error.badrequest",
                "A user id or username is required.",
            ))
        }
    };
    store.domain_member(&domain_id, &user_id)?;

    // Only a loaded token can answer a push.
    let loaded = store
        .tokens
        .get(&(domain_id.clone(), user_id))
        .is_some_and(|t| t.state == "active");
    if !loaded {
        return Err(ApiFailure::not_found("token"));
    }

    tracing::debug!(attributes = input.attributes.len(), "session created");
    let session = Session {
        id: new_id(),
        state: "pending".to_string(),
    };
    store
        .sessions
        .insert((domain_id, session.id.clone()), session.clone());
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_session(
    State(db): State<Db>,
    Path((domain_id, session_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    require_domain(&domain_id)?;
    let store = db.read().await;
    store
        .sessions
        .get(&(domain_id, session_id))
        .map(|s| Json(json!({"state": s.state})))
        .ok_or_else(|| ApiFailure::not_found("session"))
}

async fn delete_session(
    State(db): State<Db>,
    Path((domain_id, session_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiFailure> {
    require_domain(&domain_id)?;
    let mut store = db.write().await;
    store
        .sessions
        .remove(&(domain_id, session_id))
        .map(|_| StatusCode::OK)
        .ok_or_else(|| ApiFailure::not_found("session"))
}

fn bad_request(message: &str) -> ApiFailure {
    ApiFailure::new(StatusCode::BAD_REQUEST, "api.error.badrequest", message)
}

async fn create_bypass_code(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    Json(input): Json<CreateBypassCode>,
) -> Result<(StatusCode, Json<BypassCode>), ApiFailure> {
    if input.uses_allowed < 1 || input.expiration_time < 0 {
        return Err(bad_request("Invalid bypass code parameters."));
    }
    let mut store = db.write().await;
    store.user(&user_id)?;

    let code = BypassCode {
        id: new_id(),
        code: format!("{:09}", Uuid::new_v4().as_u128() % 1_000_000_000),
        dt_expiry: None,
        user: user_id.clone(),
        uses_allowed: input.uses_allowed,
        uses_remaining: input.uses_allowed,
    };
    store.user_mut(&user_id)?.bypasscodes.push(code.id.clone());
    store.bypass_codes.insert(code.id.clone(), code.clone());
    Ok((StatusCode::CREATED, Json(code)))
}

async fn list_user_bypass_codes(
    State(db): State<Db>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<BypassCode>>, ApiFailure> {
    let store = db.read().await;
    let user = store.user(&user_id)?;
    let codes = user
        .bypasscodes
        .iter()
        .filter_map(|id| store.bypass_codes.get(id).cloned())
        .collect();
    Ok(Json(codes))
}

async fn delete_user_bypass_codes(
    State(db): State<Db>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let mut store = db.write().await;
    store.user_mut(&user_id)?.bypasscodes.clear();
    store.bypass_codes.retain(|_, code| code.user != user_id);
    Ok(StatusCode::OK)
}

async fn get_bypass_code(
    State(db): State<Db>,
    Path(bypass_code_id): Path<String>,
) -> Result<Json<BypassCode>, ApiFailure> {
    let store = db.read().await;
    store
        .bypass_codes
        .get(&bypass_code_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("bypasscode"))
}

async fn delete_bypass_code(
    State(db): State<Db>,
    Path(bypass_code_id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let mut store = db.write().await;
    let code = store
        .bypass_codes
        .remove(&bypass_code_id)
        .ok_or_else(|| ApiFailure::not_found("bypasscode"))?;
    if let Some(user) = store.users.get_mut(&code.user) {
        user.bypasscodes.retain(|id| id != &bypass_code_id);
    }
    Ok(StatusCode::OK)
}

async fn create_hardware(
    State(db): State<Db>,
    Json(input): Json<CreateHardwareToken>,
) -> Result<(StatusCode, Json<HardwareToken>), ApiFailure> {
    if !matches!(input.kind.as_str(), "TOTP6" | "TOTP8") || input.seed.is_empty() || input.time_step == 0 {
        return Err(bad_request("Invalid hardware token parameters."));
    }
    let mut store = db.write().await;
    if store.hardware.values().any(|t| t.serial_number == input.serial_number) {
        return Err(ApiFailure::new(
            StatusCode::CONFLICT,
            "api.error.conflict.hardware",
            "A hardware token with that serial number already exists.",
        ));
    }
    let token = HardwareToken {
        id: new_id(),
        alias: input.alias,
        serial_number: input.serial_number,
        kind: input.kind,
        time_step: input.time_step,
        sync_state: "synced".to_string(),
        user: String::new(),
    };
    store.hardware.insert(token.id.clone(), token.clone());
    Ok((StatusCode::CREATED, Json(token)))
}

async fn list_hardware(State(db): State<Db>, Query(page): Query<Page>) -> Json<Vec<HardwareToken>> {
    let store = db.read().await;
    let mut tokens: Vec<HardwareToken> = store.hardware.values().cloned().collect();
    tokens.sort_by(|a, b| a.serial_number.cmp(&b.serial_number));
    Json(page_of(tokens, page.page))
}

async fn get_hardware(
    State(db): State<Db>,
    Path(hardware_id): Path<String>,
) -> Result<Json<HardwareToken>, ApiFailure> {
    let store = db.read().await;
    store
        .hardware
        .get(&hardware_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("hardware"))
}

async fn update_hardware(
    State(db): State<Db>,
    Path(hardware_id): Path<String>,
    Json(input): Json<UpdateHardwareToken>,
) -> Result<Json<HardwareToken>, ApiFailure> {
    let mut store = db.write().await;
    let token = store
        .hardware
        .get_mut(&hardware_id)
        .ok_or_else(|| ApiFailure::not_found("hardware"))?;
    token.alias = Some(input.alias);
    Ok(Json(token.clone()))
}

async fn delete_hardware(
    State(db): State<Db>,
    Path(hardware_id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let mut store = db.write().await;
    if !store.hardware.contains_key(&hardware_id) {
        return Err(ApiFailure::not_found("hardware"));
    }
    store.release_hardware(&hardware_id);
    store.hardware.remove(&hardware_id);
    Ok(StatusCode::OK)
}

async fn associate_hardware(
    State(db): State<Db>,
    Path((user_id, hardware_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiFailure> {
    let mut store = db.write().await;
    let previous = store.user(&user_id)?.hardware.clone();
    let holder = store
        .hardware
        .get(&hardware_id)
        .map(|t| t.user.clone())
        .ok_or_else(|| ApiFailure::not_found("hardware"))?;
    if !holder.is_empty() && holder != user_id {
        return Err(ApiFailure::new(
            StatusCode::CONFLICT,
            "api.error.conflict.hardware",
            "The hardware token is associated with another user.",
        ));
    }

    store.release_hardware(&previous);
    store.user_mut(&user_id)?.hardware = hardware_id.clone();
    if let Some(token) = store.hardware.get_mut(&hardware_id) {
        token.user = user_id;
    }
    Ok(StatusCode::OK)
}

async fn disassociate_hardware(
    State(db): State<Db>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let mut store = db.write().await;
    let hardware_id = store.user(&user_id)?.hardware.clone();
    if hardware_id.is_empty() {
        return Err(ApiFailure::not_found("hardware"));
    }
    store.release_hardware(&hardware_id);
    Ok(StatusCode::OK)
}

async fn get_user_hardware(
    State(db): State<Db>,
    Path(user_id): Path<String>,
) -> Result<Json<HardwareToken>, ApiFailure> {
    let store = db.read().await;
    let user = store.user(&user_id)?;
    store
        .hardware
        .get(&user.hardware)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("hardware"))
}
