//! In-memory stand-in for the FashionBrain backend.
//!
//! Serves the same routes the client calls, backed by a small user store
//! and a fixed product catalogue. A few extra routes under `/_test/` produce
//! the awkward responses client tests need (slow answers, malformed bodies,
//! non-JSON errors) or expose what the backend received (request headers,
//! recorded actions).
//!
//! Signup behaviour worth knowing:
//! - an email containing `+confirm` is refused with
//!   `400 {"detail": "Email confirmation required, check your email"}`
//! - a duplicate email is refused with `400`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Message used to refuse signups that need an email confirmation.
pub const CONFIRMATION_DETAIL: &str = "Email confirmation required, check your email";

/// Emails containing this marker trigger the confirmation refusal.
pub const CONFIRM_MARKER: &str = "+confirm";

#[derive(Debug, Clone)]
struct StoredUser {
    id: String,
    email: String,
    password: String,
    name: String,
    onboarding_completed: bool,
}

impl StoredUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "name": self.name,
            "onboarding_completed": self.onboarding_completed,
        })
    }
}

#[derive(Debug, Default)]
struct Store {
    users: HashMap<String, StoredUser>,
    tokens: HashMap<String, String>,
    actions: Vec<(String, String, String)>,
    next_id: u64,
}

impl Store {
    fn issue_token(&mut self, email: &str) -> String {
        self.next_id += 1;
        let token = format!("token-{}", self.next_id);
        self.tokens.insert(token.clone(), email.to_string());
        token
    }
}

type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/feed", get(feed))
        .route("/action", post(action))
        .route("/onboarding/complete", post(complete_onboarding))
        .route("/recommend", post(recommend))
        .route("/upload-image", post(upload_image))
        .route("/onboarding/inspo-image", post(upload_image))
        .route("/_test/slow", get(slow).post(slow))
        .route("/_test/malformed", get(malformed).post(malformed))
        .route("/_test/plain-error", get(plain_error))
        .route("/_test/message-error", get(message_error).post(message_error))
        .route("/_test/echo-headers", get(echo_headers).post(echo_headers))
        .route("/_test/actions", get(recorded_actions))
        .with_state(db)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

/// Resolve the bearer token to the signed-in user's email.
async fn authenticate(db: &Db, headers: &HeaderMap) -> Result<StoredUser, Response> {
    let unauthorized = || detail(StatusCode::UNAUTHORIZED, "Not authenticated");

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;

    let store = db.read().await;
    store
        .tokens
        .get(token)
        .and_then(|email| store.users.get(email))
        .cloned()
        .ok_or_else(unauthorized)
}

#[derive(Deserialize)]
pub struct SignupBody {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

async fn signup(State(db): State<Db>, Json(input): Json<SignupBody>) -> Response {
    if input.email.contains(CONFIRM_MARKER) {
        return detail(StatusCode::BAD_REQUEST, CONFIRMATION_DETAIL);
    }

    let mut store = db.write().await;
    if store.users.contains_key(&input.email) {
        return detail(
            StatusCode::BAD_REQUEST,
            "An account with this email already exists",
        );
    }

    store.next_id += 1;
    let name = input
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| input.email.split('@').next().unwrap_or_default().to_string());
    let user = StoredUser {
        id: format!("user-{}", store.next_id),
        email: input.email.clone(),
        password: input.password,
        name,
        onboarding_completed: false,
    };
    let body = user.to_json();
    store.users.insert(input.email.clone(), user);
    let token = store.issue_token(&input.email);

    Json(json!({
        "success": true,
        "user": body,
        "access_token": token,
        "refresh_token": format!("refresh-{}", token),
    }))
    .into_response()
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

async fn login(State(db): State<Db>, Json(input): Json<LoginBody>) -> Response {
    let mut store = db.write().await;
    let user = match store.users.get(&input.email) {
        Some(user) if user.password == input.password => user.to_json(),
        _ => return detail(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    };
    let token = store.issue_token(&input.email);

    Json(json!({
        "success": true,
        "access_token": token,
        "user": user,
    }))
    .into_response()
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Response {
    match authenticate(&db, &headers).await {
        Ok(user) => Json(json!({ "user": user.to_json() })).into_response(),
        Err(resp) => resp,
    }
}

#[derive(Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub num_outfits: Option<usize>,
}

async fn feed(State(db): State<Db>, headers: HeaderMap, Query(q): Query<FeedQuery>) -> Response {
    if let Err(resp) = authenticate(&db, &headers).await {
        return resp;
    }

    let outfits: Vec<Value> = (0..q.num_outfits.unwrap_or(10)).map(outfit).collect();
    Json(json!({
        "success": true,
        "count": outfits.len(),
        "outfits": outfits,
    }))
    .into_response()
}

async fn action(State(db): State<Db>, headers: HeaderMap, Json(input): Json<Value>) -> Response {
    let user = match authenticate(&db, &headers).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let action_type = input
        .get("action_type")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !matches!(action_type, "save" | "skip" | "shop") {
        return detail(
            StatusCode::BAD_REQUEST,
            "action_type must be one of: save, skip, shop",
        );
    }

    let product_ids: Vec<String> = input
        .get("product_ids")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .split(',')
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    if product_ids.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "product_ids required");
    }

    let mut store = db.write().await;
    for pid in &product_ids {
        store
            .actions
            .push((user.id.clone(), pid.clone(), action_type.to_string()));
    }

    let what = if product_ids.len() > 1 { "Outfit" } else { "Item" };
    Json(json!({
        "success": true,
        "message": format!("{} {} recorded", what, action_type),
    }))
    .into_response()
}

async fn complete_onboarding(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> Response {
    let user = match authenticate(&db, &headers).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let completed = input
        .get("onboarding_completed")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut store = db.write().await;
    if let Some(stored) = store.users.get_mut(&user.email) {
        stored.onboarding_completed = completed;
    }

    Json(json!({ "success": true, "message": "Onboarding saved" })).into_response()
}

async fn recommend(State(db): State<Db>, headers: HeaderMap, Json(input): Json<Value>) -> Response {
    if let Err(resp) = authenticate(&db, &headers).await {
        return resp;
    }

    let text = |key: &str| input.get(key).and_then(Value::as_str).map(str::to_string);
    let (query, image_url) = (text("query"), text("image_url"));
    if query.is_none() && image_url.is_none() {
        return detail(
            StatusCode::BAD_REQUEST,
            "Either query or image_url must be provided",
        );
    }

    let top_k = input.get("top_k").and_then(Value::as_u64).unwrap_or(5) as usize;
    let recommendations: Vec<Value> = (0..top_k.min(3)).map(outfit).collect();
    Json(json!({
        "success": true,
        "query_type": if image_url.is_some() { "image" } else { "text" },
        "count": recommendations.len(),
        "recommendations": recommendations,
    }))
    .into_response()
}

async fn upload_image(State(db): State<Db>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    if let Err(resp) = authenticate(&db, &headers).await {
        return resp;
    }

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        return match field.bytes().await {
            Ok(bytes) => Json(json!({
                "success": true,
                "image_url": format!("https://images.example.com/{}", file_name),
                "content_type": content_type,
                "size": bytes.len(),
            }))
            .into_response(),
            Err(_) => detail(StatusCode::BAD_REQUEST, "could not read image"),
        };
    }

    detail(StatusCode::BAD_REQUEST, "image field is required")
}

#[derive(Deserialize)]
pub struct SlowQuery {
    #[serde(default)]
    pub ms: Option<u64>,
}

async fn slow(Query(q): Query<SlowQuery>) -> Json<Value> {
    let ms = q.ms.unwrap_or(1_000);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({ "slept_ms": ms }))
}

async fn malformed() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        "{\"outfits\": [",
    )
        .into_response()
}

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let value_of = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "content_type": value_of(header::CONTENT_TYPE),
        "authorization": value_of(header::AUTHORIZATION),
    }))
}

/// Every action recorded so far, oldest first.
async fn recorded_actions(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    let actions: Vec<Value> = store
        .actions
        .iter()
        .map(|(user_id, product_id, action_type)| {
            json!({
                "user_id": user_id,
                "product_id": product_id,
                "action_type": action_type,
            })
        })
        .collect();
    Json(json!({ "actions": actions }))
}

async fn plain_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "something broke").into_response()
}

async fn message_error() -> Response {
    (
        StatusCode::CONFLICT,
        Json(json!({ "message": "Conflict reported via message" })),
    )
        .into_response()
}

/// A deterministic outfit for position `n`.
fn outfit(n: usize) -> Value {
    let top = json!({
        "id": format!("top-{}", n),
        "name": format!("Linen shirt #{}", n),
        "price": 30.0 + n as f64,
        "category": "tops",
        "image_url": format!("https://images.example.com/top-{}.jpg", n),
        "affiliate_link": format!("https://shop.example.com/top-{}", n),
    });
    let bottom = json!({
        "id": format!("bottom-{}", n),
        "name": format!("Chinos #{}", n),
        "price": 45.0,
        "category": "bottoms",
    });
    json!({
        "items": [top, bottom],
        "total_price": 75.0 + n as f64,
        "outfit_type": "casual",
    })
}
