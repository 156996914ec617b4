//! In-process mock of the storyhub backend for client tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

pub const PASSWORD: &str = "correct-horse";

/// How long the refresh endpoint takes, so concurrent 401s overlap it
pub const REFRESH_DELAY_MS: u64 = 150;

/// How long `/slow-protected` holds its answer after checking the token
pub const SLOW_DELAY_MS: u64 = 300;

pub struct Backend {
    valid_token: Mutex<String>,
    pub refresh_fails: AtomicBool,
    pub ads_fail: AtomicBool,
    pub refresh_calls: AtomicUsize,
    pub protected_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub logout_bodies: Mutex<Vec<Value>>,
    pub seen_auth: Mutex<Vec<Option<String>>>,
    pub liked: AtomicBool,
    pub bookmarked: AtomicBool,
    pub notifications_read: AtomicBool,
}

impl Backend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            valid_token: Mutex::new("A1".to_string()),
            refresh_fails: AtomicBool::new(false),
            ads_fail: AtomicBool::new(false),
            refresh_calls: AtomicUsize::new(0),
            protected_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            logout_bodies: Mutex::new(Vec::new()),
            seen_auth: Mutex::new(Vec::new()),
            liked: AtomicBool::new(false),
            bookmarked: AtomicBool::new(false),
            notifications_read: AtomicBool::new(false),
        })
    }

    /// Make every access token issued so far invalid
    pub fn expire_access_token(&self) {
        *self.valid_token.lock().unwrap() = "expired".to_string();
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn protected_calls(&self) -> usize {
        self.protected_calls.load(Ordering::SeqCst)
    }

    pub fn seen_auth(&self) -> Vec<Option<String>> {
        self.seen_auth.lock().unwrap().clone()
    }

    fn record_auth(&self, headers: &HeaderMap) -> Option<String> {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen_auth.lock().unwrap().push(auth.clone());
        auth
    }

    fn is_authorized(&self, auth: Option<&str>) -> bool {
        let valid = self.valid_token.lock().unwrap();
        auth == Some(format!("Bearer {}", valid).as_str())
    }

    fn check_auth(&self, headers: &HeaderMap) -> Result<(), Response> {
        let auth = self.record_auth(headers);
        if self.is_authorized(auth.as_deref()) {
            Ok(())
        } else {
            Err(unauthorized())
        }
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Could not validate credentials"}))).into_response()
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(State(b): State<Arc<Backend>>, Json(body): Json<LoginBody>) -> Response {
    if body.password != PASSWORD {
        return unauthorized();
    }
    let token = b.valid_token.lock().unwrap().clone();
    (
        StatusCode::OK,
        [(header::SET_COOKIE, "refresh_token=R1; HttpOnly; Path=/")],
        Json(json!({"access_token": token, "refresh_token": "R1", "token_type": "bearer", "username": body.username})),
    )
        .into_response()
}

async fn refresh(State(b): State<Arc<Backend>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    b.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(REFRESH_DELAY_MS)).await;

    let from_body = body.get("refresh_token").and_then(Value::as_str) == Some("R1");
    let from_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |c| c.contains("refresh_token=R1"));
    if b.refresh_fails.load(Ordering::SeqCst) || !(from_body || from_cookie) {
        return unauthorized();
    }

    *b.valid_token.lock().unwrap() = "A2".to_string();
    Json(json!({"access_token": "A2", "refresh_token": "R2", "token_type": "bearer"})).into_response()
}

async fn logout(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    b.logout_calls.fetch_add(1, Ordering::SeqCst);
    b.logout_bodies.lock().unwrap().push(body);
    Json(json!({"message": "Logged out"})).into_response()
}

async fn me(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    let auth = b.record_auth(&headers);
    if !b.is_authorized(auth.as_deref()) {
        return unauthorized();
    }
    Json(json!({
        "id": 1,
        "username": "ada",
        "email": "ada@example.com",
        "role": {"id": 1, "name": "user"}
    }))
    .into_response()
}

async fn protected(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    b.protected_calls.fetch_add(1, Ordering::SeqCst);
    let auth = b.record_auth(&headers);
    if !b.is_authorized(auth.as_deref()) {
        return unauthorized();
    }
    Json(json!({"ok": true})).into_response()
}

/// Checks the token on arrival but answers late, so a refresh can finish
/// while the 401 is still on its way back
async fn slow_protected(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    b.protected_calls.fetch_add(1, Ordering::SeqCst);
    let verdict = b.check_auth(&headers);
    tokio::time::sleep(Duration::from_millis(SLOW_DELAY_MS)).await;
    match verdict {
        Ok(()) => Json(json!({"ok": true})).into_response(),
        Err(response) => response,
    }
}

async fn always_unauthorized(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    b.protected_calls.fetch_add(1, Ordering::SeqCst);
    b.record_auth(&headers);
    unauthorized()
}

async fn open(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    b.record_auth(&headers);
    Json(json!({"ok": true})).into_response()
}

async fn rejected() -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": "title is required"}))).into_response()
}

#[derive(Deserialize)]
struct Page {
    limit: u32,
    offset: u32,
}

fn ad_json(id: u32, weight: i64, active: bool) -> Value {
    json!({
        "id": id,
        "advertiser_name": format!("Advertiser {}", id),
        "ad_content": "Buy now",
        "destination_url": format!("https://example.com/{}", id),
        "image_url": null,
        "slot": "sidebar",
        "weight": weight,
        "active": active,
        "start_at": null,
        "end_at": null,
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z"
    })
}

async fn list_ads(State(b): State<Arc<Backend>>, Query(page): Query<Page>) -> Response {
    if b.ads_fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable").into_response();
    }
    Json(json!({
        "total": 2,
        "limit": page.limit,
        "offset": page.offset,
        "items": [ad_json(1, 5, false), ad_json(2, 1, true)]
    }))
    .into_response()
}

async fn get_ad(Path(id): Path<u32>) -> Response {
    if id == 2 {
        Json(ad_json(2, 1, true)).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"detail": "Ad not found"}))).into_response()
    }
}

async fn admin_create_ad(State(b): State<Arc<Backend>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let auth = b.record_auth(&headers);
    if !b.is_authorized(auth.as_deref()) {
        return unauthorized();
    }
    let mut ad = ad_json(3, body["weight"].as_i64().unwrap_or(1), true);
    ad["destination_url"] = body["destination_url"].clone();
    Json(ad).into_response()
}

async fn admin_delete_ad(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    let auth = b.record_auth(&headers);
    if !b.is_authorized(auth.as_deref()) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

fn post_json(id: u32, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "header": null,
        "content": "<p>Once upon a time</p>",
        "cover_image_url": null,
        "author_id": 1,
        "tags": [{"name": "fiction"}],
        "is_published": true,
        "created_at": "2026-02-01T09:00:00Z",
        "updated_at": "2026-02-01T09:00:00Z"
    })
}

fn comment_json(id: u32, content: &str) -> Value {
    json!({"id": id, "user_id": 1, "post_id": 12, "content": content, "created_at": "2026-02-02T09:00:00Z"})
}

fn notification_json(id: u32, is_read: bool) -> Value {
    json!({
        "id": id,
        "recipient_id": 1,
        "actor_id": 2,
        "action": "liked",
        "target_type": "post",
        "target_id": 12,
        "is_read": is_read,
        "created_at": "2026-02-03T09:00:00Z"
    })
}

async fn list_posts(Query(page): Query<Page>) -> Response {
    Json(json!({"total": 1, "limit": page.limit, "offset": page.offset, "items": [post_json(12, "Hello")]}))
        .into_response()
}

async fn my_posts(State(b): State<Arc<Backend>>, headers: HeaderMap, Query(page): Query<Page>) -> Response {
    if let Err(response) = b.check_auth(&headers) {
        return response;
    }
    let mut draft = post_json(14, "Draft");
    draft["is_published"] = json!(false);
    Json(json!({"total": 1, "limit": page.limit, "offset": page.offset, "items": [draft]})).into_response()
}

async fn get_post(Path(id): Path<u32>) -> Response {
    if id == 12 {
        Json(post_json(12, "Hello")).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"detail": "Post not found"}))).into_response()
    }
}

async fn create_post(State(b): State<Arc<Backend>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(response) = b.check_auth(&headers) {
        return response;
    }
    let Some(title) = body["title"].as_str() else {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": "title is required"}))).into_response();
    };
    (StatusCode::CREATED, Json(post_json(13, title))).into_response()
}

async fn update_post(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Path(id): Path<u32>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = b.check_auth(&headers) {
        return response;
    }
    Json(post_json(id, body["title"].as_str().unwrap_or("Hello"))).into_response()
}

async fn delete_resource(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Err(response) = b.check_auth(&headers) {
        return response;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_comments(Path(_post): Path<u32>) -> Response {
    Json(json!({"total": 1, "items": [comment_json(3, "First!")]})).into_response()
}

async fn create_comment(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Path(_post): Path<u32>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = b.check_auth(&headers) {
        return response;
    }
    let content = body["content"].as_str().unwrap_or_default();
    (StatusCode::CREATED, Json(comment_json(4, content))).into_response()
}

async fn toggle_like(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Err(response) = b.check_auth(&headers) {
        return response;
    }
    let liked = !b.liked.fetch_xor(true, Ordering::SeqCst);
    Json(json!({"success": true, "liked": liked})).into_response()
}

async fn toggle_bookmark(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Err(response) = b.check_auth(&headers) {
        return response;
    }
    let bookmarked = !b.bookmarked.fetch_xor(true, Ordering::SeqCst);
    Json(json!({"success": true, "bookmarked": bookmarked})).into_response()
}

async fn bookmarks(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Err(response) = b.check_auth(&headers) {
        return response;
    }
    let items = if b.bookmarked.load(Ordering::SeqCst) {
        vec![post_json(12, "Hello")]
    } else {
        Vec::new()
    };
    Json(json!({"items": items})).into_response()
}

#[derive(Deserialize)]
struct NotificationQuery {
    limit: u32,
    offset: u32,
    #[serde(default)]
    unread_only: bool,
}

async fn notifications(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Query(query): Query<NotificationQuery>,
) -> Response {
    if let Err(response) = b.check_auth(&headers) {
        return response;
    }
    let read = b.notifications_read.load(Ordering::SeqCst);
    let all = vec![notification_json(5, read), notification_json(6, read)];
    let matching: Vec<Value> = all
        .into_iter()
        .filter(|n| !query.unread_only || n["is_read"] == false)
        .collect();
    let items: Vec<Value> = matching
        .iter()
        .skip(query.offset as usize)
        .take(query.limit as usize)
        .cloned()
        .collect();
    Json(json!({"total": matching.len(), "limit": query.limit, "offset": query.offset, "items": items}))
        .into_response()
}

async fn read_notification(State(b): State<Arc<Backend>>, headers: HeaderMap, Path(id): Path<u32>) -> Response {
    if let Err(response) = b.check_auth(&headers) {
        return response;
    }
    Json(notification_json(id, true)).into_response()
}

async fn read_all_notifications(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Err(response) = b.check_auth(&headers) {
        return response;
    }
    let updated = if b.notifications_read.swap(true, Ordering::SeqCst) { 0 } else { 2 };
    Json(json!({"updated": updated})).into_response()
}

/// Start the mock backend on an ephemeral port and return its base URL
pub async fn spawn(backend: Arc<Backend>) -> String {
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/protected", get(protected))
        .route("/slow-protected", get(slow_protected))
        .route("/always-401", get(always_unauthorized).post(always_unauthorized))
        .route("/open", get(open))
        .route("/rejected", post(rejected))
        .route("/ads", get(list_ads))
        .route("/ads/:id", get(get_ad))
        .route("/admin/ads", post(admin_create_ad))
        .route("/admin/ads/:id", axum::routing::delete(admin_delete_ad))
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/me", get(my_posts))
        .route("/posts/:id", get(get_post).patch(update_post).delete(delete_resource))
        .route("/posts/:id/comments", get(list_comments).post(create_comment))
        .route("/posts/:id/like", post(toggle_like))
        .route("/posts/:id/bookmark", post(toggle_bookmark))
        .route("/comments/:id", axum::routing::delete(delete_resource))
        .route("/users/me/bookmarks", get(bookmarks))
        .route("/me/notifications", get(notifications))
        .route("/me/notifications/read_all", post(read_all_notifications))
        .route("/me/notifications/:id/read", post(read_notification))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend");
    let addr = listener.local_addr().expect("listener has an address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend crashed");
    });
    format!("http://{}", addr)
}
