//! In-memory mock of the Openfire REST API plugin.
//!
//! Reproduces the two quirks clients have to cope with: collection fields
//! collapse to a bare value when exactly one element exists (and disappear
//! entirely when empty), and every route requires the shared secret as the
//! `Authorization` header. State lives in `BTreeMap`s so listing order is
//! deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Deserialize)]
pub struct StoredUser {
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StoredGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct MembershipPayload {
    pub groupname: Vec<String>,
}

#[derive(Deserialize, Default)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// Everything the admin endpoints can touch.
#[derive(Default)]
pub struct Directory {
    users: BTreeMap<String, StoredUser>,
    groups: BTreeMap<String, StoredGroup>,
    lockouts: BTreeSet<String>,
    memberships: BTreeMap<String, BTreeSet<String>>,
}

pub type Db = Arc<RwLock<Directory>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    secret: String,
}

pub fn app(secret: &str) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Directory::default())),
        secret: secret.to_string(),
    };
    let api = Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{username}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route(
            "/users/{username}/groups",
            get(list_user_groups).post(add_user_groups).delete(remove_user_groups),
        )
        .route("/lockouts/{username}", post(lock_user).delete(unlock_user))
        .route("/groups", get(list_groups).post(create_group))
        .route(
            "/groups/{groupname}",
            get(get_group).put(update_group).delete(delete_group),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_secret))
        .with_state(state);

    Router::new().nest("/plugins/restapi/v1", api)
}

pub async fn run(listener: TcpListener, secret: String) -> Result<(), std::io::Error> {
    axum::serve(listener, app(&secret)).await
}

async fn require_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if presented == Some(state.secret.as_str()) {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

/// Openfire collapses one-element collections to a bare value and omits
/// empty ones entirely; reproduce that shape.
fn collapse(field: &str, mut items: Vec<Value>) -> Json<Value> {
    let mut envelope = serde_json::Map::new();
    match items.len() {
        0 => {}
        1 => {
            envelope.insert(field.to_string(), items.remove(0));
        }
        _ => {
            envelope.insert(field.to_string(), Value::Array(items));
        }
    }
    Json(Value::Object(envelope))
}

// the plugin never returns passwords
fn user_value(user: &StoredUser) -> Value {
    json!({
        "username": user.username,
        "name": user.name,
        "email": user.email,
    })
}

fn group_value(group: &StoredGroup) -> Value {
    json!({
        "name": group.name,
        "description": group.description,
    })
}

// ----- users -----

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Value> {
    let directory = state.db.read().await;
    let users: Vec<Value> = directory
        .users
        .values()
        .filter(|user| match &query.search {
            Some(needle) => user.username.contains(needle.as_str()),
            None => true,
        })
        .map(user_value)
        .collect();
    collapse("user", users)
}

async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<StoredUser>,
) -> Result<StatusCode, StatusCode> {
    let mut directory = state.db.write().await;
    if directory.users.contains_key(&input.username) {
        return Err(StatusCode::CONFLICT);
    }
    directory.users.insert(input.username.clone(), input);
    Ok(StatusCode::CREATED)
}

async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let directory = state.db.read().await;
    directory
        .users
        .get(&username)
        .map(|user| Json(user_value(user)))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(input): Json<StoredUser>,
) -> Result<StatusCode, StatusCode> {
    let mut directory = state.db.write().await;
    let user = directory.users.get_mut(&username).ok_or(StatusCode::NOT_FOUND)?;
    // passwords are not changed through this endpoint
    user.name = input.name;
    user.email = input.email;
    Ok(StatusCode::OK)
}

async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let mut directory = state.db.write().await;
    if directory.users.remove(&username).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    directory.lockouts.remove(&username);
    directory.memberships.remove(&username);
    Ok(StatusCode::OK)
}

// ----- lockouts -----

async fn lock_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let mut directory = state.db.write().await;
    if !directory.users.contains_key(&username) {
        return Err(StatusCode::NOT_FOUND);
    }
    directory.lockouts.insert(username);
    Ok(StatusCode::CREATED)
}

async fn unlock_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let mut directory = state.db.write().await;
    if !directory.users.contains_key(&username) {
        return Err(StatusCode::NOT_FOUND);
    }
    directory.lockouts.remove(&username);
    Ok(StatusCode::OK)
}

// ----- groups -----

async fn list_groups(State(state): State<AppState>) -> Json<Value> {
    let directory = state.db.read().await;
    let groups: Vec<Value> = directory.groups.values().map(group_value).collect();
    collapse("group", groups)
}

async fn create_group(
    State(state): State<AppState>,
    Json(input): Json<StoredGroup>,
) -> Result<StatusCode, StatusCode> {
    let mut directory = state.db.write().await;
    if directory.groups.contains_key(&input.name) {
        return Err(StatusCode::CONFLICT);
    }
    directory.groups.insert(input.name.clone(), input);
    Ok(StatusCode::CREATED)
}

async fn get_group(
    State(state): State<AppState>,
    Path(groupname): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let directory = state.db.read().await;
    directory
        .groups
        .get(&groupname)
        .map(|group| Json(group_value(group)))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_group(
    State(state): State<AppState>,
    Path(groupname): Path<String>,
    Json(input): Json<StoredGroup>,
) -> Result<StatusCode, StatusCode> {
    let mut directory = state.db.write().await;
    let group = directory.groups.get_mut(&groupname).ok_or(StatusCode::NOT_FOUND)?;
    group.description = input.description;
    Ok(StatusCode::OK)
}

async fn delete_group(
    State(state): State<AppState>,
    Path(groupname): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let mut directory = state.db.write().await;
    if directory.groups.remove(&groupname).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    for members in directory.memberships.values_mut() {
        members.remove(&groupname);
    }
    Ok(StatusCode::OK)
}

// ----- membership -----

async fn list_user_groups(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let directory = state.db.read().await;
    if !directory.users.contains_key(&username) {
        return Err(StatusCode::NOT_FOUND);
    }
    let names: Vec<Value> = directory
        .memberships
        .get(&username)
        .into_iter()
        .flatten()
        .map(|name| Value::String(name.clone()))
        .collect();
    Ok(collapse("groupname", names))
}

async fn add_user_groups(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(input): Json<MembershipPayload>,
) -> Result<StatusCode, StatusCode> {
    let mut directory = state.db.write().await;
    if !directory.users.contains_key(&username) {
        return Err(StatusCode::NOT_FOUND);
    }
    directory
        .memberships
        .entry(username)
        .or_default()
        .extend(input.groupname);
    Ok(StatusCode::CREATED)
}

async fn remove_user_groups(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(input): Json<MembershipPayload>,
) -> Result<StatusCode, StatusCode> {
    let mut directory = state.db.write().await;
    if !directory.users.contains_key(&username) {
        return Err(StatusCode::NOT_FOUND);
    }
    if let Some(members) = directory.memberships.get_mut(&username) {
        for name in &input.groupname {
            members.remove(name);
        }
    }
    Ok(StatusCode::OK)
}
