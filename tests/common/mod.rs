//! In-process stand-in for the places service, built on axum.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub struct StoredFavorite {
    pub id: u64,
    pub state: String,
    pub place_name: String,
    pub category: String,
}

#[derive(Debug)]
pub struct MockState {
    pub users: HashMap<String, String>,
    pub favorites: Vec<StoredFavorite>,
    pub batches: Vec<Value>,
    pub add_calls: usize,
    pub delete_calls: usize,
    pub list_missing: bool,
    pub fail_adds: bool,
    pub places: Vec<(String, String)>,
    pub states: Vec<String>,
    next_id: u64,
}

impl Default for MockState {
    fn default() -> Self {
        MockState {
            users: HashMap::new(),
            favorites: Vec::new(),
            batches: Vec::new(),
            add_calls: 0,
            delete_calls: 0,
            list_missing: false,
            fail_adds: false,
            places: Vec::new(),
            states: vec!["California".into(), "Wyoming".into()],
            next_id: 41,
        }
    }
}

pub type Shared = Arc<Mutex<MockState>>;

pub struct MockServer {
    pub base_url: String,
    pub state: Shared,
}

impl MockServer {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new()
            .route("/api/login", post(login))
            .route("/api/register", post(register))
            .route("/api/favorites", post(add_favorite))
            .route("/api/favorites/list", get(list_favorites))
            .route("/api/favorites/:id", delete(delete_favorite))
            .route("/api/search", post(search))
            .route("/api/states", get(states))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockServer {
            base_url: format!("http://{}", address),
            state,
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Waits for a fire-and-forget batch to land.
    pub async fn wait_for_batches(&self, count: usize) -> Vec<Value> {
        for _ in 0..100 {
            let batches = self.with(|s| s.batches.clone());
            if batches.len() >= count {
                return batches;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("expected {} batch sync calls", count);
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let state = state.lock().unwrap();
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if state.users.get(username).map(String::as_str) != Some(password) {
        return error(StatusCode::UNAUTHORIZED, "Invalid username or password");
    }
    let favorites: Vec<Value> = state
        .favorites
        .iter()
        .map(|f| json!({ "id": f.id, "place_name": f.place_name, "state": f.state, "category": f.category }))
        .collect();
    Json(json!({ "favorites": favorites })).into_response()
}

async fn register(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    if state.users.contains_key(&username) {
        return error(StatusCode::BAD_REQUEST, "Username already exists");
    }
    state.users.insert(username, password);
    Json(json!({})).into_response()
}

async fn add_favorite(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    if let Some(batch) = body.get("favorites") {
        state.batches.push(batch.clone());
        return Json(json!({ "message": "synced" })).into_response();
    }

    state.add_calls += 1;
    if state.fail_adds {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add favorite");
    }
    let field = |name: &str| body[name].as_str().unwrap_or_default().to_string();
    let (st, place_name, category) = (field("state"), field("place_name"), field("category"));
    if st.is_empty() || place_name.is_empty() || category.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Missing required fields");
    }
    if state
        .favorites
        .iter()
        .any(|f| f.state == st && f.place_name == place_name)
    {
        return Json(json!({ "message": "Favorite already exists" })).into_response();
    }

    state.next_id += 1;
    let id = state.next_id;
    state.favorites.push(StoredFavorite {
        id,
        state: st,
        place_name,
        category,
    });
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Favorite added successfully", "id": id })),
    )
        .into_response()
}

async fn list_favorites(State(state): State<Shared>) -> Response {
    let state = state.lock().unwrap();
    if state.list_missing {
        return StatusCode::NOT_FOUND.into_response();
    }
    let favorites: Vec<Value> = state
        .favorites
        .iter()
        .map(|f| json!({ "id": f.id, "place_name": f.place_name, "state": f.state, "category": f.category }))
        .collect();
    Json(json!({ "favorites": favorites })).into_response()
}

async fn delete_favorite(State(state): State<Shared>, Path(id): Path<u64>) -> Response {
    let mut state = state.lock().unwrap();
    state.delete_calls += 1;
    let before = state.favorites.len();
    state.favorites.retain(|f| f.id != id);
    if state.favorites.len() == before {
        return error(StatusCode::NOT_FOUND, "Favorite not found");
    }
    Json(json!({ "message": "Favorite deleted successfully" })).into_response()
}

async fn search(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let state = state.lock().unwrap();
    if body["state"].as_str().unwrap_or_default().trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "State name is required");
    }
    let places: Vec<Value> = state
        .places
        .iter()
        .map(|(name, category)| json!({ "name": name, "category": category }))
        .collect();
    Json(json!({ "places": places })).into_response()
}

async fn states(State(state): State<Shared>) -> Response {
    let state = state.lock().unwrap();
    Json(json!({ "states": state.states })).into_response()
}
