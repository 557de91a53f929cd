use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_LIMIT: usize = 1000;
const STATUSES: [&str; 3] = ["todo", "in_progress", "done"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<String>,
    pub priority: u8,
    pub status: String,
    pub tags: Vec<String>,
    pub estimated_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<String>,
    pub priority: Option<i64>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
    pub estimated_minutes: Option<u32>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub tag: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

pub type Db = Arc<RwLock<Vec<Todo>>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    api_key: Option<Arc<str>>,
}

/// Router with authentication disabled.
pub fn app() -> Router {
    app_with_api_key(None)
}

/// Router that requires `X-API-Key` on `/todos` routes when `api_key` is set.
pub fn app_with_api_key(api_key: Option<&str>) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Vec::new())),
        api_key: api_key.map(Arc::from),
    };
    let todos = Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", get(get_todo).patch(update_todo).delete(delete_todo))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));
    Router::new()
        .route("/health", get(health))
        .merge(todos)
        .with_state(state)
}

pub async fn run(listener: TcpListener, api_key: Option<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_api_key(api_key.as_deref())).await
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };
    let rejection = match request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        None => Some((StatusCode::UNAUTHORIZED, "Missing API key")),
        Some(key) if key != expected => Some((StatusCode::FORBIDDEN, "Invalid API key")),
        Some(_) => None,
    };
    match rejection {
        Some((status, message)) => detail(status, message),
        None => next.run(request).await,
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

/// FastAPI-style 422: `{"detail": [{"loc": [..], "msg": .., "type": ..}]}`.
fn unprocessable(location: &str, errors: Vec<(String, String)>) -> Response {
    let entries: Vec<Value> = errors
        .into_iter()
        .map(|(field, msg)| json!({ "loc": [location, field], "msg": msg, "type": "value_error" }))
        .collect();
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": entries }))).into_response()
}

fn check_title(title: &str) -> Option<String> {
    if title.trim().is_empty() {
        Some("title must not be empty".to_string())
    } else if title.chars().count() > MAX_TITLE_LEN {
        Some(format!("title must be at most {MAX_TITLE_LEN} characters"))
    } else {
        None
    }
}

fn check_priority(priority: i64) -> Result<u8, String> {
    if (1..=5).contains(&priority) {
        Ok(priority as u8)
    } else {
        Err("ensure this value is between 1 and 5".to_string())
    }
}

fn check_status(status: &str) -> Option<String> {
    if STATUSES.contains(&status) {
        None
    } else {
        Some(format!("status must be one of {}", STATUSES.join(", ")))
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_todos(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    if params.limit.is_some_and(|limit| limit == 0 || limit > MAX_LIMIT) {
        return unprocessable(
            "query",
            vec![("limit".to_string(), format!("ensure this value is between 1 and {MAX_LIMIT}"))],
        );
    }
    let q = params.q.map(|q| q.to_lowercase());
    let todos = state.db.read().await;
    let matching: Vec<Todo> = todos
        .iter()
        .filter(|todo| q.as_ref().map_or(true, |q| todo.title.to_lowercase().contains(q)))
        .filter(|todo| params.tag.as_ref().map_or(true, |tag| todo.tags.contains(tag)))
        .filter(|todo| params.status.as_ref().map_or(true, |status| &todo.status == status))
        .take(params.limit.unwrap_or(MAX_LIMIT))
        .cloned()
        .collect();
    Json(matching).into_response()
}

async fn create_todo(State(state): State<AppState>, Json(input): Json<CreateTodo>) -> Response {
    let mut errors = Vec::new();
    if let Some(msg) = check_title(&input.title) {
        errors.push(("title".to_string(), msg));
    }
    let priority = match check_priority(input.priority.unwrap_or(3)) {
        Ok(priority) => priority,
        Err(msg) => {
            errors.push(("priority".to_string(), msg));
            3
        }
    };
    let status = input.status.unwrap_or_else(|| "todo".to_string());
    if let Some(msg) = check_status(&status) {
        errors.push(("status".to_string(), msg));
    }
    if !errors.is_empty() {
        return unprocessable("body", errors);
    }

    let todo = Todo {
        id: Uuid::new_v4(),
        title: input.title,
        description: input.description,
        due_at: input.due_at,
        priority,
        status,
        tags: input.tags.unwrap_or_default(),
        estimated_minutes: input.estimated_minutes,
        created_at: Utc::now(),
        updated_at: None,
    };
    state.db.write().await.push(todo.clone());
    (StatusCode::CREATED, Json(todo)).into_response()
}

async fn get_todo(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let todos = state.db.read().await;
    match todos.iter().find(|todo| todo.id == id) {
        Some(todo) => Json(todo.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Todo not found"),
    }
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<Map<String, Value>>,
) -> Response {
    let mut todos = state.db.write().await;
    let Some(todo) = todos.iter_mut().find(|todo| todo.id == id) else {
        return detail(StatusCode::NOT_FOUND, "Todo not found");
    };
    let mut updated = todo.clone();
    let errors = apply_patch(&mut updated, patch);
    if !errors.is_empty() {
        return unprocessable("body", errors);
    }
    updated.updated_at = Some(Utc::now());
    *todo = updated.clone();
    Json(updated).into_response()
}

/// Apply every present key; `null` clears nullable fields.
fn apply_patch(todo: &mut Todo, patch: Map<String, Value>) -> Vec<(String, String)> {
    let mut errors = Vec::new();
    for (key, value) in patch {
        let outcome = match (key.as_str(), value) {
            ("title", Value::String(title)) => match check_title(&title) {
                Some(msg) => Err(msg),
                None => {
                    todo.title = title;
                    Ok(())
                }
            },
            ("description", Value::Null) => {
                todo.description = None;
                Ok(())
            }
            ("description", Value::String(text)) => {
                todo.description = Some(text);
                Ok(())
            }
            ("due_at", Value::Null) => {
                todo.due_at = None;
                Ok(())
            }
            ("due_at", Value::String(due)) => {
                todo.due_at = Some(due);
                Ok(())
            }
            ("status", Value::String(status)) => match check_status(&status) {
                Some(msg) => Err(msg),
                None => {
                    todo.status = status;
                    Ok(())
                }
            },
            ("priority", Value::Number(n)) => match n.as_i64().map(check_priority) {
                Some(Ok(priority)) => {
                    todo.priority = priority;
                    Ok(())
                }
                Some(Err(msg)) => Err(msg),
                None => Err("value is not a valid integer".to_string()),
            },
            ("tags", Value::Null) => {
                todo.tags.clear();
                Ok(())
            }
            ("tags", Value::Array(items)) => {
                match items.into_iter().map(|item| match item {
                    Value::String(tag) => Ok(tag),
                    _ => Err("str type expected".to_string()),
                }).collect::<Result<Vec<_>, _>>() {
                    Ok(tags) => {
                        todo.tags = tags;
                        Ok(())
                    }
                    Err(msg) => Err(msg),
                }
            }
            ("estimated_minutes", Value::Null) => {
                todo.estimated_minutes = None;
                Ok(())
            }
            ("estimated_minutes", Value::Number(n)) => match n.as_u64().and_then(|m| u32::try_from(m).ok()) {
                Some(minutes) => {
                    todo.estimated_minutes = Some(minutes);
                    Ok(())
                }
                None => Err("ensure this value is greater than or equal to 0".to_string()),
            },
            (
                "title" | "description" | "due_at" | "status" | "priority" | "tags"
                | "estimated_minutes",
                _,
            ) => Err("invalid type".to_string()),
            _ => Err("extra fields not permitted".to_string()),
        };
        if let Err(msg) = outcome {
            errors.push((key, msg));
        }
    }
    errors
}

async fn delete_todo(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let mut todos = state.db.write().await;
    match todos.iter().position(|todo| todo.id == id) {
        Some(index) => {
            todos.remove(index);
            StatusCode::NO_CONTENT.into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Todo not found"),
    }
}
