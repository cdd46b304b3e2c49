//! Mock Synology DSM server for integration tests.
//!
//! Emulates the single `/webapi/entry.cgi` endpoint: cookie-based login via
//! `SYNO.API.Auth` and a FileStation subset (info, create-folder, rename,
//! delete) over an in-memory folder set. Responses use the standard DSM
//! envelope (`success`/`data`/`error`), including per-item sub-errors with
//! the extra fields inlined next to `code`, exactly as the real API sends
//! them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct DsmState {
    sessions: HashSet<String>,
    folders: HashSet<String>,
}

pub type Db = Arc<RwLock<DsmState>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(DsmState::default()));
    Router::new()
        .route("/webapi/entry.cgi", get(entry))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn entry(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let api = params.get("api").map(String::as_str).unwrap_or_default();
    let method = params.get("method").map(String::as_str).unwrap_or_default();

    if api == "SYNO.API.Auth" && method == "login" {
        return login(&db, &params).await;
    }
    if !authorized(&db, &headers).await {
        return envelope_error(119, Vec::new());
    }

    match (api, method) {
        ("SYNO.FileStation.Info", "get") => info(),
        ("SYNO.FileStation.CreateFolder", "create") => create_folder(&db, &params).await,
        ("SYNO.FileStation.Rename", "rename") => rename(&db, &params).await,
        ("SYNO.FileStation.Delete", "delete") => delete(&db, &params).await,
        _ => envelope_error(102, Vec::new()),
    }
}

async fn login(db: &Db, params: &HashMap<String, String>) -> Response {
    let account = params.get("account").map(String::as_str).unwrap_or_default();
    let passwd = params.get("passwd").map(String::as_str).unwrap_or_default();
    if account.is_empty() || passwd.is_empty() {
        return envelope_error(400, Vec::new());
    }

    let sid = Uuid::new_v4().to_string();
    db.write().await.sessions.insert(sid.clone());
    (
        [(header::SET_COOKIE, format!("id={sid}; Path=/"))],
        Json(json!({"success": true, "data": {"sid": sid}})),
    )
        .into_response()
}

async fn authorized(db: &Db, headers: &HeaderMap) -> bool {
    let Some(cookie) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let state = db.read().await;
    cookie
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .any(|(key, value)| key == "id" && state.sessions.contains(value))
}

fn info() -> Response {
    envelope_ok(json!({
        "is_manager": true,
        "support_virtual_protocol": "",
        "support_sharing": true,
        "hostname": "mock-dsm",
    }))
}

async fn create_folder(db: &Db, params: &HashMap<String, String>) -> Response {
    let (Some(paths), Some(names)) = (
        string_array(params, "folder_path"),
        string_array(params, "name"),
    ) else {
        return envelope_error(1100, vec![json!({"code": 418})]);
    };
    if paths.is_empty() || paths.len() != names.len() {
        return envelope_error(1100, vec![json!({"code": 418})]);
    }
    let force_parent = flag(params, "force_parent");

    let mut state = db.write().await;
    let mut folders = Vec::new();
    let mut item_errors = Vec::new();
    for (parent, name) in paths.iter().zip(&names) {
        let parent = parent.trim_end_matches('/');
        if !state.folders.contains(parent) {
            if !force_parent {
                item_errors.push(json!({"code": 408, "path": parent}));
                continue;
            }
            insert_with_ancestors(&mut state.folders, parent);
        }
        let created = format!("{parent}/{name}");
        state.folders.insert(created.clone());
        folders.push(json!({"path": created, "name": name, "isdir": true}));
    }

    if !item_errors.is_empty() {
        return envelope_error(1100, item_errors);
    }
    envelope_ok(json!({"folders": folders}))
}

async fn rename(db: &Db, params: &HashMap<String, String>) -> Response {
    let (Some(paths), Some(names)) =
        (string_array(params, "path"), string_array(params, "name"))
    else {
        return envelope_error(1200, vec![json!({"code": 418})]);
    };
    if paths.is_empty() || paths.len() != names.len() {
        return envelope_error(1200, vec![json!({"code": 418})]);
    }

    let mut state = db.write().await;
    let mut files = Vec::new();
    let mut item_errors = Vec::new();
    for (path, name) in paths.iter().zip(&names) {
        if !state.folders.contains(path) {
            item_errors.push(json!({"code": 408, "path": path}));
            continue;
        }
        let parent = path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("");
        let renamed = format!("{parent}/{name}");

        let prefix = format!("{path}/");
        let descendants: Vec<String> = state
            .folders
            .iter()
            .filter(|folder| folder.starts_with(&prefix))
            .cloned()
            .collect();
        state.folders.remove(path);
        for descendant in descendants {
            state.folders.remove(&descendant);
            let suffix = &descendant[path.len()..];
            state.folders.insert(format!("{renamed}{suffix}"));
        }
        state.folders.insert(renamed.clone());
        files.push(json!({"path": renamed, "name": name, "isdir": true}));
    }

    if !item_errors.is_empty() {
        return envelope_error(1200, item_errors);
    }
    envelope_ok(json!({"files": files}))
}

async fn delete(db: &Db, params: &HashMap<String, String>) -> Response {
    let Some(paths) = string_array(params, "path") else {
        return envelope_error(900, vec![json!({"code": 418})]);
    };
    let recursive = flag(params, "recursive");

    let mut state = db.write().await;
    let mut item_errors = Vec::new();
    for path in &paths {
        if !state.folders.contains(path) {
            item_errors.push(json!({"code": 408, "path": path}));
            continue;
        }
        let prefix = format!("{path}/");
        let descendants: Vec<String> = state
            .folders
            .iter()
            .filter(|folder| folder.starts_with(&prefix))
            .cloned()
            .collect();
        if !descendants.is_empty() && !recursive {
            item_errors.push(json!({"code": 400, "path": path}));
            continue;
        }
        state.folders.remove(path);
        for descendant in descendants {
            state.folders.remove(&descendant);
        }
    }

    if !item_errors.is_empty() {
        return envelope_error(900, item_errors);
    }
    envelope_ok(json!({}))
}

/// DSM sends list parameters as JSON array strings, e.g. `["a","b"]`.
fn string_array(params: &HashMap<String, String>, key: &str) -> Option<Vec<String>> {
    serde_json::from_str(params.get(key)?).ok()
}

fn flag(params: &HashMap<String, String>, key: &str) -> bool {
    params.get(key).map(String::as_str) == Some("true")
}

fn insert_with_ancestors(folders: &mut HashSet<String>, path: &str) {
    let mut acc = String::new();
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        acc.push('/');
        acc.push_str(segment);
        folders.insert(acc.clone());
    }
}

fn envelope_ok(data: Value) -> Response {
    Json(json!({"success": true, "data": data})).into_response()
}

fn envelope_error(code: i32, errors: Vec<Value>) -> Response {
    let mut error = json!({"code": code});
    if !errors.is_empty() {
        error["errors"] = Value::Array(errors);
    }
    Json(json!({"success": false, "error": error})).into_response()
}
