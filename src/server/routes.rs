use super::AppState;
use crate::core::error::{DispatchError, Result};
use crate::core::types::{TaskRequest, TaskResponse};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    pub task: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

/// One directory entry returned by `/files`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

pub async fn run_task(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
) -> Result<Json<TaskResponse>> {
    let task = query
        .task
        .filter(|t| !t.trim().is_empty())
        .ok_or(DispatchError::MissingTaskParameter)?;
    let response = state.dispatcher.run(TaskRequest::new(task)).await?;
    Ok(Json(response))
}

pub async fn read_path(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<String> {
    let path = resolve(&state, query.path)?;
    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|e| DispatchError::from_io(e, &path))?;
    if meta.is_dir() {
        return Err(DispatchError::IsADirectory(path));
    }
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| DispatchError::from_io(e, &path))
}

pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<Vec<FileEntry>>> {
    let path = resolve(&state, query.path)?;
    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|e| DispatchError::from_io(e, &path))?;
    if !meta.is_dir() {
        return Err(DispatchError::invalid("path", "not a directory"));
    }

    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(&path).await?;
    while let Some(entry) = dir.next_entry().await? {
        let meta = entry.metadata().await?;
        entries.push(FileEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: meta.is_dir(),
            size: if meta.is_dir() { 0 } else { meta.len() },
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(entries))
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Required `path` query value, confined when configured
fn resolve(state: &AppState, path: Option<String>) -> Result<PathBuf> {
    let path = path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| DispatchError::MissingParameters(vec!["path".into()]))?;
    let dispatcher = &state.dispatcher;
    if dispatcher.config().sandbox.confine_read_endpoints {
        dispatcher.sandbox().confine(&path)
    } else {
        Ok(PathBuf::from(path))
    }
}
