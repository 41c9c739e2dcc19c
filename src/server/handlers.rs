//! REST handlers.

use std::path::PathBuf;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use beads_view::chain::{self, DEFAULT_MAX_DEPTH};
use beads_view::source::read_resolved;
use beads_view::{DependencyChain, Issue, SourceKind};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::AppState;
use crate::error::AbacusError;
use crate::registry::Project;

/// API error response (always JSON).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: msg.into(),
            code: "bad_request",
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: msg.into(),
            code: "not_found",
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            error: msg.into(),
            code: "conflict",
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: msg.into(),
            code: "internal_error",
        }
    }
}

impl From<AbacusError> for ApiError {
    fn from(err: AbacusError) -> Self {
        match err {
            AbacusError::ProjectNotFound { .. } | AbacusError::IssueNotFound { .. } => {
                Self::not_found(err.to_string())
            }
            AbacusError::PathNotFound(_) | AbacusError::NotBeadsProject(_) => {
                Self::bad_request(err.to_string())
            }
            AbacusError::AlreadyRegistered(_) => Self::conflict(err.to_string()),
            other => {
                error!("Request failed: {other}");
                Self::internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Registered project plus its current issue count.
#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub exists: bool,
    pub issue_count: usize,
}

#[derive(Debug, Serialize)]
pub struct IssueList {
    pub project: Project,
    pub source: SourceKind,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddProject {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChainQuery {
    pub max_depth: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct Accepted {
    pub status: &'static str,
}

fn project(state: &AppState, id: u64) -> ApiResult<Project> {
    state
        .registry()
        .get(id)
        .cloned()
        .ok_or_else(|| AbacusError::ProjectNotFound { id }.into())
}

async fn read_project(project: &Project) -> ApiResult<(SourceKind, Vec<Issue>)> {
    let path = project.path.clone();
    tokio::task::spawn_blocking(move || read_resolved(&path))
        .await
        .map_err(|e| ApiError::internal(format!("read task failed: {e}")))
}

/// GET /api/projects
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let projects: Vec<Project> = state.registry().all().into_iter().cloned().collect();

    let mut summaries = Vec::with_capacity(projects.len());
    for project in projects {
        let exists = project.path.is_dir();
        let issue_count = if exists {
            read_project(&project).await?.1.len()
        } else {
            0
        };
        summaries.push(ProjectSummary {
            project,
            exists,
            issue_count,
        });
    }
    Ok(Json(summaries))
}

/// POST /api/projects
pub async fn add_project(
    State(state): State<AppState>,
    body: Result<Json<AddProject>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let Json(body) = body?;
    let path = body
        .path
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| ApiError::bad_request("Project path is required"))?;
    let project = state.registry().add(&path)?;
    if !state.coordinator.watch(project.path.clone()).await {
        warn!(project = %project.path.display(), "Registered project is not being watched");
    }
    Ok((StatusCode::CREATED, Json(project)))
}

/// DELETE /api/projects/{id}
pub async fn remove_project(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    let project = project(&state, id)?;
    state.coordinator.unwatch(project.path.clone()).await;
    if !state.registry().remove(id)? {
        return Err(AbacusError::ProjectNotFound { id }.into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/projects/{id}/issues
pub async fn list_issues(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<IssueList>> {
    let Path(id) = id?;
    let project = project(&state, id)?;
    let (source, issues) = read_project(&project).await?;
    Ok(Json(IssueList {
        project,
        source,
        issues,
    }))
}

/// GET /api/projects/{id}/issues/{issue_id}/chain
pub async fn dependency_chain(
    State(state): State<AppState>,
    path: Result<Path<(u64, String)>, PathRejection>,
    query: Result<Query<ChainQuery>, QueryRejection>,
) -> ApiResult<Json<DependencyChain>> {
    let Path((id, issue_id)) = path?;
    let Query(query) = query?;
    let project = project(&state, id)?;
    let (_, issues) = read_project(&project).await?;
    let max_depth = query.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
    chain::resolve(&issues, &issue_id, max_depth)
        .map(Json)
        .ok_or_else(|| AbacusError::IssueNotFound { id: issue_id }.into())
}

/// POST /api/projects/{id}/refresh
pub async fn refresh_project(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<(StatusCode, Json<Accepted>)> {
    let Path(id) = id?;
    let project = project(&state, id)?;
    state.coordinator.notify_changed(project.path);
    Ok((StatusCode::ACCEPTED, Json(Accepted { status: "accepted" })))
}
