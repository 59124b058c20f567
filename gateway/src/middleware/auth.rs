//! Authentication middleware (spec §4.5): resolves the project from the path,
//! authenticates the bearer token against it, and stashes the result as
//! [`AuthContext`] for handlers to authorize against.

use std::collections::{HashMap, HashSet};

use axum::{
    extract::{FromRequestParts, Path, Query, Request},
    middleware::Next,
    response::Response,
    Extension,
};
use uuid::Uuid;

use crate::state::AppState;
use crate::types::{is_valid_segment, AppError, Environment};

/// The authenticated caller, scoped to the project named in the request path.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub project_uuid: Uuid,
    pub project_name: String,
    pub username: String,
    pub roles: HashSet<String>,
}

/// Runs for every `/v1/projects/{project}/...` route. Validates the `project` path
/// segment, authenticates the `?key=` token, and inserts [`AuthContext`] into the
/// request extensions for handlers to read. Per-route role authorization and
/// per-resource ACL checks happen in the handlers themselves (spec §4.5).
pub async fn auth_middleware(
    Extension(state): Extension<AppState>,
    Extension(environment): Extension<Environment>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();

    let Path(path_params) = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| AppError::invalid_argument("missing path parameters"))?;

    let project_name = path_params
        .get("project")
        .ok_or_else(|| AppError::invalid_argument("missing project path segment"))?
        .clone();

    if !is_valid_segment(&project_name) {
        return Err(AppError::invalid_argument("project name must match [A-Za-z0-9_-]+"));
    }

    let Query(query) = Query::<HashMap<String, String>>::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| AppError::invalid_argument("invalid query string"))?;
    let token = query.get("key").cloned().unwrap_or_default();

    let project = state
        .store
        .query_projects(None, Some(&project_name))
        .await
        .map_err(AppError::from)?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::not_found(project_name.clone()))?;

    let (roles, username) = if environment.disable_auth() {
        let mut roles = HashSet::new();
        roles.insert(pubsub_types::roles::ADMIN.to_string());
        (roles, token.clone())
    } else {
        state.auth_gate.authenticate(project.uuid, &token).await
    };

    if roles.is_empty() {
        return Err(AppError::unauthorized());
    }

    parts.extensions.insert(AuthContext {
        project_uuid: project.uuid,
        project_name: project.name,
        username,
        roles,
    });

    let request = Request::from_parts(parts, body);
    Ok(next.run(request).await)
}
