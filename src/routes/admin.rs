use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    extract::Json,
    models::{
        project::{NewProject, ProjectPatch},
        user::{Profile, ProfilePatch},
    },
    services::{projects, users, visits},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/projects", post(create_project))
        .route("/projects/:id", put(update_project).delete(delete_project))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", post(change_password))
}

const DASHBOARD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

async fn dashboard(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let session = current.require_user()?;
    let user = users::find_by_id(&state.db, session.id)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    let project_count = projects::count(&state.db).await?;
    let total_visits = visits::count(&state.db).await?;
    let recent = visits::recent(&state.db, 5).await?;

    let last_login = user
        .last_login
        .map(|ts| ts.format(DASHBOARD_TIME_FORMAT).to_string())
        .unwrap_or_else(|| "never logged in".to_string());

    Ok(Json(json!({
        "status": "success",
        "dashboard": {
            "stats": {
                "project_count": project_count,
                "total_visits": total_visits,
                "last_login": last_login,
            },
            "recent_visits": recent
                .iter()
                .map(|visit| json!({
                    "page": visit.page,
                    "time": visit.created_at.format(DASHBOARD_TIME_FORMAT).to_string(),
                }))
                .collect::<Vec<_>>(),
        },
    })))
}

async fn create_project(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<NewProject>,
) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    let project = projects::create(&state.db, &payload).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "project created",
        "project": project,
    })))
}

async fn update_project(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ProjectPatch>,
) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    let project = projects::update(&state.db, id, &payload).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "project updated",
        "project": project,
    })))
}

async fn delete_project(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    projects::delete(&state.db, id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "project deleted",
    })))
}

async fn get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let session = current.require_user()?;
    let user = users::find_by_id(&state.db, session.id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(Json(json!({
        "status": "success",
        "user": Profile::from(&user),
    })))
}

#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    email: Option<String>,
    bio: Option<String>,
    avatar: Option<String>,
    current_password: Option<String>,
    new_password: Option<String>,
}

async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = current.require_user()?;
    let user = users::find_by_id(&state.db, session.id)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    // Validate and hash up front so an error here leaves nothing mutated.
    let new_hash = match payload.new_password.as_deref() {
        Some(new_password) => {
            let current_password = payload.current_password.as_deref().ok_or_else(|| {
                AppError::Validation("current_password is required to change the password".into())
            })?;
            Some(prepare_password_rotation(
                &user.password_hash,
                current_password,
                new_password,
            )?)
        }
        None => None,
    };

    let patch = ProfilePatch {
        email: payload.email,
        bio: payload.bio,
        avatar: payload.avatar,
    };
    users::update_profile(&state.db, user.id, &patch).await?;

    if let Some(hash) = new_hash {
        users::set_password_hash(&state.db, user.id, &hash).await?;
    }

    Ok(Json(json!({
        "status": "success",
        "message": "profile updated",
    })))
}

#[derive(Debug, Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = current.require_user()?;
    let user = users::find_by_id(&state.db, session.id)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    let hash = prepare_password_rotation(
        &user.password_hash,
        &payload.current_password,
        &payload.new_password,
    )?;
    users::set_password_hash(&state.db, user.id, &hash).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "password changed",
    })))
}

/// Verifies the current password and hashes the replacement without writing
/// anything yet.
fn prepare_password_rotation(
    stored_hash: &str,
    current_password: &str,
    new_password: &str,
) -> Result<String, AppError> {
    if !auth::verify_password(current_password, stored_hash) {
        return Err(AppError::Validation("current password is incorrect".into()));
    }
    if new_password.is_empty() {
        return Err(AppError::Validation("new_password must not be empty".into()));
    }
    auth::hash_password(new_password)
}
