use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    extract::Json,
    models::user::PublicUser,
    services::{projects, visits},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/check-login", get(check_login))
        .route("/projects", get(list_projects))
        .route("/projects/:id", get(get_project))
        .route("/log-visit", post(log_visit))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let user = auth::authenticate(&state, &payload.username, &payload.password).await?;
    let jar = auth::apply_session_cookie(jar, &user.username);
    Ok((
        jar,
        Json(json!({
            "status": "success",
            "message": "login successful",
            "user": PublicUser::from(&user),
        })),
    )
        .into_response())
}

async fn logout(jar: PrivateCookieJar) -> impl IntoResponse {
    (
        auth::clear_session_cookie(jar),
        Json(json!({ "status": "success", "message": "logged out" })),
    )
}

async fn check_login(current: CurrentUser) -> impl IntoResponse {
    match current.0 {
        Some(user) => Json(json!({
            "status": "success",
            "logged_in": true,
            "user": {
                "id": user.id,
                "username": user.username,
                "email": user.email,
            },
        })),
        None => Json(json!({ "status": "success", "logged_in": false })),
    }
}

async fn list_projects(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let projects = projects::list_all(&state.db).await?;
    Ok(Json(json!({ "status": "success", "projects": projects })))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let project = projects::get(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("project"))?;
    Ok(Json(json!({ "status": "success", "project": project })))
}

#[derive(Debug, Deserialize)]
struct LogVisitRequest {
    page: Option<String>,
}

async fn log_visit(
    State(state): State<AppState>,
    Json(payload): Json<LogVisitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let page = payload.page.as_deref().unwrap_or("unknown");
    visits::log(&state.db, page).await?;
    Ok(Json(json!({ "status": "success", "message": "visit logged" })))
}
