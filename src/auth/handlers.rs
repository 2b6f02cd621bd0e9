use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AdminExistsResponse, LoginRequest, SignupRequest, TokenResponse},
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/admin-exists", get(admin_exists))
        .route("/signup", post(signup))
        .route("/login", post(login))
}

/// Lets the signup form decide whether to offer the admin role.
#[instrument(skip(state))]
pub async fn admin_exists(
    State(state): State<AppState>,
) -> Result<Json<AdminExistsResponse>, AppError> {
    let exists = services::admin_exists(state.users.as_ref()).await?;
    Ok(Json(AdminExistsResponse { exists }))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let Json(payload) = payload?;
    let token = services::signup(state.users.as_ref(), &state.jwt, payload).await?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(payload) = payload?;
    let token = services::login(state.users.as_ref(), &state.jwt, payload).await?;
    Ok(Json(TokenResponse { token }))
}
