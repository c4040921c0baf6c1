use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{
    LoginRequest, LoginResponse, MeResponse, PublicUser, RefreshRequest, RefreshResponse,
    RegisterRequest, RegisterResponse,
};
use crate::auth::extractors::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::InvalidRequest(e.body_text()))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let payload = json_body(payload)?.validate()?;
    state.auth.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Register successful".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let payload = json_body(payload)?.validate()?;
    let pair = state.auth.login(payload).await?;
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".into(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

#[instrument(skip(state, payload))]
async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let refresh_token = json_body(payload)?.validate()?;
    let access_token = state.auth.refresh(&refresh_token).await?;
    Ok(Json(RefreshResponse {
        success: true,
        access_token,
    }))
}

#[instrument(skip_all)]
async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MeResponse>, ApiError> {
    let user = state.auth.current_user(user.id).await?;
    Ok(Json(MeResponse {
        success: true,
        user: PublicUser::from(user),
    }))
}
