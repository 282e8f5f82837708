use crate::{
    errors::AppError,
    models::user::User,
    response::ApiResponse,
    services::user_service::NewUser,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserReq {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
}

/// POST `/api/v1/users`: register a user that can own videos.
#[instrument(skip(state, payload))]
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserReq>, JsonRejection>,
) -> Result<ApiResponse<User>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let user = state
        .users
        .create(NewUser {
            username: payload.username,
            email: payload.email,
            full_name: payload.full_name,
        })
        .await?;

    info!(user_id = %user.id, "user registered");
    Ok(ApiResponse::created(user, "User registered successfully"))
}

/// GET `/api/v1/users/{userId}`
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<User>, AppError> {
    let id = Uuid::parse_str(&user_id).map_err(|_| AppError::bad_request("Invalid user id"))?;
    let user = state.users.get(id).await?;
    Ok(ApiResponse::ok(user, "User fetched successfully"))
}
