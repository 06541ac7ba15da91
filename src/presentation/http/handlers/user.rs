//! User Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::application::dto::request::RegisterUserRequest;
use crate::application::dto::response::UserResponse;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

/// Register an alias
pub async fn register_user(
    State(state): State<AppState>,
    Json(body): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    body.validate().map_err(validation_error)?;

    let user = state.users.register(&body.alias).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Get a registered alias
pub async fn get_user(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.users.require(&alias).await?;
    Ok(Json(UserResponse::from(user)))
}
