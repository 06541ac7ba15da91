//! Message Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::application::dto::request::{MessageListQuery, SearchMessageQuery, SendMessageRequest};
use crate::application::dto::response::MessageResponse;
use crate::domain::Recipient;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

/// Send a message to a room. The sender must be a registered alias.
pub async fn send_message(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    body.validate().map_err(validation_error)?;

    state.users.require(&body.alias).await?;
    let room = state.directory.get(&name).await?;

    let message = room
        .send_message(&body.message, &body.alias, body.to_alias.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// Messages addressed to `alias` (default: every message), oldest first
pub async fn get_messages(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<MessageListQuery>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    query.validate().map_err(validation_error)?;

    let room = state.directory.get(&name).await?;
    let recipient = Recipient::parse(query.recipient());

    let messages = room.get_messages(&recipient, query.limit).await?;

    Ok(Json(
        messages.into_iter().map(MessageResponse::from).collect(),
    ))
}

/// Oldest message whose text matches exactly
pub async fn search_message(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<SearchMessageQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    query.validate().map_err(validation_error)?;

    let room = state.directory.get(&name).await?;
    let message = room
        .find_message(&query.text)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No message with text '{}'", query.text)))?;

    Ok(Json(MessageResponse::from(message)))
}
