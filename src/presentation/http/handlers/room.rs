//! Room Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use validator::Validate;

use crate::application::dto::request::{CreateRoomRequest, DeleteRoomQuery, RoomListQuery};
use crate::application::dto::response::RoomResponse;
use crate::domain::RoomType;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

/// Create a room. The owner must be a registered alias.
pub async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), AppError> {
    body.validate().map_err(validation_error)?;

    state.users.require(&body.owner_alias).await?;

    let room_type = body
        .room_type
        .as_deref()
        .map(RoomType::from_str)
        .unwrap_or_default();

    let room = state
        .directory
        .create(&body.name, &body.owner_alias, body.members, room_type)
        .await?;

    Ok((StatusCode::CREATED, Json(RoomResponse::from(room.as_ref()))))
}

/// List loaded rooms, optionally filtered by member or owner
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<RoomListQuery>,
) -> Json<Vec<RoomResponse>> {
    let rooms = match (&query.member, &query.owner) {
        (Some(member), _) => state.directory.find_by_member(member),
        (None, Some(owner)) => state.directory.find_by_owner(owner),
        (None, None) => state.directory.list(),
    };

    let rooms = rooms
        .iter()
        .filter(|room| {
            query
                .owner
                .as_deref()
                .map_or(true, |owner| room.is_owned_by(owner))
        })
        .map(|room| RoomResponse::from(room.as_ref()))
        .collect();

    Json(rooms)
}

/// Get a room, restoring it when it is not loaded
pub async fn get_room(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RoomResponse>, AppError> {
    let room = state.directory.get(&name).await?;
    Ok(Json(RoomResponse::from(room.as_ref())))
}

#[derive(Debug, Serialize)]
pub struct DeleteRoomResponse {
    pub name: String,
    pub purged_messages: Option<u64>,
}

/// Remove a room. With `?purge=true` its message log is deleted too.
pub async fn delete_room(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<DeleteRoomQuery>,
) -> Result<Json<DeleteRoomResponse>, AppError> {
    let purged_messages = if query.purge {
        Some(state.directory.purge(&name).await?)
    } else {
        state.directory.remove(&name).await?;
        None
    };

    Ok(Json(DeleteRoomResponse {
        name,
        purged_messages,
    }))
}
