//! Validation Utilities

use validator::ValidationErrors;

use super::error::{AppError, FieldError};
use crate::domain::{ALL_RECIPIENTS, BROADCAST_ALIAS};

/// Maximum room name length
pub const MAX_ROOM_NAME_LENGTH: usize = 64;

/// Maximum alias length
pub const MAX_ALIAS_LENGTH: usize = 32;

/// Maximum message text length in characters
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Convert validation errors to AppError
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let field_errors: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field: field.to_string(),
                message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
            })
        })
        .collect();

    let message = field_errors
        .first()
        .map(|e| format!("{}: {}", e.field, e.message))
        .unwrap_or_else(|| "Validation failed".into());

    AppError::Validation(message)
}

/// Room names are 1-64 characters of `[A-Za-z0-9_-]`.
pub fn check_room_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name.len() > MAX_ROOM_NAME_LENGTH {
        return Err(format!(
            "room name must be 1-{} characters",
            MAX_ROOM_NAME_LENGTH
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(format!("room name '{}' contains invalid characters", name));
    }
    Ok(())
}

/// Aliases are 1-32 characters without whitespace. The broadcast marker
/// and the read-all sentinel are reserved.
pub fn check_alias(alias: &str) -> Result<(), String> {
    let length = alias.chars().count();
    if length == 0 || length > MAX_ALIAS_LENGTH {
        return Err(format!("alias must be 1-{} characters", MAX_ALIAS_LENGTH));
    }
    if alias.chars().any(char::is_whitespace) {
        return Err(format!("alias '{}' must not contain whitespace", alias));
    }
    if alias == BROADCAST_ALIAS || alias == ALL_RECIPIENTS {
        return Err(format!("alias '{}' is reserved", alias));
    }
    Ok(())
}

/// An explicit addressee: a valid alias, or the broadcast marker.
pub fn check_recipient(to_alias: &str) -> Result<(), String> {
    if to_alias == BROADCAST_ALIAS {
        return Ok(());
    }
    check_alias(to_alias)
}

/// Message text must be non-blank and at most 4000 characters.
pub fn check_message_text(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("message text must not be empty".into());
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "message text exceeds {} characters",
            MAX_MESSAGE_LENGTH
        ));
    }
    Ok(())
}
