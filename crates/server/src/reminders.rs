//! Reminder endpoints.

use api_types::reminder::{ReminderNew, ReminderView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::{Reminder, users};

fn reminder_view(reminder: Reminder) -> ReminderView {
    ReminderView {
        id: reminder.id,
        creator: reminder.creator,
        receiver: reminder.receiver,
        household: reminder.household_id,
        message: reminder.message,
        created_at: reminder.created_at.fixed_offset(),
    }
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<ReminderView>>, ServerError> {
    let reminders = state
        .engine
        .list_reminders(&user.username)
        .await?
        .into_iter()
        .map(reminder_view)
        .collect();

    Ok(Json(reminders))
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ReminderNew>,
) -> Result<(StatusCode, Json<ReminderView>), ServerError> {
    let reminder = state
        .engine
        .create_reminder(
            &user.username,
            &payload.receiver,
            &payload.household,
            &payload.message,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(reminder_view(reminder))))
}

/// Removing an id that no longer exists still answers 200.
pub async fn remove(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(reminder_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_reminder(&user.username, reminder_id)
        .await?;
    Ok(StatusCode::OK)
}
