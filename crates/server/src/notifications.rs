//! Notification inbox endpoints.

use api_types::notification::NotificationView;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::users;

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<NotificationView>>, ServerError> {
    let notifications = state
        .engine
        .list_notifications(&user.username)
        .await?
        .into_iter()
        .map(|notification| NotificationView {
            id: notification.id,
            message: notification.message,
            resource_type: notification.resource_type.as_str().to_string(),
            resource_id: notification.resource_id,
            household: notification.household_id,
            timestamp: notification.created_at.fixed_offset(),
            read: notification.read,
        })
        .collect();

    Ok(Json(notifications))
}

/// Removing an id that no longer exists still answers 200.
pub async fn remove(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_notification(&user.username, notification_id)
        .await?;
    Ok(StatusCode::OK)
}
