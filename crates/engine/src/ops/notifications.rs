//! Notification/reminder dispatcher.
//!
//! Workflow transitions land here: the notification row is persisted in
//! the caller's transaction, then pushed over the real-time channel after
//! commit. Push failures are logged and swallowed; the stored row is the
//! durable copy.

use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Notification, NotificationEvent, Reminder, ResourceType, ResultEngine,
    notifications, reminders,
};

use super::{Engine, normalize_required_text, with_tx};

impl Engine {
    /// Persists a notification and pushes it to the recipient if they are
    /// connected. The push is best-effort.
    pub async fn notify(
        &self,
        recipient: &str,
        household_id: &str,
        resource_type: ResourceType,
        resource_id: &str,
        message: String,
    ) -> ResultEngine<Notification> {
        let notification = with_tx!(self, |db_tx| {
            (async {
                self.require_user_exists(&db_tx, recipient).await?;
                self.require_household(&db_tx, household_id).await?;
                self.store_notification(
                    &db_tx,
                    recipient,
                    household_id,
                    resource_type,
                    resource_id,
                    message,
                )
                .await
            })
            .await
        })?;

        self.push_event(&notification);
        Ok(notification)
    }

    pub(super) async fn store_notification(
        &self,
        db: &DatabaseTransaction,
        recipient: &str,
        household_id: &str,
        resource_type: ResourceType,
        resource_id: &str,
        message: String,
    ) -> ResultEngine<Notification> {
        let notification = Notification::new(
            recipient.to_string(),
            household_id.to_string(),
            resource_type,
            resource_id.to_string(),
            message,
            Utc::now(),
        );
        notifications::ActiveModel::from(&notification)
            .insert(db)
            .await?;
        Ok(notification)
    }

    /// Pushes a stored notification over the real-time channel. Failures
    /// are logged; the notification stays readable on the next fetch.
    pub(super) fn push_event(&self, notification: &Notification) {
        let event = NotificationEvent::from(notification);
        if let Err(err) = self.publisher.publish(&notification.recipient, &event) {
            tracing::warn!(
                recipient = %notification.recipient,
                "failed to push notification: {err}"
            );
        }
    }

    /// Lists a user's notifications, newest first.
    pub async fn list_notifications(&self, recipient: &str) -> ResultEngine<Vec<Notification>> {
        let rows: Vec<notifications::Model> = notifications::Entity::find()
            .filter(notifications::Column::Recipient.eq(recipient.to_string()))
            .order_by_desc(notifications::Column::CreatedAt)
            .order_by_desc(notifications::Column::Id)
            .all(&self.database)
            .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    /// Removes a notification. Recipient only; removing an id that no
    /// longer exists succeeds.
    pub async fn remove_notification(
        &self,
        actor: &str,
        notification_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            (async {
                let Some(model) =
                    notifications::Entity::find_by_id(notification_id.to_string())
                        .one(&db_tx)
                        .await?
                else {
                    return Ok(());
                };
                if model.recipient != actor {
                    return Err(EngineError::Forbidden(
                        "only the recipient can remove a notification".to_string(),
                    ));
                }
                notifications::Entity::delete_by_id(notification_id.to_string())
                    .exec(&db_tx)
                    .await?;
                Ok(())
            })
            .await
        })
    }

    /// Creates a reminder (a nudge from a creditor to a debtor) and
    /// notifies the receiver.
    pub async fn create_reminder(
        &self,
        creator: &str,
        receiver: &str,
        household_id: &str,
        message: &str,
    ) -> ResultEngine<Reminder> {
        let message = normalize_required_text(message, "reminder message")?;
        if creator == receiver {
            return Err(EngineError::Validation(
                "creator and receiver must differ".to_string(),
            ));
        }

        let (reminder, notification) = with_tx!(self, |db_tx| {
            (async {
                self.require_household(&db_tx, household_id).await?;
                self.require_member(&db_tx, household_id, creator).await?;
                self.require_member(&db_tx, household_id, receiver).await?;

                let reminder = Reminder::new(
                    creator.to_string(),
                    receiver.to_string(),
                    household_id.to_string(),
                    message.clone(),
                    Utc::now(),
                );
                reminders::ActiveModel::from(&reminder).insert(&db_tx).await?;

                let notification = self
                    .store_notification(
                        &db_tx,
                        receiver,
                        household_id,
                        ResourceType::Reminder,
                        &reminder.id.to_string(),
                        message,
                    )
                    .await?;

                Ok::<_, EngineError>((reminder, notification))
            })
            .await
        })?;

        self.push_event(&notification);
        Ok(reminder)
    }

    /// Lists reminders the user created or received, newest first.
    pub async fn list_reminders(&self, user: &str) -> ResultEngine<Vec<Reminder>> {
        let rows: Vec<reminders::Model> = reminders::Entity::find()
            .filter(
                sea_orm::Condition::any()
                    .add(reminders::Column::Receiver.eq(user.to_string()))
                    .add(reminders::Column::Creator.eq(user.to_string())),
            )
            .order_by_desc(reminders::Column::CreatedAt)
            .order_by_desc(reminders::Column::Id)
            .all(&self.database)
            .await?;
        rows.into_iter().map(Reminder::try_from).collect()
    }

    /// Removes a reminder. Creator or receiver only; removing an id that
    /// no longer exists succeeds.
    pub async fn remove_reminder(&self, actor: &str, reminder_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            (async {
                let Some(model) = reminders::Entity::find_by_id(reminder_id.to_string())
                    .one(&db_tx)
                    .await?
                else {
                    return Ok(());
                };
                if model.creator != actor && model.receiver != actor {
                    return Err(EngineError::Forbidden(
                        "only the creator or receiver can remove a reminder".to_string(),
                    ));
                }
                reminders::Entity::delete_by_id(reminder_id.to_string())
                    .exec(&db_tx)
                    .await?;
                Ok(())
            })
            .await
        })
    }
}
