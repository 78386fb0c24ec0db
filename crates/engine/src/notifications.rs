//! Persisted notifications.
//!
//! Workflow transitions create these; the real-time push on top is
//! best-effort and the stored row is what "readable on next fetch" means.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    HouseholdInvitation,
    PaidExpense,
    Payment,
    Reminder,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HouseholdInvitation => "household_invitation",
            Self::PaidExpense => "paid_expense",
            Self::Payment => "payment",
            Self::Reminder => "reminder",
        }
    }
}

impl TryFrom<&str> for ResourceType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "household_invitation" => Ok(Self::HouseholdInvitation),
            "paid_expense" => Ok(Self::PaidExpense),
            "payment" => Ok(Self::Payment),
            "reminder" => Ok(Self::Reminder),
            other => Err(EngineError::Validation(format!(
                "invalid resource type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient: String,
    pub household_id: String,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(
        recipient: String,
        household_id: String,
        resource_type: ResourceType,
        resource_id: String,
        message: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient,
            household_id,
            resource_type,
            resource_id,
            message,
            created_at,
            read: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub recipient: String,
    pub household_id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub message: String,
    pub created_at: DateTimeUtc,
    pub read: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Notification> for ActiveModel {
    fn from(notification: &Notification) -> Self {
        Self {
            id: ActiveValue::Set(notification.id.to_string()),
            recipient: ActiveValue::Set(notification.recipient.clone()),
            household_id: ActiveValue::Set(notification.household_id.clone()),
            resource_type: ActiveValue::Set(notification.resource_type.as_str().to_string()),
            resource_id: ActiveValue::Set(notification.resource_id.clone()),
            message: ActiveValue::Set(notification.message.clone()),
            created_at: ActiveValue::Set(notification.created_at),
            read: ActiveValue::Set(notification.read),
        }
    }
}

impl TryFrom<Model> for Notification {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("notification not exists".to_string()))?,
            recipient: model.recipient,
            household_id: model.household_id,
            resource_type: ResourceType::try_from(model.resource_type.as_str())?,
            resource_id: model.resource_id,
            message: model.message,
            created_at: model.created_at,
            read: model.read,
        })
    }
}
