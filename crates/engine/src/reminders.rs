//! Reminders: user-initiated nudges to a debtor, distinct from system
//! notifications. Either the creator or the receiver may remove one.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub creator: String,
    pub receiver: String,
    pub household_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(
        creator: String,
        receiver: String,
        household_id: String,
        message: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            creator,
            receiver,
            household_id,
            message,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reminders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub creator: String,
    pub receiver: String,
    pub household_id: String,
    pub message: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Reminder> for ActiveModel {
    fn from(reminder: &Reminder) -> Self {
        Self {
            id: ActiveValue::Set(reminder.id.to_string()),
            creator: ActiveValue::Set(reminder.creator.clone()),
            receiver: ActiveValue::Set(reminder.receiver.clone()),
            household_id: ActiveValue::Set(reminder.household_id.clone()),
            message: ActiveValue::Set(reminder.message.clone()),
            created_at: ActiveValue::Set(reminder.created_at),
        }
    }
}

impl TryFrom<Model> for Reminder {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("reminder not exists".to_string()))?,
            creator: model.creator,
            receiver: model.receiver,
            household_id: model.household_id,
            message: model.message,
            created_at: model.created_at,
        })
    }
}
