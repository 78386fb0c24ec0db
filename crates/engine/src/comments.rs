//! Payment comment threads. Comments are append-only and stay writable
//! even on archived households.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(payment_id: Uuid, author: String, text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_id,
            author,
            text,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_comments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub payment_id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::payments::Entity",
        from = "Column::PaymentId",
        to = "super::payments::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Payments,
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Comment> for ActiveModel {
    fn from(comment: &Comment) -> Self {
        Self {
            id: ActiveValue::Set(comment.id.to_string()),
            payment_id: ActiveValue::Set(comment.payment_id.to_string()),
            author: ActiveValue::Set(comment.author.clone()),
            text: ActiveValue::Set(comment.text.clone()),
            created_at: ActiveValue::Set(comment.created_at),
        }
    }
}

impl TryFrom<Model> for Comment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::Validation("invalid comment id".to_string()))?,
            payment_id: Uuid::parse_str(&model.payment_id)
                .map_err(|_| EngineError::KeyNotFound("payment not exists".to_string()))?,
            author: model.author,
            text: model.text,
            created_at: model.created_at,
        })
    }
}
