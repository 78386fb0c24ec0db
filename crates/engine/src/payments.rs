//! Payment records: the second half of the ledger.
//!
//! A payment settles debt between two members. It is born pending and is
//! approved or rejected exactly once by the payee; both outcomes are
//! terminal. Only approved payments affect balances.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, comments};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    PendingApproval,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Approved and rejected are terminal; nothing transitions out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending_approval" => Ok(Self::PendingApproval),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "invalid payment status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub household_id: String,
    pub payer: String,
    pub payee: String,
    pub amount_minor: i64,
    pub date: DateTime<Utc>,
    pub status: PaymentStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Filled by detail lookups; empty on list rows.
    pub comments: Vec<comments::Comment>,
}

impl Payment {
    pub fn new(
        household_id: String,
        payer: String,
        payee: String,
        amount_minor: i64,
        date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            household_id,
            payer,
            payee,
            amount_minor,
            date,
            status: PaymentStatus::PendingApproval,
            rejection_reason: None,
            created_at,
            comments: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub household_id: String,
    pub payer: String,
    pub payee: String,
    pub amount_minor: i64,
    pub date: DateTimeUtc,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(payment: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            household_id: ActiveValue::Set(payment.household_id.clone()),
            payer: ActiveValue::Set(payment.payer.clone()),
            payee: ActiveValue::Set(payment.payee.clone()),
            amount_minor: ActiveValue::Set(payment.amount_minor),
            date: ActiveValue::Set(payment.date),
            status: ActiveValue::Set(payment.status.as_str().to_string()),
            rejection_reason: ActiveValue::Set(payment.rejection_reason.clone()),
            created_at: ActiveValue::Set(payment.created_at),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("payment not exists".to_string()))?,
            household_id: model.household_id,
            payer: model.payer,
            payee: model.payee,
            amount_minor: model.amount_minor,
            date: model.date,
            status: PaymentStatus::try_from(model.status.as_str())?,
            rejection_reason: model.rejection_reason,
            created_at: model.created_at,
            comments: Vec::new(),
        })
    }
}
