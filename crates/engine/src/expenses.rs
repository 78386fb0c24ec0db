//! Expense records: the first half of the ledger.
//!
//! An expense carries two allocation lists (who paid, who owes); the
//! invariant Σpaid = Σowed = amount is enforced at creation time and the
//! balance aggregator relies on it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, allocations};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    PendingApproval,
    Approved,
    Rejected,
}

impl ExpenseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for ExpenseStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending_approval" => Ok(Self::PendingApproval),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "invalid expense status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub household_id: String,
    pub title: String,
    pub category: Option<String>,
    pub date: DateTime<Utc>,
    pub amount_minor: i64,
    pub status: ExpenseStatus,
    pub created_by: String,
    /// Filled by detail lookups; empty on list rows.
    pub paid: Vec<allocations::Allocation>,
    pub owed: Vec<allocations::Allocation>,
}

impl Expense {
    pub fn new(
        household_id: String,
        title: String,
        category: Option<String>,
        date: DateTime<Utc>,
        amount_minor: i64,
        created_by: String,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            household_id,
            title,
            category,
            date,
            amount_minor,
            status: ExpenseStatus::Approved,
            created_by,
            paid: Vec::new(),
            owed: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub household_id: String,
    pub title: String,
    pub category: Option<String>,
    pub date: DateTimeUtc,
    pub amount_minor: i64,
    pub status: String,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::allocations::Entity")]
    Allocations,
}

impl Related<super::allocations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            household_id: ActiveValue::Set(expense.household_id.clone()),
            title: ActiveValue::Set(expense.title.clone()),
            category: ActiveValue::Set(expense.category.clone()),
            date: ActiveValue::Set(expense.date),
            amount_minor: ActiveValue::Set(expense.amount_minor),
            status: ActiveValue::Set(expense.status.as_str().to_string()),
            created_by: ActiveValue::Set(expense.created_by.clone()),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("expense not exists".to_string()))?,
            household_id: model.household_id,
            title: model.title,
            category: model.category,
            date: model.date,
            amount_minor: model.amount_minor,
            status: ExpenseStatus::try_from(model.status.as_str())?,
            created_by: model.created_by,
            paid: Vec::new(),
            owed: Vec::new(),
        })
    }
}
