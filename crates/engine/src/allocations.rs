//! Expense allocations.
//!
//! An [`Allocation`] ties one member to a share of an expense, on either
//! the paid side (who fronted the money) or the owed side (who consumed
//! it). Amounts are positive integer minor units; the two sides of one
//! expense each sum to the expense amount.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationKind {
    Paid,
    Owed,
}

impl AllocationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Owed => "owed",
        }
    }
}

impl TryFrom<&str> for AllocationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "paid" => Ok(Self::Paid),
            "owed" => Ok(Self::Owed),
            other => Err(EngineError::Validation(format!(
                "invalid allocation kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub kind: AllocationKind,
    pub user_id: String,
    pub amount_minor: i64,
    /// Preserves the order the client supplied, used as sort tie-break.
    pub position: i32,
}

impl Allocation {
    pub fn new(
        expense_id: Uuid,
        kind: AllocationKind,
        user_id: String,
        amount_minor: i64,
        position: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            expense_id,
            kind,
            user_id,
            amount_minor,
            position,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub kind: String,
    pub user_id: String,
    pub amount_minor: i64,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Allocation> for ActiveModel {
    fn from(allocation: &Allocation) -> Self {
        Self {
            id: ActiveValue::Set(allocation.id.to_string()),
            expense_id: ActiveValue::Set(allocation.expense_id.to_string()),
            kind: ActiveValue::Set(allocation.kind.as_str().to_string()),
            user_id: ActiveValue::Set(allocation.user_id.clone()),
            amount_minor: ActiveValue::Set(allocation.amount_minor),
            position: ActiveValue::Set(allocation.position),
        }
    }
}

impl TryFrom<Model> for Allocation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::Validation("invalid allocation id".to_string()))?,
            expense_id: Uuid::parse_str(&model.expense_id)
                .map_err(|_| EngineError::KeyNotFound("expense not exists".to_string()))?,
            kind: AllocationKind::try_from(model.kind.as_str())?,
            user_id: model.user_id,
            amount_minor: model.amount_minor,
            position: model.position,
        })
    }
}
