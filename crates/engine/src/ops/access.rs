use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, HouseholdRole, ResultEngine, households, memberships, payments, users};

use super::Engine;

impl Engine {
    pub(super) async fn require_household(
        &self,
        db: &DatabaseTransaction,
        household_id: &str,
    ) -> ResultEngine<households::Model> {
        households::Entity::find_by_id(household_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("household not exists".to_string()))
    }

    /// Like [`Self::require_household`] but refuses archived households,
    /// for mutating operations.
    pub(super) async fn require_active_household(
        &self,
        db: &DatabaseTransaction,
        household_id: &str,
    ) -> ResultEngine<households::Model> {
        let model = self.require_household(db, household_id).await?;
        if model.archived {
            return Err(EngineError::Validation(
                "household is archived".to_string(),
            ));
        }
        Ok(model)
    }

    pub(super) async fn member_role(
        &self,
        db: &DatabaseTransaction,
        household_id: &str,
        user_id: &str,
    ) -> ResultEngine<Option<HouseholdRole>> {
        let row = memberships::Entity::find_by_id((
            household_id.to_string(),
            user_id.to_string(),
        ))
        .one(db)
        .await?;
        row.as_ref()
            .map(|m| HouseholdRole::try_from(m.role.as_str()))
            .transpose()
    }

    /// Non-members are masked as "household not exists" so the API never
    /// reveals foreign household ids.
    pub(super) async fn require_member(
        &self,
        db: &DatabaseTransaction,
        household_id: &str,
        user_id: &str,
    ) -> ResultEngine<HouseholdRole> {
        self.member_role(db, household_id, user_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("household not exists".to_string()))
    }

    /// Children cannot send or receive payments.
    pub(super) async fn require_adult_member(
        &self,
        db: &DatabaseTransaction,
        household_id: &str,
        user_id: &str,
        label: &str,
    ) -> ResultEngine<HouseholdRole> {
        let role = self.require_member(db, household_id, user_id).await?;
        if !role.is_adult() {
            return Err(EngineError::Validation(format!(
                "{label} must not be a child member"
            )));
        }
        Ok(role)
    }

    pub(super) async fn require_user_exists(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<()> {
        let exists = users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .is_some();
        if !exists {
            return Err(EngineError::KeyNotFound("user not exists".to_string()));
        }
        Ok(())
    }

    /// Fetches a payment and verifies it belongs to the household;
    /// mismatches are reported as "payment not exists".
    pub(super) async fn require_payment(
        &self,
        db: &DatabaseTransaction,
        household_id: &str,
        payment_id: Uuid,
    ) -> ResultEngine<payments::Model> {
        payments::Entity::find_by_id(payment_id.to_string())
            .filter(payments::Column::HouseholdId.eq(household_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("payment not exists".to_string()))
    }

    /// Ordered member list for a household, in membership insertion order.
    pub(super) async fn household_members(
        &self,
        db: &DatabaseTransaction,
        household_id: &str,
    ) -> ResultEngine<Vec<memberships::Model>> {
        memberships::Entity::find()
            .filter(memberships::Column::HouseholdId.eq(household_id.to_string()))
            .all(db)
            .await
            .map_err(Into::into)
    }
}
