//! Household and membership management.
//!
//! Thin substrate for the core: enough to create a household, put members
//! in it with roles, and archive/restore it. Everything else about
//! household CRUD lives outside the engine.

use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{EngineError, Household, HouseholdRole, ResultEngine, households, memberships};

use super::{Engine, normalize_required_text, with_tx};

impl Engine {
    /// Creates a household; the creator becomes its admin.
    pub async fn new_household(&self, name: &str, creator: &str) -> ResultEngine<Household> {
        let name = normalize_required_text(name, "household name")?;
        with_tx!(self, |db_tx| {
            (async {
                self.require_user_exists(&db_tx, creator).await?;

                let household = Household::new(name);
                households::ActiveModel::from(&household).insert(&db_tx).await?;

                let membership = memberships::ActiveModel {
                    household_id: ActiveValue::Set(household.id.clone()),
                    user_id: ActiveValue::Set(creator.to_string()),
                    role: ActiveValue::Set(HouseholdRole::Admin.as_str().to_string()),
                };
                membership.insert(&db_tx).await?;

                Ok(household)
            })
            .await
        })
    }

    /// Adds a member with a role. Admin only.
    pub async fn add_member(
        &self,
        household_id: &str,
        actor: &str,
        username: &str,
        role: HouseholdRole,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            (async {
                self.require_active_household(&db_tx, household_id).await?;
                let actor_role = self.require_member(&db_tx, household_id, actor).await?;
                if actor_role != HouseholdRole::Admin {
                    return Err(EngineError::Forbidden(
                        "only an admin can add members".to_string(),
                    ));
                }
                self.require_user_exists(&db_tx, username).await?;
                if self.member_role(&db_tx, household_id, username).await?.is_some() {
                    return Err(EngineError::Conflict(
                        "user is already a member".to_string(),
                    ));
                }

                let membership = memberships::ActiveModel {
                    household_id: ActiveValue::Set(household_id.to_string()),
                    user_id: ActiveValue::Set(username.to_string()),
                    role: ActiveValue::Set(role.as_str().to_string()),
                };
                membership.insert(&db_tx).await?;
                Ok(())
            })
            .await
        })
    }

    /// Archives a household (soft-disables mutation). Admin only.
    pub async fn archive_household(&self, household_id: &str, actor: &str) -> ResultEngine<()> {
        self.set_archived(household_id, actor, true).await
    }

    /// Restores an archived household. Admin only.
    pub async fn restore_household(&self, household_id: &str, actor: &str) -> ResultEngine<()> {
        self.set_archived(household_id, actor, false).await
    }

    async fn set_archived(
        &self,
        household_id: &str,
        actor: &str,
        archived: bool,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            (async {
                self.require_household(&db_tx, household_id).await?;
                let actor_role = self.require_member(&db_tx, household_id, actor).await?;
                if actor_role != HouseholdRole::Admin {
                    return Err(EngineError::Forbidden(
                        "only an admin can archive a household".to_string(),
                    ));
                }

                let model = households::ActiveModel {
                    id: ActiveValue::Set(household_id.to_string()),
                    archived: ActiveValue::Set(archived),
                    ..Default::default()
                };
                model.update(&db_tx).await?;
                Ok(())
            })
            .await
        })
    }
}
