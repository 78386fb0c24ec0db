//! Payment approval workflow.
//!
//! A payment is proposed by the payer, then approved or rejected exactly
//! once by the payee. Every operation validates the actor and the state
//! before touching the store, and successful transitions fan out a
//! notification to the counterparty.
//!
//! The propose-time balance check reads a snapshot that may be stale by
//! commit time; two racing proposals that jointly exceed the owed amount
//! are resolved by the payee rejecting the loser.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Comment, EngineError, Money, Payment, PaymentStatus, ResourceType, ResultEngine, comments,
    payments,
};

use super::{Engine, normalize_required_text, with_tx};

impl Engine {
    /// Proposes a payment from `payer` (the actor) to `payee`.
    ///
    /// The amount must not exceed what the payer currently owes the payee.
    pub async fn propose_payment(
        &self,
        household_id: &str,
        payer: &str,
        payee: &str,
        amount_minor: i64,
        date: DateTime<Utc>,
    ) -> ResultEngine<Payment> {
        if payer == payee {
            return Err(EngineError::Validation(
                "payer and payee must differ".to_string(),
            ));
        }
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }

        let (payment, notification) = with_tx!(self, |db_tx| {
            (async {
                self.require_active_household(&db_tx, household_id).await?;
                self.require_adult_member(&db_tx, household_id, payer, "payer")
                    .await?;
                self.require_adult_member(&db_tx, household_id, payee, "payee")
                    .await?;

                let owed = self.net_owed(&db_tx, household_id, payer, payee).await?;
                if amount_minor > owed {
                    return Err(EngineError::Validation(
                        "amount exceeds owed balance".to_string(),
                    ));
                }

                let payment = Payment::new(
                    household_id.to_string(),
                    payer.to_string(),
                    payee.to_string(),
                    amount_minor,
                    date,
                    Utc::now(),
                )?;
                payments::ActiveModel::from(&payment).insert(&db_tx).await?;

                let notification = self
                    .store_notification(
                        &db_tx,
                        payee,
                        household_id,
                        ResourceType::Payment,
                        &payment.id.to_string(),
                        "You have a pending payment to approve".to_string(),
                    )
                    .await?;

                Ok((payment, notification))
            })
            .await
        })?;

        self.push_event(&notification);
        Ok(payment)
    }

    /// Approves a pending payment. Payee only; terminal afterwards.
    pub async fn approve_payment(
        &self,
        household_id: &str,
        payment_id: Uuid,
        actor: &str,
    ) -> ResultEngine<Payment> {
        let (payment, notification) = with_tx!(self, |db_tx| {
            (async {
                self.require_household(&db_tx, household_id).await?;
                self.require_member(&db_tx, household_id, actor).await?;
                let model = self.require_payment(&db_tx, household_id, payment_id).await?;
                let mut payment = Payment::try_from(model)?;

                if payment.payee != actor {
                    return Err(EngineError::Forbidden(
                        "only the payee can approve a payment".to_string(),
                    ));
                }
                if payment.status.is_terminal() {
                    return Err(EngineError::Conflict(
                        "payment is already settled".to_string(),
                    ));
                }

                let update = payments::ActiveModel {
                    id: ActiveValue::Set(payment_id.to_string()),
                    status: ActiveValue::Set(PaymentStatus::Approved.as_str().to_string()),
                    ..Default::default()
                };
                update.update(&db_tx).await?;
                payment.status = PaymentStatus::Approved;

                let notification = self
                    .store_notification(
                        &db_tx,
                        &payment.payer,
                        household_id,
                        ResourceType::Payment,
                        &payment.id.to_string(),
                        format!(
                            "Your payment of {} was approved",
                            Money::new(payment.amount_minor)
                        ),
                    )
                    .await?;

                Ok((payment, notification))
            })
            .await
        })?;

        self.push_event(&notification);
        Ok(payment)
    }

    /// Rejects a pending payment with a reason. Payee only; terminal
    /// afterwards.
    pub async fn reject_payment(
        &self,
        household_id: &str,
        payment_id: Uuid,
        actor: &str,
        reason: &str,
    ) -> ResultEngine<Payment> {
        let reason = normalize_required_text(reason, "rejection reason")?;

        let (payment, notification) = with_tx!(self, |db_tx| {
            (async {
                self.require_household(&db_tx, household_id).await?;
                self.require_member(&db_tx, household_id, actor).await?;
                let model = self.require_payment(&db_tx, household_id, payment_id).await?;
                let mut payment = Payment::try_from(model)?;

                if payment.payee != actor {
                    return Err(EngineError::Forbidden(
                        "only the payee can reject a payment".to_string(),
                    ));
                }
                if payment.status.is_terminal() {
                    return Err(EngineError::Conflict(
                        "payment is already settled".to_string(),
                    ));
                }

                let update = payments::ActiveModel {
                    id: ActiveValue::Set(payment_id.to_string()),
                    status: ActiveValue::Set(PaymentStatus::Rejected.as_str().to_string()),
                    rejection_reason: ActiveValue::Set(Some(reason.clone())),
                    ..Default::default()
                };
                update.update(&db_tx).await?;
                payment.status = PaymentStatus::Rejected;
                payment.rejection_reason = Some(reason.clone());

                let notification = self
                    .store_notification(
                        &db_tx,
                        &payment.payer,
                        household_id,
                        ResourceType::Payment,
                        &payment.id.to_string(),
                        format!("Your payment was rejected: {reason}"),
                    )
                    .await?;

                Ok((payment, notification))
            })
            .await
        })?;

        self.push_event(&notification);
        Ok(payment)
    }

    /// Edits the amount/date of a pending payment. Payer only; the new
    /// amount is re-validated against the current balance exactly like a
    /// fresh proposal.
    pub async fn edit_payment(
        &self,
        household_id: &str,
        payment_id: Uuid,
        actor: &str,
        amount_minor: i64,
        date: DateTime<Utc>,
    ) -> ResultEngine<Payment> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            (async {
                self.require_active_household(&db_tx, household_id).await?;
                self.require_member(&db_tx, household_id, actor).await?;
                let model = self.require_payment(&db_tx, household_id, payment_id).await?;
                let mut payment = Payment::try_from(model)?;

                if payment.payer != actor {
                    return Err(EngineError::Forbidden(
                        "only the payer can edit a payment".to_string(),
                    ));
                }
                if payment.status.is_terminal() {
                    return Err(EngineError::Conflict(
                        "payment is already settled".to_string(),
                    ));
                }

                let owed = self
                    .net_owed(&db_tx, household_id, &payment.payer, &payment.payee)
                    .await?;
                if amount_minor > owed {
                    return Err(EngineError::Validation(
                        "amount exceeds owed balance".to_string(),
                    ));
                }

                let update = payments::ActiveModel {
                    id: ActiveValue::Set(payment_id.to_string()),
                    amount_minor: ActiveValue::Set(amount_minor),
                    date: ActiveValue::Set(date),
                    ..Default::default()
                };
                update.update(&db_tx).await?;
                payment.amount_minor = amount_minor;
                payment.date = date;

                Ok(payment)
            })
            .await
        })
    }

    /// Appends a comment to a payment's thread and returns the updated
    /// list, oldest first.
    ///
    /// Allowed in any payment state and on archived households; the
    /// history stays commentable.
    pub async fn add_payment_comment(
        &self,
        household_id: &str,
        payment_id: Uuid,
        author: &str,
        text: &str,
    ) -> ResultEngine<Vec<Comment>> {
        let text = normalize_required_text(text, "comment text")?;

        with_tx!(self, |db_tx| {
            (async {
                self.require_household(&db_tx, household_id).await?;
                self.require_member(&db_tx, household_id, author).await?;
                self.require_payment(&db_tx, household_id, payment_id).await?;

                let comment = Comment::new(payment_id, author.to_string(), text, Utc::now());
                comments::ActiveModel::from(&comment).insert(&db_tx).await?;

                self.load_comments(&db_tx, payment_id).await
            })
            .await
        })
    }

    /// Deletes a pending payment and its comments. Payer only.
    pub async fn remove_payment(
        &self,
        household_id: &str,
        payment_id: Uuid,
        actor: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            (async {
                self.require_active_household(&db_tx, household_id).await?;
                self.require_member(&db_tx, household_id, actor).await?;
                let model = self.require_payment(&db_tx, household_id, payment_id).await?;
                let payment = Payment::try_from(model)?;

                if payment.payer != actor {
                    return Err(EngineError::Forbidden(
                        "only the payer can remove a payment".to_string(),
                    ));
                }
                if payment.status.is_terminal() {
                    return Err(EngineError::Conflict(
                        "payment is already settled".to_string(),
                    ));
                }

                comments::Entity::delete_many()
                    .filter(comments::Column::PaymentId.eq(payment_id.to_string()))
                    .exec(&db_tx)
                    .await?;
                payments::Entity::delete_by_id(payment_id.to_string())
                    .exec(&db_tx)
                    .await?;
                Ok(())
            })
            .await
        })
    }
}
