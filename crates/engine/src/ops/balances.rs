//! Balance aggregation.
//!
//! Balances are never stored: every read replays the household's ledger
//! (non-rejected expenses plus approved payments) into a pairwise debt
//! matrix and collapses it into per-member views. The store validated
//! Σpaid = Σowed = amount at write time, so aggregation cannot fail on
//! well-formed data.

use std::collections::HashMap;

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AllocationKind, EngineError, ExpenseStatus, PaymentStatus, ResultEngine, allocations, expenses,
    payments,
};

use super::{Engine, with_tx};

/// Which side of a pair balance the viewing member is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceSide {
    /// The counterpart owes the viewer (`"+"`).
    Credit,
    /// The viewer owes the counterpart (`"-"`).
    Debit,
    /// Nothing outstanding either way (`"0"`).
    Settled,
}

impl BalanceSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "+",
            Self::Debit => "-",
            Self::Settled => "0",
        }
    }

    /// Display rank: creditor entries first, settled last.
    fn rank(self) -> u8 {
        match self {
            Self::Credit => 0,
            Self::Debit => 1,
            Self::Settled => 2,
        }
    }
}

/// One row of a member's balance view: what stands between the member and
/// one counterpart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub counterpart: String,
    /// Net amount, always non-negative; direction is carried by `side`.
    pub amount_minor: i64,
    pub side: BalanceSide,
}

/// Pairwise debt matrix keyed by `(debtor, creditor)`.
///
/// `matrix[(o, p)]` is the raw amount member `o` owes member `p` before
/// netting the opposite direction.
type DebtMatrix = HashMap<(String, String), i64>;

/// Splits an owed amount across payers proportionally to each payer's
/// paid share, in integer minor units.
///
/// Uses largest-remainder rounding so the shares always sum exactly to
/// `owed_minor`; ties go to the earlier payer. `paid` must be non-empty
/// with a positive total.
fn apportion(owed_minor: i64, paid: &[(String, i64)]) -> Vec<(String, i64)> {
    let total: i64 = paid.iter().map(|(_, amount)| *amount).sum();
    if total <= 0 {
        return Vec::new();
    }
    if paid.len() == 1 {
        return vec![(paid[0].0.clone(), owed_minor)];
    }

    let mut shares: Vec<(String, i64, i64)> = paid
        .iter()
        .map(|(user, amount)| {
            let numerator = (owed_minor as i128) * (*amount as i128);
            let floor = (numerator / total as i128) as i64;
            let remainder = (numerator % total as i128) as i64;
            (user.clone(), floor, remainder)
        })
        .collect();

    let assigned: i64 = shares.iter().map(|(_, floor, _)| *floor).sum();
    let mut leftover = owed_minor - assigned;

    // Hand out the leftover cents by descending remainder, stable so the
    // earlier payer wins ties.
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|a, b| shares[*b].2.cmp(&shares[*a].2));
    for idx in order {
        if leftover == 0 {
            break;
        }
        shares[idx].1 += 1;
        leftover -= 1;
    }

    shares
        .into_iter()
        .map(|(user, amount, _)| (user, amount))
        .collect()
}

impl Engine {
    /// Computes the balance view for one member of a household.
    ///
    /// The output contains an entry for every other member, zero balances
    /// included, sorted creditor entries first and then by descending
    /// amount (ties keep membership order).
    pub async fn balances_for_member(
        &self,
        household_id: &str,
        member: &str,
        actor: &str,
    ) -> ResultEngine<Vec<BalanceEntry>> {
        with_tx!(self, |db_tx| {
            (async {
                self.require_household(&db_tx, household_id).await?;
                self.require_member(&db_tx, household_id, actor).await?;
                self.require_member(&db_tx, household_id, member).await?;

                let matrix = self.debt_matrix(&db_tx, household_id).await?;
                let members = self.household_members(&db_tx, household_id).await?;

                let mut entries: Vec<BalanceEntry> = Vec::with_capacity(members.len());
                for counterpart in members {
                    if counterpart.user_id == member {
                        continue;
                    }
                    let owed_by_member = matrix
                        .get(&(member.to_string(), counterpart.user_id.clone()))
                        .copied()
                        .unwrap_or(0);
                    let owed_to_member = matrix
                        .get(&(counterpart.user_id.clone(), member.to_string()))
                        .copied()
                        .unwrap_or(0);
                    let net = owed_by_member - owed_to_member;

                    let side = if net > 0 {
                        BalanceSide::Debit
                    } else if net < 0 {
                        BalanceSide::Credit
                    } else {
                        BalanceSide::Settled
                    };
                    entries.push(BalanceEntry {
                        counterpart: counterpart.user_id,
                        amount_minor: net.abs(),
                        side,
                    });
                }

                // Display contract: creditor entries first, then larger
                // amounts; stable keeps membership order on ties.
                entries.sort_by(|a, b| {
                    a.side
                        .rank()
                        .cmp(&b.side.rank())
                        .then(b.amount_minor.cmp(&a.amount_minor))
                });

                Ok(entries)
            })
            .await
        })
    }

    /// Net amount `debtor` currently owes `creditor` (never negative).
    ///
    /// This is the figure `propose`/`edit` validate payment amounts
    /// against.
    pub async fn owed_between(
        &self,
        household_id: &str,
        debtor: &str,
        creditor: &str,
        actor: &str,
    ) -> ResultEngine<i64> {
        with_tx!(self, |db_tx| {
            (async {
                self.require_household(&db_tx, household_id).await?;
                self.require_member(&db_tx, household_id, actor).await?;
                self.net_owed(&db_tx, household_id, debtor, creditor).await
            })
            .await
        })
    }

    pub(super) async fn net_owed(
        &self,
        db: &DatabaseTransaction,
        household_id: &str,
        debtor: &str,
        creditor: &str,
    ) -> ResultEngine<i64> {
        let matrix = self.debt_matrix(db, household_id).await?;
        let forward = matrix
            .get(&(debtor.to_string(), creditor.to_string()))
            .copied()
            .unwrap_or(0);
        let backward = matrix
            .get(&(creditor.to_string(), debtor.to_string()))
            .copied()
            .unwrap_or(0);
        Ok((forward - backward).max(0))
    }

    /// Replays the household ledger into the raw pairwise debt matrix.
    pub(super) async fn debt_matrix(
        &self,
        db: &DatabaseTransaction,
        household_id: &str,
    ) -> ResultEngine<DebtMatrix> {
        let mut matrix: DebtMatrix = HashMap::new();

        let expense_models: Vec<expenses::Model> = expenses::Entity::find()
            .filter(expenses::Column::HouseholdId.eq(household_id.to_string()))
            .filter(expenses::Column::Status.ne(ExpenseStatus::Rejected.as_str()))
            .all(db)
            .await?;

        for expense_model in expense_models {
            let expense_id = Uuid::parse_str(&expense_model.id)
                .map_err(|_| EngineError::KeyNotFound("expense not exists".to_string()))?;
            let allocation_models: Vec<allocations::Model> = allocations::Entity::find()
                .filter(allocations::Column::ExpenseId.eq(expense_id.to_string()))
                .order_by_asc(allocations::Column::Position)
                .all(db)
                .await?;

            let mut paid: Vec<(String, i64)> = Vec::new();
            let mut owed: Vec<(String, i64)> = Vec::new();
            for model in allocation_models {
                let kind = AllocationKind::try_from(model.kind.as_str())?;
                match kind {
                    AllocationKind::Paid => paid.push((model.user_id, model.amount_minor)),
                    AllocationKind::Owed => owed.push((model.user_id, model.amount_minor)),
                }
            }

            for (ower, owed_minor) in &owed {
                for (payer, share) in apportion(*owed_minor, &paid) {
                    if payer == *ower || share == 0 {
                        continue;
                    }
                    *matrix.entry((ower.clone(), payer)).or_insert(0) += share;
                }
            }
        }

        let payment_models: Vec<payments::Model> = payments::Entity::find()
            .filter(payments::Column::HouseholdId.eq(household_id.to_string()))
            .filter(payments::Column::Status.eq(PaymentStatus::Approved.as_str()))
            .all(db)
            .await?;

        for payment in payment_models {
            *matrix
                .entry((payment.payer, payment.payee))
                .or_insert(0) -= payment.amount_minor;
        }

        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::apportion;

    #[test]
    fn single_payer_takes_the_whole_share() {
        let paid = vec![("ana".to_string(), 10_000)];
        assert_eq!(apportion(5_000, &paid), vec![("ana".to_string(), 5_000)]);
    }

    #[test]
    fn shares_follow_paid_proportions() {
        let paid = vec![("ana".to_string(), 6_000), ("boris".to_string(), 4_000)];
        assert_eq!(
            apportion(10_000, &paid),
            vec![("ana".to_string(), 6_000), ("boris".to_string(), 4_000)]
        );
    }

    #[test]
    fn largest_remainder_keeps_the_total_exact() {
        // 100 split over thirds cannot be exact per share; the total must
        // still be 100 and the earlier payer wins the leftover cent.
        let paid = vec![
            ("ana".to_string(), 100),
            ("boris".to_string(), 100),
            ("vera".to_string(), 100),
        ];
        let shares = apportion(100, &paid);
        let total: i64 = shares.iter().map(|(_, s)| *s).sum();
        assert_eq!(total, 100);
        assert_eq!(shares[0], ("ana".to_string(), 34));
        assert_eq!(shares[1], ("boris".to_string(), 33));
        assert_eq!(shares[2], ("vera".to_string(), 33));
    }
}
