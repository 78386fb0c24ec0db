//! Ledger entry store: listing and creation of expenses and payments.
//!
//! Lists are newest-first with a fixed page size; `has_more` is derived by
//! fetching one row past the page. Creation validates the allocation
//! invariant (Σpaid = Σowed = amount) before any write.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Allocation, AllocationKind, EngineError, Expense, ExpenseStatus, Payment, PaymentStatus,
    ResultEngine, allocations, comments, expenses, payments,
};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

/// Fixed page size for ledger lists.
pub const PAGE_SIZE: u64 = 6;

/// One page of ledger entries.
///
/// `has_more` is true iff a record exists beyond this page under the same
/// filter.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub has_more: bool,
}

/// Filters for listing expenses.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct ExpenseListFilter {
    /// Case-insensitive substring match on the title.
    pub title: Option<String>,
    pub category: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, acts as an allow-list of statuses to return.
    pub statuses: Option<Vec<ExpenseStatus>>,
}

/// Filters for listing payments, same range semantics as expenses.
#[derive(Clone, Debug, Default)]
pub struct PaymentListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, acts as an allow-list of statuses to return.
    pub statuses: Option<Vec<PaymentStatus>>,
}

fn validate_range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (from, to)
        && from >= to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

/// One member's share on either side of a new expense.
#[derive(Clone, Debug)]
pub struct AllocationShare {
    pub user_id: String,
    pub amount_minor: i64,
}

/// Command for [`Engine::create_expense`].
#[derive(Clone, Debug)]
pub struct CreateExpense {
    pub household_id: String,
    pub actor: String,
    pub title: String,
    pub category: Option<String>,
    pub date: DateTime<Utc>,
    pub amount_minor: i64,
    pub paid: Vec<AllocationShare>,
    pub owed: Vec<AllocationShare>,
}

fn validate_allocation_side(
    shares: &[AllocationShare],
    amount_minor: i64,
    label: &str,
) -> ResultEngine<()> {
    if shares.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} allocation must not be empty"
        )));
    }
    let mut seen: HashSet<&str> = HashSet::new();
    let mut sum: i64 = 0;
    for share in shares {
        if share.amount_minor < 0 {
            return Err(EngineError::Validation(format!(
                "{label} allocation amounts must not be negative"
            )));
        }
        if !seen.insert(share.user_id.as_str()) {
            return Err(EngineError::Validation(format!(
                "duplicate member in {label} allocation"
            )));
        }
        sum = sum
            .checked_add(share.amount_minor)
            .ok_or_else(|| EngineError::Validation("amount too large".to_string()))?;
    }
    if sum != amount_minor {
        return Err(EngineError::Validation(format!(
            "{label} allocation must sum to the expense amount"
        )));
    }
    Ok(())
}

impl Engine {
    /// Stores a new expense after validating the allocation invariant.
    ///
    /// Every allocation member must belong to the household; children may
    /// appear on either side (they consume shared expenses).
    pub async fn create_expense(&self, cmd: CreateExpense) -> ResultEngine<Expense> {
        let title = normalize_required_text(&cmd.title, "expense title")?;
        let category = normalize_optional_text(cmd.category.as_deref());
        if cmd.amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        validate_allocation_side(&cmd.paid, cmd.amount_minor, "paid")?;
        validate_allocation_side(&cmd.owed, cmd.amount_minor, "owed")?;

        with_tx!(self, |db_tx| {
            (async {
                self.require_active_household(&db_tx, &cmd.household_id).await?;
                self.require_member(&db_tx, &cmd.household_id, &cmd.actor).await?;
                for share in cmd.paid.iter().chain(cmd.owed.iter()) {
                    self.require_member(&db_tx, &cmd.household_id, &share.user_id)
                        .await?;
                }

                let mut expense = Expense::new(
                    cmd.household_id.clone(),
                    title,
                    category,
                    cmd.date,
                    cmd.amount_minor,
                    cmd.actor.clone(),
                )?;
                expenses::ActiveModel::from(&expense).insert(&db_tx).await?;

                for (kind, shares) in [
                    (AllocationKind::Paid, &cmd.paid),
                    (AllocationKind::Owed, &cmd.owed),
                ] {
                    for (position, share) in shares.iter().enumerate() {
                        let allocation = Allocation::new(
                            expense.id,
                            kind,
                            share.user_id.clone(),
                            share.amount_minor,
                            position as i32,
                        );
                        allocations::ActiveModel::from(&allocation)
                            .insert(&db_tx)
                            .await?;
                        match kind {
                            AllocationKind::Paid => expense.paid.push(allocation),
                            AllocationKind::Owed => expense.owed.push(allocation),
                        }
                    }
                }

                Ok(expense)
            })
            .await
        })
    }

    /// Lists a household's expenses, newest first, with their allocations.
    pub async fn list_expenses(
        &self,
        household_id: &str,
        actor: &str,
        filter: &ExpenseListFilter,
        page: u64,
    ) -> ResultEngine<Page<Expense>> {
        validate_range(filter.from, filter.to)?;
        with_tx!(self, |db_tx| {
            (async {
                self.require_household(&db_tx, household_id).await?;
                self.require_member(&db_tx, household_id, actor).await?;

                let mut query = expenses::Entity::find()
                    .filter(expenses::Column::HouseholdId.eq(household_id.to_string()))
                    .order_by_desc(expenses::Column::Date)
                    .order_by_desc(expenses::Column::Id)
                    .offset(page.saturating_mul(PAGE_SIZE))
                    .limit(PAGE_SIZE + 1);

                if let Some(title) = &filter.title {
                    query = query.filter(expenses::Column::Title.contains(title));
                }
                if let Some(category) = &filter.category {
                    query = query.filter(expenses::Column::Category.eq(category.clone()));
                }
                if let Some(from) = filter.from {
                    query = query.filter(expenses::Column::Date.gte(from));
                }
                if let Some(to) = filter.to {
                    query = query.filter(expenses::Column::Date.lt(to));
                }
                if let Some(statuses) = &filter.statuses {
                    let statuses: Vec<String> =
                        statuses.iter().map(|s| s.as_str().to_string()).collect();
                    query = query.filter(expenses::Column::Status.is_in(statuses));
                }

                let rows: Vec<expenses::Model> = query.all(&db_tx).await?;
                let has_more = rows.len() > PAGE_SIZE as usize;

                let mut data: Vec<Expense> = Vec::with_capacity(rows.len().min(PAGE_SIZE as usize));
                for model in rows.into_iter().take(PAGE_SIZE as usize) {
                    data.push(Expense::try_from(model)?);
                }
                self.attach_allocations(&db_tx, &mut data).await?;

                Ok(Page { data, has_more })
            })
            .await
        })
    }

    /// Returns one expense with its allocations.
    pub async fn get_expense(
        &self,
        household_id: &str,
        expense_id: Uuid,
        actor: &str,
    ) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            (async {
                self.require_household(&db_tx, household_id).await?;
                self.require_member(&db_tx, household_id, actor).await?;

                let model = expenses::Entity::find_by_id(expense_id.to_string())
                    .filter(expenses::Column::HouseholdId.eq(household_id.to_string()))
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;

                let mut data = vec![Expense::try_from(model)?];
                self.attach_allocations(&db_tx, &mut data).await?;
                data.pop()
                    .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))
            })
            .await
        })
    }

    /// Lists a household's payments, newest first.
    pub async fn list_payments(
        &self,
        household_id: &str,
        actor: &str,
        filter: &PaymentListFilter,
        page: u64,
    ) -> ResultEngine<Page<Payment>> {
        validate_range(filter.from, filter.to)?;
        with_tx!(self, |db_tx| {
            (async {
                self.require_household(&db_tx, household_id).await?;
                self.require_member(&db_tx, household_id, actor).await?;

                let mut query = payments::Entity::find()
                    .filter(payments::Column::HouseholdId.eq(household_id.to_string()))
                    .order_by_desc(payments::Column::Date)
                    .order_by_desc(payments::Column::Id)
                    .offset(page.saturating_mul(PAGE_SIZE))
                    .limit(PAGE_SIZE + 1);

                if let Some(from) = filter.from {
                    query = query.filter(payments::Column::Date.gte(from));
                }
                if let Some(to) = filter.to {
                    query = query.filter(payments::Column::Date.lt(to));
                }
                if let Some(statuses) = &filter.statuses {
                    let statuses: Vec<String> =
                        statuses.iter().map(|s| s.as_str().to_string()).collect();
                    query = query.filter(payments::Column::Status.is_in(statuses));
                }

                let rows: Vec<payments::Model> = query.all(&db_tx).await?;
                let has_more = rows.len() > PAGE_SIZE as usize;

                let mut data: Vec<Payment> = Vec::with_capacity(rows.len().min(PAGE_SIZE as usize));
                for model in rows.into_iter().take(PAGE_SIZE as usize) {
                    data.push(Payment::try_from(model)?);
                }

                Ok(Page { data, has_more })
            })
            .await
        })
    }

    /// Returns one payment with its comment thread, oldest comment first.
    pub async fn get_payment(
        &self,
        household_id: &str,
        payment_id: Uuid,
        actor: &str,
    ) -> ResultEngine<Payment> {
        with_tx!(self, |db_tx| {
            (async {
                self.require_household(&db_tx, household_id).await?;
                self.require_member(&db_tx, household_id, actor).await?;
                let model = self.require_payment(&db_tx, household_id, payment_id).await?;
                let mut payment = Payment::try_from(model)?;
                payment.comments = self.load_comments(&db_tx, payment_id).await?;
                Ok(payment)
            })
            .await
        })
    }

    pub(super) async fn load_comments(
        &self,
        db: &DatabaseTransaction,
        payment_id: Uuid,
    ) -> ResultEngine<Vec<crate::Comment>> {
        let rows: Vec<comments::Model> = comments::Entity::find()
            .filter(comments::Column::PaymentId.eq(payment_id.to_string()))
            .order_by_asc(comments::Column::CreatedAt)
            .order_by_asc(comments::Column::Id)
            .all(db)
            .await?;
        rows.into_iter().map(crate::Comment::try_from).collect()
    }

    async fn attach_allocations(
        &self,
        db: &DatabaseTransaction,
        expenses_out: &mut [Expense],
    ) -> ResultEngine<()> {
        if expenses_out.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = expenses_out.iter().map(|e| e.id.to_string()).collect();
        let rows: Vec<allocations::Model> = allocations::Entity::find()
            .filter(allocations::Column::ExpenseId.is_in(ids))
            .order_by_asc(allocations::Column::Position)
            .all(db)
            .await?;

        let mut by_expense: HashMap<Uuid, Vec<Allocation>> = HashMap::new();
        for row in rows {
            let allocation = Allocation::try_from(row)?;
            by_expense
                .entry(allocation.expense_id)
                .or_default()
                .push(allocation);
        }

        for expense in expenses_out.iter_mut() {
            let Some(allocs) = by_expense.remove(&expense.id) else {
                continue;
            };
            for allocation in allocs {
                match allocation.kind {
                    AllocationKind::Paid => expense.paid.push(allocation),
                    AllocationKind::Owed => expense.owed.push(allocation),
                }
            }
        }
        Ok(())
    }
}
