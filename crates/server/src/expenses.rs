//! Expense endpoints.

use api_types::expense::{
    AllocationEntry, ExpenseListQuery, ExpenseListResponse, ExpenseNew, ExpenseView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{ServerError, server::ServerState};
use engine::{
    AllocationShare, CreateExpense, Expense, ExpenseListFilter, ExpenseStatus, Money, users,
};

fn allocation_entries(allocations: Vec<engine::Allocation>) -> Vec<AllocationEntry> {
    allocations
        .into_iter()
        .map(|allocation| AllocationEntry {
            user: allocation.user_id,
            sum: Money::new(allocation.amount_minor).to_major_f64(),
        })
        .collect()
}

fn expense_view(expense: Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        title: expense.title,
        category: expense.category,
        amount: Money::new(expense.amount_minor).to_major_f64(),
        date: expense.date.fixed_offset(),
        status: expense.status.as_str().to_string(),
        created_by: expense.created_by,
        paid: allocation_entries(expense.paid),
        owed: allocation_entries(expense.owed),
    }
}

fn parse_shares(entries: &[AllocationEntry]) -> Result<Vec<AllocationShare>, ServerError> {
    entries
        .iter()
        .map(|entry| {
            Ok(AllocationShare {
                user_id: entry.user.clone(),
                amount_minor: Money::from_major_f64(entry.sum)?.minor(),
            })
        })
        .collect()
}

fn parse_statuses(raw: &str) -> Result<Vec<ExpenseStatus>, ServerError> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            ExpenseStatus::try_from(part.trim())
                .map_err(|_| ServerError::Generic(format!("unknown status: {part}")))
        })
        .collect()
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(household_id): Path<String>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<Json<ExpenseListResponse>, ServerError> {
    let filter = ExpenseListFilter {
        title: query.title,
        category: query.category,
        from: query.from.map(|dt| dt.with_timezone(&Utc)),
        to: query.to.map(|dt| dt.with_timezone(&Utc)),
        statuses: query.statuses.as_deref().map(parse_statuses).transpose()?,
    };

    let page = state
        .engine
        .list_expenses(
            &household_id,
            &user.username,
            &filter,
            query.page.unwrap_or(0),
        )
        .await?;

    Ok(Json(ExpenseListResponse {
        data: page.data.into_iter().map(expense_view).collect(),
        has_more: page.has_more,
    }))
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(household_id): Path<String>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseView>), ServerError> {
    let expense = state
        .engine
        .create_expense(CreateExpense {
            household_id,
            actor: user.username.clone(),
            title: payload.title,
            category: payload.category,
            date: payload.date.with_timezone(&Utc),
            amount_minor: Money::from_major_f64(payload.amount)?.minor(),
            paid: parse_shares(&payload.paid)?,
            owed: parse_shares(&payload.owed)?,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(expense_view(expense))))
}
