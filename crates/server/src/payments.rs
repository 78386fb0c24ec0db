//! Payment workflow endpoints.
//!
//! The authenticated user is the payer on create/edit/remove and the
//! payee on accept/reject; the engine enforces both.

use api_types::payment::{
    CommentNew, CommentView, PaymentEdit, PaymentGetQuery, PaymentListQuery, PaymentListResponse,
    PaymentNew, PaymentView, RejectBody,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::{Comment, Money, Payment, PaymentListFilter, PaymentStatus, users};

fn comment_view(comment: Comment) -> CommentView {
    CommentView {
        id: comment.id,
        author: comment.author,
        text: comment.text,
        created_at: comment.created_at.fixed_offset(),
    }
}

fn payment_view(payment: Payment) -> PaymentView {
    PaymentView {
        id: payment.id,
        payer: payment.payer,
        payee: payment.payee,
        amount: Money::new(payment.amount_minor).to_major_f64(),
        date: payment.date.fixed_offset(),
        status: payment.status.as_str().to_string(),
        rejection_reason: payment.rejection_reason,
        created_at: payment.created_at.fixed_offset(),
        comments: payment.comments.into_iter().map(comment_view).collect(),
        payer_balance_sum: None,
        payee_balance_sum: None,
    }
}

fn parse_statuses(raw: &str) -> Result<Vec<PaymentStatus>, ServerError> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            PaymentStatus::try_from(part.trim())
                .map_err(|_| ServerError::Generic(format!("unknown status: {part}")))
        })
        .collect()
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(household_id): Path<String>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<PaymentListResponse>, ServerError> {
    let filter = PaymentListFilter {
        from: query.from.map(|dt| dt.with_timezone(&Utc)),
        to: query.to.map(|dt| dt.with_timezone(&Utc)),
        statuses: query.statuses.as_deref().map(parse_statuses).transpose()?,
    };

    let page = state
        .engine
        .list_payments(
            &household_id,
            &user.username,
            &filter,
            query.page.unwrap_or(0),
        )
        .await?;

    Ok(Json(PaymentListResponse {
        data: page.data.into_iter().map(payment_view).collect(),
        has_more: page.has_more,
    }))
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(household_id): Path<String>,
    Json(payload): Json<PaymentNew>,
) -> Result<(StatusCode, Json<PaymentView>), ServerError> {
    let payment = state
        .engine
        .propose_payment(
            &household_id,
            &user.username,
            &payload.payee,
            Money::from_major_f64(payload.amount)?.minor(),
            payload.date.with_timezone(&Utc),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(payment_view(payment))))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((household_id, payment_id)): Path<(String, Uuid)>,
    Query(query): Query<PaymentGetQuery>,
) -> Result<Json<PaymentView>, ServerError> {
    let payment = state
        .engine
        .get_payment(&household_id, payment_id, &user.username)
        .await?;

    let mut view = payment_view(payment);
    if query.balance.unwrap_or(false) {
        let payer_owes = state
            .engine
            .owed_between(&household_id, &view.payer, &view.payee, &user.username)
            .await?;
        let payee_owes = state
            .engine
            .owed_between(&household_id, &view.payee, &view.payer, &user.username)
            .await?;
        view.payer_balance_sum = Some(Money::new(payer_owes).to_major_f64());
        view.payee_balance_sum = Some(Money::new(payee_owes).to_major_f64());
    }

    Ok(Json(view))
}

pub async fn edit(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((household_id, payment_id)): Path<(String, Uuid)>,
    Json(payload): Json<PaymentEdit>,
) -> Result<Json<PaymentView>, ServerError> {
    let payment = state
        .engine
        .edit_payment(
            &household_id,
            payment_id,
            &user.username,
            Money::from_major_f64(payload.amount)?.minor(),
            payload.date.with_timezone(&Utc),
        )
        .await?;

    Ok(Json(payment_view(payment)))
}

pub async fn remove(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((household_id, payment_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_payment(&household_id, payment_id, &user.username)
        .await?;
    Ok(StatusCode::OK)
}

pub async fn accept(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((household_id, payment_id)): Path<(String, Uuid)>,
) -> Result<Json<PaymentView>, ServerError> {
    let payment = state
        .engine
        .approve_payment(&household_id, payment_id, &user.username)
        .await?;

    Ok(Json(payment_view(payment)))
}

pub async fn reject(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((household_id, payment_id)): Path<(String, Uuid)>,
    Json(payload): Json<RejectBody>,
) -> Result<Json<PaymentView>, ServerError> {
    let payment = state
        .engine
        .reject_payment(&household_id, payment_id, &user.username, &payload.text)
        .await?;

    Ok(Json(payment_view(payment)))
}

pub async fn add_comment(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((household_id, payment_id)): Path<(String, Uuid)>,
    Json(payload): Json<CommentNew>,
) -> Result<Json<Vec<CommentView>>, ServerError> {
    let comments = state
        .engine
        .add_payment_comment(&household_id, payment_id, &user.username, &payload.text)
        .await?;

    Ok(Json(comments.into_iter().map(comment_view).collect()))
}
