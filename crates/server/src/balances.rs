//! Balance view endpoint.

use api_types::balance::BalanceView;
use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{ServerError, server::ServerState};
use engine::{Money, users};

/// Returns the authenticated member's balance against every other member
/// of the household, creditors first.
pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(household_id): Path<String>,
) -> Result<Json<Vec<BalanceView>>, ServerError> {
    let entries = state
        .engine
        .balances_for_member(&household_id, &user.username, &user.username)
        .await?;

    let balances = entries
        .into_iter()
        .map(|entry| BalanceView {
            id: entry.counterpart.clone(),
            user: entry.counterpart,
            sum: Money::new(entry.amount_minor).to_major_f64(),
            side: entry.side.as_str().to_string(),
        })
        .collect();

    Ok(Json(balances))
}
