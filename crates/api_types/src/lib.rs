//! Request/response bodies shared by the server and its clients.
//!
//! Field names are the wire contract: `_id` for resource ids, camelCase
//! for compound names, money as major-unit numbers (`12.50` means 12.50
//! лв.). Status and side values travel as their canonical strings.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod balance {
    use super::*;

    /// One row of a member's balance view against a single counterpart.
    ///
    /// `type` is `"+"` (the counterpart owes the viewer), `"-"` (the
    /// viewer owes the counterpart) or `"0"` (settled).
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        #[serde(rename = "_id")]
        pub id: String,
        pub user: String,
        pub sum: f64,
        #[serde(rename = "type")]
        pub side: String,
    }
}

pub mod expense {
    use super::*;

    /// One `{member, sum}` pair of a paid-by or owed-by allocation.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AllocationEntry {
        pub user: String,
        pub sum: f64,
    }

    /// Request body for creating an expense.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub title: String,
        pub category: Option<String>,
        pub amount: f64,
        pub date: DateTime<FixedOffset>,
        pub paid: Vec<AllocationEntry>,
        pub owed: Vec<AllocationEntry>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        #[serde(rename = "_id")]
        pub id: Uuid,
        pub title: String,
        pub category: Option<String>,
        pub amount: f64,
        pub date: DateTime<FixedOffset>,
        pub status: String,
        #[serde(rename = "createdBy")]
        pub created_by: String,
        pub paid: Vec<AllocationEntry>,
        pub owed: Vec<AllocationEntry>,
    }

    /// Query string for the expense list endpoint.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseListQuery {
        pub page: Option<u64>,
        pub title: Option<String>,
        pub category: Option<String>,
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
        /// Comma-separated status allow-list.
        pub statuses: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseListResponse {
        pub data: Vec<ExpenseView>,
        pub has_more: bool,
    }
}

pub mod payment {
    use super::*;

    /// Request body for proposing a payment. The payer is the
    /// authenticated user.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentNew {
        pub amount: f64,
        pub date: DateTime<FixedOffset>,
        pub payee: String,
    }

    /// Request body for editing a pending payment.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentEdit {
        pub amount: f64,
        pub date: DateTime<FixedOffset>,
    }

    /// Request body for rejecting a payment.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RejectBody {
        pub text: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CommentNew {
        pub text: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CommentView {
        #[serde(rename = "_id")]
        pub id: Uuid,
        pub author: String,
        pub text: String,
        #[serde(rename = "createdAt")]
        pub created_at: DateTime<FixedOffset>,
    }

    /// A payment with its comment thread. The balance sums are only
    /// present when the client asked for them (`?balance=true`); they
    /// carry the current net owed in each direction for edit-time
    /// validation.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        #[serde(rename = "_id")]
        pub id: Uuid,
        pub payer: String,
        pub payee: String,
        pub amount: f64,
        pub date: DateTime<FixedOffset>,
        pub status: String,
        #[serde(rename = "rejectionReason", skip_serializing_if = "Option::is_none")]
        pub rejection_reason: Option<String>,
        #[serde(rename = "createdAt")]
        pub created_at: DateTime<FixedOffset>,
        pub comments: Vec<CommentView>,
        #[serde(rename = "payerBalanceSum", skip_serializing_if = "Option::is_none")]
        pub payer_balance_sum: Option<f64>,
        #[serde(rename = "payeeBalanceSum", skip_serializing_if = "Option::is_none")]
        pub payee_balance_sum: Option<f64>,
    }

    /// Query string for the payment list endpoint.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PaymentListQuery {
        pub page: Option<u64>,
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
        /// Comma-separated status allow-list.
        pub statuses: Option<String>,
    }

    /// Query string for the single-payment endpoint.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PaymentGetQuery {
        pub balance: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentListResponse {
        pub data: Vec<PaymentView>,
        pub has_more: bool,
    }
}

pub mod notification {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct NotificationView {
        #[serde(rename = "_id")]
        pub id: Uuid,
        pub message: String,
        #[serde(rename = "resourceType")]
        pub resource_type: String,
        #[serde(rename = "resourceId")]
        pub resource_id: String,
        pub household: String,
        pub timestamp: DateTime<FixedOffset>,
        pub read: bool,
    }
}

pub mod reminder {
    use super::*;

    /// Request body for nudging a debtor.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReminderNew {
        pub message: String,
        pub household: String,
        pub receiver: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ReminderView {
        #[serde(rename = "_id")]
        pub id: Uuid,
        pub creator: String,
        pub receiver: String,
        pub household: String,
        pub message: String,
        #[serde(rename = "createdAt")]
        pub created_at: DateTime<FixedOffset>,
    }
}
