use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use publish::ChannelPublisher;
pub use server::{ServerState, router, run, run_with_listener};

mod balances;
mod expenses;
mod notifications;
mod payments;
mod publish;
mod reminders;
mod server;

pub mod types {
    pub mod balance {
        pub use api_types::balance::BalanceView;
    }

    pub mod expense {
        pub use api_types::expense::{
            AllocationEntry, ExpenseListQuery, ExpenseListResponse, ExpenseNew, ExpenseView,
        };
    }

    pub mod payment {
        pub use api_types::payment::{
            CommentNew, CommentView, PaymentEdit, PaymentGetQuery, PaymentListQuery,
            PaymentListResponse, PaymentNew, PaymentView, RejectBody,
        };
    }

    pub mod notification {
        pub use api_types::notification::NotificationView;
    }

    pub mod reminder {
        pub use api_types::reminder::{ReminderNew, ReminderView};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
