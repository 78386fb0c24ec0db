use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{EngineError, NoopPublisher, Publisher, ResultEngine};

mod access;
mod balances;
mod households;
mod ledger;
mod notifications;
mod payments;

pub use balances::{BalanceEntry, BalanceSide};
pub use ledger::{
    AllocationShare, CreateExpense, ExpenseListFilter, PAGE_SIZE, Page, PaymentListFilter,
};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    publisher: Arc<dyn Publisher>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    publisher: Arc<dyn Publisher>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            publisher: Arc::new(NoopPublisher),
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Pass the real-time publisher (defaults to a no-op).
    pub fn publisher(mut self, publisher: Arc<dyn Publisher>) -> EngineBuilder {
        self.publisher = publisher;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            publisher: self.publisher,
        })
    }
}
