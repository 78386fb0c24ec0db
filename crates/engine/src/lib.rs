//! Householder core engine.
//!
//! The engine owns the ledger (expenses with paid/owed allocations and
//! payments between members), derives pairwise balances from it on demand,
//! drives the payment approval workflow and fans workflow transitions out
//! as notifications/reminders.

pub use allocations::{Allocation, AllocationKind};
pub use comments::Comment;
pub use error::EngineError;
pub use expenses::{Expense, ExpenseStatus};
pub use households::Household;
pub use memberships::HouseholdRole;
pub use money::Money;
pub use notifications::{Notification, ResourceType};
pub use ops::{
    AllocationShare, BalanceEntry, BalanceSide, CreateExpense, Engine, EngineBuilder,
    ExpenseListFilter, PAGE_SIZE, Page, PaymentListFilter,
};
pub use payments::{Payment, PaymentStatus};
pub use publisher::{NoopPublisher, NotificationEvent, Publisher};
pub use reminders::Reminder;

pub mod allocations;
pub mod comments;
mod error;
pub mod expenses;
pub mod households;
pub mod memberships;
mod money;
pub mod notifications;
mod ops;
pub mod payments;
mod publisher;
pub mod reminders;
pub mod users;

type ResultEngine<T> = Result<T, EngineError>;
