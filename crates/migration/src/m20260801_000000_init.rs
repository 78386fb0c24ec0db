//! Initial schema migration - creates all tables from scratch.
//!
//! The complete schema for Householder:
//!
//! - `users`: authentication and profile data
//! - `households`: shared-expense groups
//! - `household_members`: per-household membership with a role
//! - `expenses`: ledger entries with an amount and a status
//! - `expense_allocations`: who paid / who owes per expense
//! - `payments`: settlement proposals between two members
//! - `payment_comments`: discussion thread on a payment
//! - `notifications`: per-user inbox fed by workflow transitions
//! - `reminders`: debt nudges between members

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
    Name,
    Email,
    Phone,
    AvatarColor,
}

#[derive(Iden)]
enum Households {
    Table,
    Id,
    Name,
    Archived,
}

#[derive(Iden)]
enum HouseholdMembers {
    Table,
    HouseholdId,
    UserId,
    Role,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    HouseholdId,
    Title,
    Category,
    Date,
    AmountMinor,
    Status,
    CreatedBy,
}

#[derive(Iden)]
enum ExpenseAllocations {
    Table,
    Id,
    ExpenseId,
    Kind,
    UserId,
    AmountMinor,
    Position,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    HouseholdId,
    Payer,
    Payee,
    AmountMinor,
    Date,
    Status,
    RejectionReason,
    CreatedAt,
}

#[derive(Iden)]
enum PaymentComments {
    Table,
    Id,
    PaymentId,
    Author,
    Text,
    CreatedAt,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    Recipient,
    HouseholdId,
    ResourceType,
    ResourceId,
    Message,
    CreatedAt,
    Read,
}

#[derive(Iden)]
enum Reminders {
    Table,
    Id,
    Creator,
    Receiver,
    HouseholdId,
    Message,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::Name).string())
                    .col(ColumnDef::new(Users::Email).string())
                    .col(ColumnDef::new(Users::Phone).string())
                    .col(ColumnDef::new(Users::AvatarColor).string())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Households
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Households::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Households::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Households::Name).string().not_null())
                    .col(ColumnDef::new(Households::Archived).boolean().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Household Members
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(HouseholdMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HouseholdMembers::HouseholdId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HouseholdMembers::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(HouseholdMembers::Role).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(HouseholdMembers::HouseholdId)
                            .col(HouseholdMembers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-household_members-household_id")
                            .from(HouseholdMembers::Table, HouseholdMembers::HouseholdId)
                            .to(Households::Table, Households::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-household_members-user_id")
                            .from(HouseholdMembers::Table, HouseholdMembers::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-household_members-user_id")
                    .table(HouseholdMembers::Table)
                    .col(HouseholdMembers::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::HouseholdId).string().not_null())
                    .col(ColumnDef::new(Expenses::Title).string().not_null())
                    .col(ColumnDef::new(Expenses::Category).string())
                    .col(ColumnDef::new(Expenses::Date).timestamp().not_null())
                    .col(
                        ColumnDef::new(Expenses::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::Status).string().not_null())
                    .col(ColumnDef::new(Expenses::CreatedBy).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-household_id")
                            .from(Expenses::Table, Expenses::HouseholdId)
                            .to(Households::Table, Households::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-household_id-date")
                    .table(Expenses::Table)
                    .col(Expenses::HouseholdId)
                    .col(Expenses::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Expense Allocations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExpenseAllocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseAllocations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExpenseAllocations::ExpenseId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseAllocations::Kind)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseAllocations::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseAllocations::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseAllocations::Position)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_allocations-expense_id")
                            .from(ExpenseAllocations::Table, ExpenseAllocations::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_allocations-expense_id")
                    .table(ExpenseAllocations::Table)
                    .col(ExpenseAllocations::ExpenseId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::HouseholdId).string().not_null())
                    .col(ColumnDef::new(Payments::Payer).string().not_null())
                    .col(ColumnDef::new(Payments::Payee).string().not_null())
                    .col(
                        ColumnDef::new(Payments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Date).timestamp().not_null())
                    .col(ColumnDef::new(Payments::Status).string().not_null())
                    .col(ColumnDef::new(Payments::RejectionReason).string())
                    .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-household_id")
                            .from(Payments::Table, Payments::HouseholdId)
                            .to(Households::Table, Households::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-household_id-date")
                    .table(Payments::Table)
                    .col(Payments::HouseholdId)
                    .col(Payments::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Payment Comments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PaymentComments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentComments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PaymentComments::PaymentId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentComments::Author).string().not_null())
                    .col(ColumnDef::new(PaymentComments::Text).string().not_null())
                    .col(
                        ColumnDef::new(PaymentComments::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payment_comments-payment_id")
                            .from(PaymentComments::Table, PaymentComments::PaymentId)
                            .to(Payments::Table, Payments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payment_comments-payment_id")
                    .table(PaymentComments::Table)
                    .col(PaymentComments::PaymentId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Notifications
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::Recipient).string().not_null())
                    .col(
                        ColumnDef::new(Notifications::HouseholdId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::ResourceType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::ResourceId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notifications::Message).string().not_null())
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notifications::Read).boolean().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-notifications-recipient")
                            .from(Notifications::Table, Notifications::Recipient)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-notifications-recipient")
                    .table(Notifications::Table)
                    .col(Notifications::Recipient)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 9. Reminders
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Reminders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reminders::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reminders::Creator).string().not_null())
                    .col(ColumnDef::new(Reminders::Receiver).string().not_null())
                    .col(ColumnDef::new(Reminders::HouseholdId).string().not_null())
                    .col(ColumnDef::new(Reminders::Message).string().not_null())
                    .col(ColumnDef::new(Reminders::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reminders-household_id")
                            .from(Reminders::Table, Reminders::HouseholdId)
                            .to(Households::Table, Households::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-reminders-receiver")
                    .table(Reminders::Table)
                    .col(Reminders::Receiver)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Reminders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PaymentComments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseAllocations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(HouseholdMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Households::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
