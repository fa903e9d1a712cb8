//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Khata:
//!
//! - `users`: authentication
//! - `people`: counterparties (customers and suppliers) owned by users
//! - `transactions`: credit/debit entries with the cached running balance
//!
//! The cascade declared on the foreign keys is a safety net only: SQLite may
//! run with foreign-key enforcement disabled, so the engine deletes child
//! rows explicitly inside its own transaction scopes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    Password,
}

#[derive(Iden)]
enum People {
    Table,
    Id,
    UserId,
    Name,
    MobileNumber,
    Type,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    PersonId,
    Amount,
    Description,
    Balance,
    PaymentType,
    CreatedAt,
    TransactionDate,
    TransactionTime,
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
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. People
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(People::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(People::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(People::UserId).integer().not_null())
                    .col(ColumnDef::new(People::Name).string().not_null())
                    .col(ColumnDef::new(People::MobileNumber).string())
                    .col(ColumnDef::new(People::Type).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-people-user_id")
                            .from(People::Table, People::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-people-user_id-type")
                    .table(People::Table)
                    .col(People::UserId)
                    .col(People::Type)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::PersonId).integer().not_null())
                    .col(ColumnDef::new(Transactions::Amount).double().not_null())
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(ColumnDef::new(Transactions::Balance).double())
                    .col(
                        ColumnDef::new(Transactions::PaymentType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Transactions::TransactionDate)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::TransactionTime)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-person_id")
                            .from(Transactions::Table, Transactions::PersonId)
                            .to(People::Table, People::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Matches the recompute ordering, so the chronological walk over one
        // person's history is index-backed.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-transactions-person_id-chronology")
                    .table(Transactions::Table)
                    .col(Transactions::PersonId)
                    .col(Transactions::TransactionDate)
                    .col(Transactions::TransactionTime)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(People::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
