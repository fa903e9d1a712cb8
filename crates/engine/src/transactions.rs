//! Transaction primitives.
//!
//! A transaction records a single credit or debit against one person. The
//! `balance` column caches the running signed sum of the person's history in
//! `(transaction_date, transaction_time)` order; it is written exclusively
//! by the engine's recompute pass and is `NULL` only between an insert and
//! the recompute that follows it inside the same database transaction.
//!
//! Sign convention: a credit *increases* the counterparty balance, a debit
//! *decreases* it. Amounts are stored as positive magnitudes; the sign lives
//! in `payment_type`.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, util};

/// The direction of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Credit,
    Debit,
}

impl PaymentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    /// Applies the sign convention to a stored magnitude.
    pub fn signed(self, amount: f64) -> f64 {
        match self {
            Self::Credit => amount,
            Self::Debit => -amount,
        }
    }
}

impl TryFrom<&str> for PaymentKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(EngineError::Validation(format!(
                "invalid payment type: {other}"
            ))),
        }
    }
}

/// A ledger entry as the engine hands it out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i32,
    pub person_id: i32,
    pub amount: f64,
    pub description: String,
    pub balance: Option<f64>,
    pub kind: PaymentKind,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub person_id: i32,
    #[sea_orm(column_type = "Double")]
    pub amount: f64,
    pub description: Option<String>,
    #[sea_orm(column_type = "Double", nullable)]
    pub balance: Option<f64>,
    pub payment_type: String,
    pub created_at: DateTimeUtc,
    pub transaction_date: String,
    pub transaction_time: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::people::Entity",
        from = "Column::PersonId",
        to = "super::people::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    People,
}

impl Related<super::people::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::People.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            person_id: model.person_id,
            amount: model.amount,
            description: model.description.unwrap_or_default(),
            balance: model.balance,
            kind: PaymentKind::try_from(model.payment_type.as_str())?,
            date: util::parse_stored_date(&model.transaction_date)?,
            time: util::parse_stored_time(&model.transaction_time)?,
            created_at: model.created_at,
        })
    }
}
