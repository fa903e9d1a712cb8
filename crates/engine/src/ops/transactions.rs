use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{EngineError, PaymentKind, ResultEngine, transactions, util};

use super::{Engine, normalize_optional_text, with_tx};

impl Engine {
    /// Record a credit or debit against a person.
    ///
    /// The date and time are accepted in any of the documented input formats
    /// and normalized to the canonical storage form before the insert. The
    /// row is inserted with a `NULL` balance and the person's whole history
    /// is recomputed in the same database transaction, so a new entry dated
    /// in the past reflows every later balance before anything becomes
    /// visible.
    pub async fn add_transaction(
        &self,
        person_id: i32,
        amount: f64,
        description: &str,
        date: &str,
        time: &str,
        kind: PaymentKind,
    ) -> ResultEngine<i32> {
        ensure_positive_amount(amount)?;
        let date = util::storage_date(util::parse_date(date)?);
        let time = util::storage_time(util::parse_time(time)?);
        let description = normalize_optional_text(Some(description));

        with_tx!(self, |db_tx| {
            self.require_person(&db_tx, person_id).await?;

            let entry = transactions::ActiveModel {
                person_id: ActiveValue::Set(person_id),
                amount: ActiveValue::Set(amount),
                description: ActiveValue::Set(description.clone()),
                balance: ActiveValue::Set(None),
                payment_type: ActiveValue::Set(kind.as_str().to_string()),
                created_at: ActiveValue::Set(Utc::now()),
                transaction_date: ActiveValue::Set(date.clone()),
                transaction_time: ActiveValue::Set(time.clone()),
                ..Default::default()
            };
            let inserted = entry.insert(&db_tx).await?;

            self.recompute_person_balances(&db_tx, person_id).await?;
            Ok(inserted.id)
        })
    }

    /// Change a transaction's amount or description.
    ///
    /// The payment type, date and time are deliberately immutable here: an
    /// edit never moves an entry's chronological position, it only changes
    /// its magnitude, so a recompute of the owning person is sufficient.
    pub async fn update_transaction(
        &self,
        transaction_id: i32,
        person_id: i32,
        amount: f64,
        description: &str,
    ) -> ResultEngine<()> {
        ensure_positive_amount(amount)?;
        let description = normalize_optional_text(Some(description));

        with_tx!(self, |db_tx| {
            let current = self.require_transaction(&db_tx, transaction_id).await?;
            if current.person_id != person_id {
                return Err(EngineError::NotFound("transaction".to_string()));
            }

            let mut entry: transactions::ActiveModel = current.into();
            entry.amount = ActiveValue::Set(amount);
            entry.description = ActiveValue::Set(description.clone());
            entry.update(&db_tx).await?;

            self.recompute_person_balances(&db_tx, person_id).await?;
            Ok(())
        })
    }

    /// Remove a transaction and reflow the owning person's balances.
    pub async fn delete_transaction(&self, transaction_id: i32) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let current = self.require_transaction(&db_tx, transaction_id).await?;
            let person_id = current.person_id;

            transactions::Entity::delete_by_id(transaction_id)
                .exec(&db_tx)
                .await?;

            self.recompute_person_balances(&db_tx, person_id).await?;
            Ok(())
        })
    }

    /// Rebuild the cached running balance for every transaction of one
    /// person.
    ///
    /// Mutations call the recompute themselves inside their own transaction
    /// scope; this standalone form exists for callers repairing state, e.g.
    /// after a restore.
    pub async fn recompute_balances(&self, person_id: i32) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_person(&db_tx, person_id).await?;
            self.recompute_person_balances(&db_tx, person_id).await?;
            Ok(())
        })
    }

    /// Walk one person's transactions in chronological order and write back
    /// each row's running balance.
    ///
    /// The walk is always a full pass from the start of history: entries can
    /// be inserted or deleted out of chronological order relative to id
    /// order, so adjusting "rows after the change" is not well-defined.
    pub(super) async fn recompute_person_balances(
        &self,
        db_tx: &DatabaseTransaction,
        person_id: i32,
    ) -> ResultEngine<()> {
        let rows = transactions::Entity::find()
            .filter(transactions::Column::PersonId.eq(person_id))
            .order_by_asc(transactions::Column::TransactionDate)
            .order_by_asc(transactions::Column::TransactionTime)
            .order_by_asc(transactions::Column::Id)
            .all(db_tx)
            .await?;

        let mut running = 0.0_f64;
        for row in rows {
            let kind = PaymentKind::try_from(row.payment_type.as_str())?;
            running += kind.signed(row.amount);

            let update = transactions::ActiveModel {
                id: ActiveValue::Set(row.id),
                balance: ActiveValue::Set(Some(running)),
                ..Default::default()
            };
            update.update(db_tx).await?;
        }

        Ok(())
    }
}

fn ensure_positive_amount(amount: f64) -> ResultEngine<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "amount must be > 0, got {amount}"
        )))
    }
}
