use sea_orm::{QueryFilter, QueryOrder, Statement, prelude::*};

use crate::{
    PaymentKind, PersonKind, PersonSummary, ResultEngine, Transaction, transactions, util,
};

use super::Engine;

/// A person's transactions within a report window, newest first, with
/// window-bounded totals.
///
/// The totals are summed over the filtered window only; the per-row cached
/// `balance` reflects the person's full lifetime and is returned untouched
/// for display.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonStatement {
    pub transactions: Vec<Transaction>,
    pub total_balance: f64,
    pub total_credit: f64,
    pub total_debit: f64,
}

/// Lifetime credit/debit totals for one kind of counterparty.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Totals {
    pub total_credit: f64,
    pub total_debit: f64,
    pub remaining_debit: f64,
}

/// One person's row in the balance sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct SheetEntry {
    pub person_id: i32,
    pub person_name: String,
    pub kind: PersonKind,
    pub total_credit: f64,
    pub total_debit: f64,
    /// Last cached running balance, `None` for people with no transactions.
    pub balance: Option<f64>,
    pub last_date: Option<String>,
    pub last_description: Option<String>,
    /// `Credit` when the person owes the user on balance, `Debit` otherwise.
    pub status: PaymentKind,
}

/// Totals split by counterparty kind.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TypeTotals {
    pub customer: f64,
    pub supplier: f64,
}

/// The whole-ledger view: one row per person plus categorized totals.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceSheet {
    pub entries: Vec<SheetEntry>,
    pub total_received: TypeTotals,
    pub total_spent: TypeTotals,
    pub net_balance: f64,
}

impl Engine {
    /// List a user's counterparties of one kind with their lifetime
    /// balances, most recently active first, people with no transactions
    /// last, names as the tiebreak.
    pub async fn list_people(
        &self,
        user_id: i32,
        kind: PersonKind,
    ) -> ResultEngine<Vec<PersonSummary>> {
        let backend = self.database.get_database_backend();
        let rows = self
            .database
            .query_all(Statement::from_sql_and_values(
                backend,
                r#"
                SELECT
                    p.id,
                    p.name,
                    p.mobile_number,
                    COALESCE(SUM(CASE
                        WHEN t.payment_type = 'credit' THEN t.amount
                        WHEN t.payment_type = 'debit' THEN -t.amount
                        ELSE 0.0 END), 0.0) AS balance,
                    MAX(t.transaction_date || ' ' || t.transaction_time) AS last_activity
                FROM people p
                LEFT JOIN transactions t ON t.person_id = p.id
                WHERE p.user_id = ? AND p.type = ?
                GROUP BY p.id, p.name, p.mobile_number
                ORDER BY last_activity DESC NULLS LAST, p.name ASC;
                "#,
                vec![user_id.into(), kind.as_str().into()],
            ))
            .await?;

        rows.iter()
            .map(|row| {
                Ok(PersonSummary {
                    id: row.try_get("", "id")?,
                    name: row.try_get("", "name")?,
                    mobile_number: row.try_get("", "mobile_number")?,
                    balance: row.try_get("", "balance")?,
                })
            })
            .collect()
    }

    /// A person's transactions within `[start_date, end_date]`, newest
    /// first, with totals summed over the window.
    ///
    /// Missing or unparseable bounds fall back to the calendar floor and
    /// today respectively instead of failing; report screens pass through
    /// whatever the user typed.
    pub async fn statement(
        &self,
        person_id: i32,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> ResultEngine<PersonStatement> {
        let start = start_date
            .and_then(|value| util::parse_date(value).ok())
            .map(util::storage_date)
            .unwrap_or_else(|| util::WINDOW_FLOOR.to_string());
        let end = end_date
            .and_then(|value| util::parse_date(value).ok())
            .map(util::storage_date)
            .unwrap_or_else(util::today);

        let rows = transactions::Entity::find()
            .filter(transactions::Column::PersonId.eq(person_id))
            .filter(transactions::Column::TransactionDate.between(start, end))
            .order_by_desc(transactions::Column::TransactionDate)
            .order_by_desc(transactions::Column::TransactionTime)
            .order_by_desc(transactions::Column::Id)
            .all(&self.database)
            .await?;

        let mut statement = PersonStatement {
            transactions: Vec::with_capacity(rows.len()),
            total_balance: 0.0,
            total_credit: 0.0,
            total_debit: 0.0,
        };
        for row in rows {
            let entry = Transaction::try_from(row)?;
            match entry.kind {
                PaymentKind::Credit => {
                    statement.total_balance += entry.amount;
                    statement.total_credit += entry.amount;
                }
                PaymentKind::Debit => {
                    statement.total_balance -= entry.amount;
                    statement.total_debit += entry.amount;
                }
            }
            statement.transactions.push(entry);
        }

        Ok(statement)
    }

    /// Lifetime credit/debit rollup across all of a user's people of one
    /// kind. `remaining_debit` is what is still outstanding:
    /// `total_debit - total_credit`.
    pub async fn credits_and_debits(
        &self,
        user_id: i32,
        kind: PersonKind,
    ) -> ResultEngine<Totals> {
        let backend = self.database.get_database_backend();
        let row = self
            .database
            .query_one(Statement::from_sql_and_values(
                backend,
                r#"
                SELECT
                    COALESCE(SUM(CASE WHEN t.payment_type = 'credit'
                        THEN t.amount ELSE 0.0 END), 0.0) AS total_credit,
                    COALESCE(SUM(CASE WHEN t.payment_type = 'debit'
                        THEN t.amount ELSE 0.0 END), 0.0) AS total_debit
                FROM people p
                LEFT JOIN transactions t ON t.person_id = p.id
                WHERE p.user_id = ? AND p.type = ?;
                "#,
                vec![user_id.into(), kind.as_str().into()],
            ))
            .await?;

        let Some(row) = row else {
            return Ok(Totals::default());
        };
        let total_credit: f64 = row.try_get("", "total_credit")?;
        let total_debit: f64 = row.try_get("", "total_debit")?;
        Ok(Totals {
            total_credit,
            total_debit,
            remaining_debit: total_debit - total_credit,
        })
    }

    /// The whole-ledger balance sheet: one row per person with lifetime
    /// totals, plus received/spent rollups split by kind.
    ///
    /// The date bounds are accepted for caller compatibility but the sheet
    /// aggregates the person's whole history (see DESIGN.md).
    pub async fn balance_sheet(
        &self,
        user_id: i32,
        _start_date: Option<&str>,
        _end_date: Option<&str>,
    ) -> ResultEngine<BalanceSheet> {
        let backend = self.database.get_database_backend();
        let rows = self
            .database
            .query_all(Statement::from_sql_and_values(
                backend,
                r#"
                SELECT
                    p.id AS person_id,
                    p.name AS person_name,
                    p.type AS kind,
                    COALESCE(SUM(CASE WHEN t.payment_type = 'credit'
                        THEN t.amount ELSE 0.0 END), 0.0) AS total_credit,
                    COALESCE(SUM(CASE WHEN t.payment_type = 'debit'
                        THEN t.amount ELSE 0.0 END), 0.0) AS total_debit,
                    (SELECT t2.balance FROM transactions t2
                     WHERE t2.person_id = p.id
                     ORDER BY t2.transaction_date DESC, t2.transaction_time DESC,
                              t2.id DESC
                     LIMIT 1) AS balance,
                    (SELECT t2.transaction_date FROM transactions t2
                     WHERE t2.person_id = p.id
                     ORDER BY t2.transaction_date DESC, t2.transaction_time DESC,
                              t2.id DESC
                     LIMIT 1) AS last_date,
                    (SELECT t2.description FROM transactions t2
                     WHERE t2.person_id = p.id
                     ORDER BY t2.transaction_date DESC, t2.transaction_time DESC,
                              t2.id DESC
                     LIMIT 1) AS last_description
                FROM people p
                LEFT JOIN transactions t ON t.person_id = p.id
                WHERE p.user_id = ?
                GROUP BY p.id, p.name, p.type
                ORDER BY p.name ASC;
                "#,
                vec![user_id.into()],
            ))
            .await?;

        let mut sheet = BalanceSheet {
            entries: Vec::with_capacity(rows.len()),
            total_received: TypeTotals::default(),
            total_spent: TypeTotals::default(),
            net_balance: 0.0,
        };
        for row in rows.iter() {
            let kind = PersonKind::try_from(row.try_get::<String>("", "kind")?.as_str())?;
            let total_credit: f64 = row.try_get("", "total_credit")?;
            let total_debit: f64 = row.try_get("", "total_debit")?;

            match kind {
                PersonKind::Customer => {
                    sheet.total_received.customer += total_credit;
                    sheet.total_spent.customer += total_debit;
                }
                PersonKind::Supplier => {
                    sheet.total_received.supplier += total_credit;
                    sheet.total_spent.supplier += total_debit;
                }
            }

            let status = if total_credit - total_debit >= 0.0 {
                PaymentKind::Credit
            } else {
                PaymentKind::Debit
            };
            sheet.entries.push(SheetEntry {
                person_id: row.try_get("", "person_id")?,
                person_name: row.try_get("", "person_name")?,
                kind,
                total_credit,
                total_debit,
                balance: row.try_get("", "balance")?,
                last_date: row.try_get("", "last_date")?,
                last_description: row.try_get("", "last_description")?,
                status,
            });
        }

        sheet.net_balance = (sheet.total_received.customer - sheet.total_spent.customer)
            + (sheet.total_received.supplier - sheet.total_spent.supplier);

        Ok(sheet)
    }
}
