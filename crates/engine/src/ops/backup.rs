use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    ImportSummary, PersonKind, ResultEngine, SNAPSHOT_VERSION, Snapshot, SnapshotPerson,
    SnapshotTransaction, TableDump, people, transactions, users, util,
};

use super::{Engine, normalize_optional_text, with_tx};

impl Engine {
    /// Build the structured backup document for one user: every person of
    /// both kinds with their lifetime balance, and every transaction tagged
    /// with its owner's id, name and kind.
    pub async fn export_snapshot(&self, user_id: i32) -> ResultEngine<Snapshot> {
        let customers = self.snapshot_people(user_id, PersonKind::Customer).await?;
        let suppliers = self.snapshot_people(user_id, PersonKind::Supplier).await?;

        let mut tagged = Vec::new();
        for person in customers.iter().chain(suppliers.iter()) {
            let rows = transactions::Entity::find()
                .filter(transactions::Column::PersonId.eq(person.id))
                .order_by_desc(transactions::Column::TransactionDate)
                .order_by_desc(transactions::Column::TransactionTime)
                .order_by_desc(transactions::Column::Id)
                .all(&self.database)
                .await?;
            for row in rows {
                tagged.push(SnapshotTransaction {
                    id: row.id,
                    amount: row.amount,
                    description: row.description.unwrap_or_default(),
                    transaction_date: row.transaction_date,
                    transaction_time: row.transaction_time,
                    payment_type: crate::PaymentKind::try_from(row.payment_type.as_str())?,
                    balance: row.balance,
                    person_id: person.id,
                    person_name: person.name.clone(),
                    kind: person.kind,
                });
            }
        }

        Ok(Snapshot {
            version: SNAPSHOT_VERSION.to_string(),
            timestamp: Utc::now(),
            customers,
            suppliers,
            transactions: tagged,
        })
    }

    /// Dump the three tables verbatim.
    pub async fn export_tables(&self) -> ResultEngine<TableDump> {
        Ok(TableDump {
            user: users::Entity::find().all(&self.database).await?,
            people: people::Entity::find().all(&self.database).await?,
            transactions: transactions::Entity::find().all(&self.database).await?,
        })
    }

    /// Restore a structured backup under `user_id`.
    ///
    /// People are inserted with fresh ids; transactions find their new owner
    /// through a `(name, kind)` map. Two imported people sharing a name and
    /// kind collide in that map and the later insert wins - an inherited
    /// limitation of the document format, which carries no stable identity.
    /// Transactions whose owner cannot be resolved are counted and skipped.
    /// Once the rows are in, every touched person gets a balance recompute,
    /// all inside the same database transaction.
    pub async fn import_snapshot(
        &self,
        user_id: i32,
        snapshot: &Snapshot,
    ) -> ResultEngine<ImportSummary> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;

            let mut summary = ImportSummary::default();
            let mut resolved: HashMap<(String, PersonKind), i32> = HashMap::new();

            for person in snapshot.customers.iter().chain(snapshot.suppliers.iter()) {
                let row = people::ActiveModel {
                    user_id: ActiveValue::Set(user_id),
                    name: ActiveValue::Set(person.name.clone()),
                    mobile_number: ActiveValue::Set(person.mobile_number.clone()),
                    kind: ActiveValue::Set(person.kind.as_str().to_string()),
                    ..Default::default()
                };
                let inserted = row.insert(&db_tx).await?;
                resolved.insert((person.name.clone(), person.kind), inserted.id);
                match person.kind {
                    PersonKind::Customer => summary.customers += 1,
                    PersonKind::Supplier => summary.suppliers += 1,
                }
            }

            let mut touched: BTreeSet<i32> = BTreeSet::new();
            for entry in &snapshot.transactions {
                let key = (entry.person_name.clone(), entry.kind);
                let Some(&person_id) = resolved.get(&key) else {
                    summary.skipped += 1;
                    continue;
                };

                let date = util::storage_date(util::parse_date(&entry.transaction_date)?);
                let time = util::storage_time(util::parse_time(&entry.transaction_time)?);
                let row = transactions::ActiveModel {
                    person_id: ActiveValue::Set(person_id),
                    amount: ActiveValue::Set(entry.amount),
                    description: ActiveValue::Set(normalize_optional_text(Some(
                        entry.description.as_str(),
                    ))),
                    balance: ActiveValue::Set(None),
                    payment_type: ActiveValue::Set(entry.payment_type.as_str().to_string()),
                    created_at: ActiveValue::Set(Utc::now()),
                    transaction_date: ActiveValue::Set(date),
                    transaction_time: ActiveValue::Set(time),
                    ..Default::default()
                };
                row.insert(&db_tx).await?;
                touched.insert(person_id);
                summary.transactions += 1;
            }

            for person_id in touched {
                self.recompute_person_balances(&db_tx, person_id).await?;
            }

            Ok(summary)
        })
    }

    async fn snapshot_people(
        &self,
        user_id: i32,
        kind: PersonKind,
    ) -> ResultEngine<Vec<SnapshotPerson>> {
        let summaries = self.list_people(user_id, kind).await?;
        Ok(summaries
            .into_iter()
            .map(|person| SnapshotPerson {
                id: person.id,
                name: person.name,
                mobile_number: person.mobile_number,
                balance: person.balance,
                kind,
            })
            .collect())
    }
}
