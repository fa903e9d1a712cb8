use sea_orm::{ActiveValue, Statement, TransactionTrait, prelude::*};

use crate::{Person, PersonKind, ResultEngine, people};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

impl Engine {
    /// Add a counterparty under a user's ledger. The kind is fixed for the
    /// person's lifetime.
    pub async fn add_person(
        &self,
        user_id: i32,
        name: &str,
        kind: PersonKind,
        mobile_number: Option<&str>,
    ) -> ResultEngine<i32> {
        let name = normalize_required_text(name, "person name")?;
        let mobile_number = normalize_optional_text(mobile_number);
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;

            let person = people::ActiveModel {
                user_id: ActiveValue::Set(user_id),
                name: ActiveValue::Set(name.clone()),
                mobile_number: ActiveValue::Set(mobile_number.clone()),
                kind: ActiveValue::Set(kind.as_str().to_string()),
                ..Default::default()
            };
            let inserted = person.insert(&db_tx).await?;
            Ok(inserted.id)
        })
    }

    /// Rename a person or change their mobile number. The kind and owner
    /// never change.
    pub async fn update_person(
        &self,
        person_id: i32,
        name: &str,
        mobile_number: Option<&str>,
    ) -> ResultEngine<()> {
        let name = normalize_required_text(name, "person name")?;
        let mobile_number = normalize_optional_text(mobile_number);
        with_tx!(self, |db_tx| {
            let current = self.require_person(&db_tx, person_id).await?;

            let mut person: people::ActiveModel = current.into();
            person.name = ActiveValue::Set(name.clone());
            person.mobile_number = ActiveValue::Set(mobile_number.clone());
            person.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Delete a person and every transaction they own, all or nothing.
    pub async fn delete_person(&self, person_id: i32) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_person(&db_tx, person_id).await?;
            let backend = self.database.get_database_backend();

            // Explicit cascade; the FK's declarative cascade only applies
            // when SQLite enforces foreign keys at all.
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM transactions WHERE person_id = ?;",
                    vec![person_id.into()],
                ))
                .await?;
            people::Entity::delete_by_id(person_id).exec(&db_tx).await?;

            Ok(())
        })
    }

    /// Fetch one person.
    pub async fn person(&self, person_id: i32) -> ResultEngine<Person> {
        people::Entity::find_by_id(person_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| crate::EngineError::NotFound("person".to_string()))
            .and_then(Person::try_from)
    }
}
