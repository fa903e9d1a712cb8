use sea_orm::{ActiveValue, QueryFilter, Statement, TransactionTrait, prelude::*};

use crate::{EngineError, ResultEngine, users};

use super::{Engine, normalize_required_text, with_tx};

impl Engine {
    /// Register a new user. The email must not already be taken.
    pub async fn register_user(&self, email: &str, password: &str) -> ResultEngine<i32> {
        let email = normalize_required_text(email, "email")?;
        let password = normalize_required_text(password, "password")?;
        with_tx!(self, |db_tx| {
            let exists = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::Validation(format!(
                    "email already registered: {email}"
                )));
            }

            let user = users::ActiveModel {
                email: ActiveValue::Set(email.clone()),
                password: ActiveValue::Set(password.clone()),
                ..Default::default()
            };
            let inserted = user.insert(&db_tx).await?;
            Ok(inserted.id)
        })
    }

    /// Look up a user by credentials. A mismatch is indistinguishable from a
    /// missing account.
    pub async fn authenticate_user(&self, email: &str, password: &str) -> ResultEngine<i32> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email.trim().to_string()))
            .filter(users::Column::Password.eq(password.to_string()))
            .one(&self.database)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| EngineError::NotFound("user".to_string()))
    }

    pub async fn user_email(&self, user_id: i32) -> ResultEngine<String> {
        users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .map(|user| user.email)
            .ok_or_else(|| EngineError::NotFound("user".to_string()))
    }

    /// Delete a user together with their people and transactions.
    ///
    /// The cascade is explicit: SQLite may run with foreign-key enforcement
    /// disabled, so the declarative `ON DELETE CASCADE` cannot be trusted.
    pub async fn delete_user(&self, user_id: i32) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let backend = self.database.get_database_backend();

            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM transactions WHERE person_id IN \
                     (SELECT id FROM people WHERE user_id = ?);",
                    vec![user_id.into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM people WHERE user_id = ?;",
                    vec![user_id.into()],
                ))
                .await?;
            users::Entity::delete_by_id(user_id).exec(&db_tx).await?;

            Ok(())
        })
    }
}
