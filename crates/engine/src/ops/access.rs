use sea_orm::{DatabaseTransaction, prelude::*};

use crate::{EngineError, ResultEngine, people, transactions, users};

use super::Engine;

/// Generates a `require_*` guard that loads a row by id or fails with
/// `NotFound`.
macro_rules! impl_require_row {
    ($fn_name:ident, $entity:path, $model:ty, $label:literal) => {
        pub(super) async fn $fn_name(
            &self,
            db: &DatabaseTransaction,
            id: i32,
        ) -> ResultEngine<$model> {
            <$entity>::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| EngineError::NotFound($label.to_string()))
        }
    };
}

impl Engine {
    impl_require_row!(require_user, users::Entity, users::Model, "user");

    impl_require_row!(require_person, people::Entity, people::Model, "person");

    impl_require_row!(
        require_transaction,
        transactions::Entity,
        transactions::Model,
        "transaction"
    );
}
