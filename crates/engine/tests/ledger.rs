use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Engine, EngineError, PaymentKind, PersonKind};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection, i32) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    let user_id = engine
        .register_user("alice@example.com", "password")
        .await
        .unwrap();
    (engine, db, user_id)
}

/// Cached balances for a person, oldest first.
async fn balances_ascending(engine: &Engine, person_id: i32) -> Vec<f64> {
    let statement = engine.statement(person_id, None, None).await.unwrap();
    statement
        .transactions
        .iter()
        .rev()
        .map(|tx| tx.balance.expect("balance cached"))
        .collect()
}

#[tokio::test]
async fn migrating_twice_is_a_no_op() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
}

#[tokio::test]
async fn out_of_order_inserts_recompute_the_whole_history() {
    let (engine, _db, user_id) = engine_with_db().await;
    let person_id = engine
        .add_person(user_id, "Ravi", PersonKind::Customer, None)
        .await
        .unwrap();

    // Inserted newest-first on purpose; every insert reflows from scratch.
    engine
        .add_transaction(
            person_id,
            100.0,
            "cloth",
            "3/1/2024",
            "10:00:00 AM",
            PaymentKind::Credit,
        )
        .await
        .unwrap();
    engine
        .add_transaction(
            person_id,
            50.0,
            "advance",
            "1/1/2024",
            "10:00:00 AM",
            PaymentKind::Credit,
        )
        .await
        .unwrap();
    engine
        .add_transaction(
            person_id,
            20.0,
            "return",
            "2/1/2024",
            "10:00:00 AM",
            PaymentKind::Debit,
        )
        .await
        .unwrap();

    assert_eq!(
        balances_ascending(&engine, person_id).await,
        vec![50.0, 30.0, 130.0]
    );
}

#[tokio::test]
async fn deleting_the_middle_transaction_reflows_later_balances() {
    let (engine, _db, user_id) = engine_with_db().await;
    let person_id = engine
        .add_person(user_id, "Ravi", PersonKind::Customer, None)
        .await
        .unwrap();

    engine
        .add_transaction(
            person_id,
            100.0,
            "cloth",
            "3/1/2024",
            "10:00:00 AM",
            PaymentKind::Credit,
        )
        .await
        .unwrap();
    engine
        .add_transaction(
            person_id,
            50.0,
            "advance",
            "1/1/2024",
            "10:00:00 AM",
            PaymentKind::Credit,
        )
        .await
        .unwrap();
    let middle = engine
        .add_transaction(
            person_id,
            20.0,
            "return",
            "2/1/2024",
            "10:00:00 AM",
            PaymentKind::Debit,
        )
        .await
        .unwrap();

    engine.delete_transaction(middle).await.unwrap();

    assert_eq!(
        balances_ascending(&engine, person_id).await,
        vec![50.0, 150.0]
    );
}

#[tokio::test]
async fn delete_then_readd_restores_the_same_sequence() {
    let (engine, _db, user_id) = engine_with_db().await;
    let person_id = engine
        .add_person(user_id, "Ravi", PersonKind::Customer, None)
        .await
        .unwrap();

    engine
        .add_transaction(
            person_id,
            50.0,
            "advance",
            "1/1/2024",
            "10:00:00 AM",
            PaymentKind::Credit,
        )
        .await
        .unwrap();
    let middle = engine
        .add_transaction(
            person_id,
            20.0,
            "return",
            "2/1/2024",
            "10:00:00 AM",
            PaymentKind::Debit,
        )
        .await
        .unwrap();
    engine
        .add_transaction(
            person_id,
            100.0,
            "cloth",
            "3/1/2024",
            "10:00:00 AM",
            PaymentKind::Credit,
        )
        .await
        .unwrap();
    let before = balances_ascending(&engine, person_id).await;

    engine.delete_transaction(middle).await.unwrap();
    engine
        .add_transaction(
            person_id,
            20.0,
            "return",
            "2/1/2024",
            "10:00:00 AM",
            PaymentKind::Debit,
        )
        .await
        .unwrap();

    assert_eq!(balances_ascending(&engine, person_id).await, before);
    assert_eq!(before, vec![50.0, 30.0, 130.0]);
}

#[tokio::test]
async fn updating_amount_reflows_balances() {
    let (engine, _db, user_id) = engine_with_db().await;
    let person_id = engine
        .add_person(user_id, "Ravi", PersonKind::Customer, None)
        .await
        .unwrap();

    let first = engine
        .add_transaction(
            person_id,
            50.0,
            "advance",
            "1/1/2024",
            "10:00:00 AM",
            PaymentKind::Credit,
        )
        .await
        .unwrap();
    engine
        .add_transaction(
            person_id,
            20.0,
            "return",
            "2/1/2024",
            "10:00:00 AM",
            PaymentKind::Debit,
        )
        .await
        .unwrap();

    engine
        .update_transaction(first, person_id, 80.0, "advance, corrected")
        .await
        .unwrap();

    assert_eq!(
        balances_ascending(&engine, person_id).await,
        vec![80.0, 60.0]
    );
}

#[tokio::test]
async fn update_checks_ownership_and_existence() {
    let (engine, _db, user_id) = engine_with_db().await;
    let person_id = engine
        .add_person(user_id, "Ravi", PersonKind::Customer, None)
        .await
        .unwrap();
    let other_id = engine
        .add_person(user_id, "Sita", PersonKind::Customer, None)
        .await
        .unwrap();
    let tx_id = engine
        .add_transaction(
            person_id,
            50.0,
            "advance",
            "1/1/2024",
            "10:00:00 AM",
            PaymentKind::Credit,
        )
        .await
        .unwrap();

    let err = engine
        .update_transaction(tx_id + 1, person_id, 10.0, "")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("transaction".to_string()));

    let err = engine
        .update_transaction(tx_id, other_id, 10.0, "")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("transaction".to_string()));

    let err = engine.delete_transaction(tx_id + 1).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound("transaction".to_string()));
}

#[tokio::test]
async fn add_transaction_validates_input() {
    let (engine, _db, user_id) = engine_with_db().await;
    let person_id = engine
        .add_person(user_id, "Ravi", PersonKind::Customer, None)
        .await
        .unwrap();

    let err = engine
        .add_transaction(
            person_id,
            0.0,
            "",
            "1/1/2024",
            "10:00:00 AM",
            PaymentKind::Credit,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .add_transaction(
            person_id,
            10.0,
            "",
            "first of march",
            "10:00:00 AM",
            PaymentKind::Credit,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .add_transaction(person_id, 10.0, "", "1/1/2024", "10 o'clock", PaymentKind::Credit)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // Unknown person.
    let err = engine
        .add_transaction(
            person_id + 100,
            10.0,
            "",
            "1/1/2024",
            "10:00:00 AM",
            PaymentKind::Credit,
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("person".to_string()));
}

#[tokio::test]
async fn accepted_date_formats_normalize_to_one_chronology() {
    let (engine, _db, user_id) = engine_with_db().await;
    let person_id = engine
        .add_person(user_id, "Ravi", PersonKind::Customer, None)
        .await
        .unwrap();

    // Same calendar day written three ways plus an unambiguous day-first
    // date; times disambiguate the order within the day.
    engine
        .add_transaction(
            person_id,
            10.0,
            "",
            "2024-03-01",
            "09:00:00",
            PaymentKind::Credit,
        )
        .await
        .unwrap();
    engine
        .add_transaction(
            person_id,
            10.0,
            "",
            "3/1/2024",
            "1:00:00 PM",
            PaymentKind::Credit,
        )
        .await
        .unwrap();
    engine
        .add_transaction(
            person_id,
            10.0,
            "",
            "03/01/2024",
            "11:30:00 PM",
            PaymentKind::Credit,
        )
        .await
        .unwrap();
    engine
        .add_transaction(
            person_id,
            10.0,
            "",
            "25/12/2024",
            "08:00:00",
            PaymentKind::Credit,
        )
        .await
        .unwrap();

    let statement = engine.statement(person_id, None, None).await.unwrap();
    let dates: Vec<String> = statement
        .transactions
        .iter()
        .map(|tx| tx.date.to_string())
        .collect();
    assert_eq!(
        dates,
        vec!["2024-12-25", "2024-03-01", "2024-03-01", "2024-03-01"]
    );
    assert_eq!(
        balances_ascending(&engine, person_id).await,
        vec![10.0, 20.0, 30.0, 40.0]
    );
}

#[tokio::test]
async fn deleting_a_person_cascades_to_their_transactions() {
    let (engine, db, user_id) = engine_with_db().await;
    let person_id = engine
        .add_person(user_id, "Ravi", PersonKind::Customer, Some("0300-1234567"))
        .await
        .unwrap();
    engine
        .add_transaction(
            person_id,
            50.0,
            "advance",
            "1/1/2024",
            "10:00:00 AM",
            PaymentKind::Credit,
        )
        .await
        .unwrap();
    engine
        .add_transaction(
            person_id,
            20.0,
            "return",
            "2/1/2024",
            "10:00:00 AM",
            PaymentKind::Debit,
        )
        .await
        .unwrap();

    engine.delete_person(person_id).await.unwrap();

    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT COUNT(*) AS n FROM transactions WHERE person_id = ?;",
            vec![person_id.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let remaining: i64 = row.try_get("", "n").unwrap();
    assert_eq!(remaining, 0);

    let err = engine.person(person_id).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound("person".to_string()));
}

#[tokio::test]
async fn person_and_user_validation() {
    let (engine, _db, user_id) = engine_with_db().await;

    let err = engine
        .add_person(user_id, "   ", PersonKind::Customer, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .add_person(user_id + 1, "Ravi", PersonKind::Customer, None)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("user".to_string()));

    let err = engine
        .register_user("alice@example.com", "other")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .authenticate_user("alice@example.com", "wrong")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("user".to_string()));

    let id = engine
        .authenticate_user("alice@example.com", "password")
        .await
        .unwrap();
    assert_eq!(id, user_id);
    assert_eq!(
        engine.user_email(user_id).await.unwrap(),
        "alice@example.com"
    );
}

#[tokio::test]
async fn deleting_a_user_removes_their_whole_ledger() {
    let (engine, db, user_id) = engine_with_db().await;
    let person_id = engine
        .add_person(user_id, "Ravi", PersonKind::Supplier, None)
        .await
        .unwrap();
    engine
        .add_transaction(
            person_id,
            50.0,
            "stock",
            "1/1/2024",
            "10:00:00 AM",
            PaymentKind::Debit,
        )
        .await
        .unwrap();

    engine.delete_user(user_id).await.unwrap();

    let backend = db.get_database_backend();
    for (table, expected) in [("users", 0i64), ("people", 0), ("transactions", 0)] {
        let row = db
            .query_one(Statement::from_string(
                backend,
                format!("SELECT COUNT(*) AS n FROM {table};"),
            ))
            .await
            .unwrap()
            .unwrap();
        let count: i64 = row.try_get("", "n").unwrap();
        assert_eq!(count, expected, "table {table}");
    }
}
