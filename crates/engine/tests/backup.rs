use chrono::Utc;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Engine, EngineError, PaymentKind, PersonKind, SNAPSHOT_VERSION, Snapshot, SnapshotPerson,
    SnapshotTransaction,
};
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

fn snapshot_tx(
    person_name: &str,
    kind: PersonKind,
    payment_type: PaymentKind,
    amount: f64,
    date: &str,
) -> SnapshotTransaction {
    SnapshotTransaction {
        id: 0,
        amount,
        description: "imported".to_string(),
        transaction_date: date.to_string(),
        transaction_time: "10:00:00".to_string(),
        payment_type,
        balance: None,
        person_id: 0,
        person_name: person_name.to_string(),
        kind,
    }
}

#[tokio::test]
async fn export_import_round_trips_people_and_balances() {
    let (engine, _db, user_id) = engine_with_db().await;
    let ravi = engine
        .add_person(user_id, "Ravi", PersonKind::Customer, Some("0300-1234567"))
        .await
        .unwrap();
    let mills = engine
        .add_person(user_id, "Mills Ltd", PersonKind::Supplier, None)
        .await
        .unwrap();

    engine
        .add_transaction(ravi, 100.0, "cloth", "3/1/2024", "10:00:00 AM", PaymentKind::Credit)
        .await
        .unwrap();
    engine
        .add_transaction(ravi, 20.0, "return", "2/1/2024", "10:00:00 AM", PaymentKind::Debit)
        .await
        .unwrap();
    engine
        .add_transaction(mills, 200.0, "stock", "1/1/2024", "09:00:00", PaymentKind::Debit)
        .await
        .unwrap();

    let snapshot = engine.export_snapshot(user_id).await.unwrap();
    assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    assert_eq!(snapshot.customers.len(), 1);
    assert_eq!(snapshot.suppliers.len(), 1);
    assert_eq!(snapshot.transactions.len(), 3);

    // The document survives a serialization round trip intact.
    let raw = serde_json::to_string(&snapshot).unwrap();
    let parsed = Snapshot::from_json(&raw).unwrap();
    assert_eq!(parsed, snapshot);

    // Restore into a fresh store under a brand-new user.
    let (other_engine, _other_db, other_user) = engine_with_db().await;
    let summary = other_engine
        .import_snapshot(other_user, &parsed)
        .await
        .unwrap();
    assert_eq!(summary.customers, 1);
    assert_eq!(summary.suppliers, 1);
    assert_eq!(summary.transactions, 3);
    assert_eq!(summary.skipped, 0);

    let customers = other_engine
        .list_people(other_user, PersonKind::Customer)
        .await
        .unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].name, "Ravi");
    assert_eq!(customers[0].mobile_number.as_deref(), Some("0300-1234567"));
    assert_eq!(customers[0].balance, 80.0);

    // Balances are recomputed as part of the import, so the cached sequence
    // matches the source ledger immediately.
    let statement = other_engine
        .statement(customers[0].id, None, None)
        .await
        .unwrap();
    let balances: Vec<Option<f64>> = statement.transactions.iter().map(|t| t.balance).collect();
    assert_eq!(balances, vec![Some(80.0), Some(-20.0)]);

    let suppliers = other_engine
        .list_people(other_user, PersonKind::Supplier)
        .await
        .unwrap();
    assert_eq!(suppliers[0].balance, -200.0);
}

#[tokio::test]
async fn malformed_documents_are_rejected() {
    let missing_transactions = r#"{
        "version": "1.0",
        "timestamp": "2025-01-01T00:00:00Z",
        "customers": [],
        "suppliers": []
    }"#;
    let err = Snapshot::from_json(missing_transactions).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = Snapshot::from_json("not json at all").unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let unknown_kind = r#"{
        "version": "1.0",
        "timestamp": "2025-01-01T00:00:00Z",
        "customers": [{"id": 1, "name": "Ravi", "mobile_number": null,
                       "balance": 0.0, "type": "friend"}],
        "suppliers": [],
        "transactions": []
    }"#;
    let err = Snapshot::from_json(unknown_kind).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn unresolvable_transactions_are_skipped_softly() {
    let (engine, _db, user_id) = engine_with_db().await;

    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION.to_string(),
        timestamp: Utc::now(),
        customers: vec![SnapshotPerson {
            id: 7,
            name: "Ravi".to_string(),
            mobile_number: None,
            balance: 0.0,
            kind: PersonKind::Customer,
        }],
        suppliers: vec![],
        transactions: vec![
            snapshot_tx("Ravi", PersonKind::Customer, PaymentKind::Credit, 50.0, "1/1/2024"),
            // Name matches but the kind does not: no resolution.
            snapshot_tx("Ravi", PersonKind::Supplier, PaymentKind::Debit, 10.0, "1/2/2024"),
            snapshot_tx("Nobody", PersonKind::Customer, PaymentKind::Debit, 10.0, "1/3/2024"),
        ],
    };

    let summary = engine.import_snapshot(user_id, &snapshot).await.unwrap();
    assert_eq!(summary.customers, 1);
    assert_eq!(summary.transactions, 1);
    assert_eq!(summary.skipped, 2);

    let people = engine
        .list_people(user_id, PersonKind::Customer)
        .await
        .unwrap();
    assert_eq!(people[0].balance, 50.0);
}

#[tokio::test]
async fn duplicate_name_and_kind_collide_last_insert_wins() {
    let (engine, _db, user_id) = engine_with_db().await;

    let duplicate = |id: i32| SnapshotPerson {
        id,
        name: "Ravi".to_string(),
        mobile_number: None,
        balance: 0.0,
        kind: PersonKind::Customer,
    };
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION.to_string(),
        timestamp: Utc::now(),
        customers: vec![duplicate(1), duplicate(2)],
        suppliers: vec![],
        transactions: vec![snapshot_tx(
            "Ravi",
            PersonKind::Customer,
            PaymentKind::Credit,
            50.0,
            "1/1/2024",
        )],
    };

    let summary = engine.import_snapshot(user_id, &snapshot).await.unwrap();
    assert_eq!(summary.customers, 2);
    assert_eq!(summary.transactions, 1);

    // Both rows exist, but every transaction landed on the later insert.
    let people = engine
        .list_people(user_id, PersonKind::Customer)
        .await
        .unwrap();
    assert_eq!(people.len(), 2);
    let balances: Vec<f64> = people.iter().map(|p| p.balance).collect();
    assert!(balances.contains(&50.0) && balances.contains(&0.0));
    let funded = people.iter().find(|p| p.balance == 50.0).unwrap();
    let empty = people.iter().find(|p| p.balance == 0.0).unwrap();
    assert!(funded.id > empty.id);
}

#[tokio::test]
async fn import_requires_an_existing_user() {
    let (engine, _db, user_id) = engine_with_db().await;
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION.to_string(),
        timestamp: Utc::now(),
        customers: vec![],
        suppliers: vec![],
        transactions: vec![],
    };
    let err = engine
        .import_snapshot(user_id + 1, &snapshot)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("user".to_string()));
}

#[tokio::test]
async fn table_dump_exports_rows_verbatim() {
    let (engine, _db, user_id) = engine_with_db().await;
    let person_id = engine
        .add_person(user_id, "Ravi", PersonKind::Customer, None)
        .await
        .unwrap();
    engine
        .add_transaction(person_id, 50.0, "advance", "1/1/2024", "10:00:00 AM", PaymentKind::Credit)
        .await
        .unwrap();

    let dump = engine.export_tables().await.unwrap();
    assert_eq!(dump.user.len(), 1);
    assert_eq!(dump.people.len(), 1);
    assert_eq!(dump.transactions.len(), 1);
    assert_eq!(dump.people[0].kind, "customer");
    assert_eq!(dump.transactions[0].balance, Some(50.0));

    // The raw form keeps the source schema's key names.
    let raw = serde_json::to_value(&dump).unwrap();
    assert!(raw["people"][0]["type"].is_string());
    assert!(raw["user"][0]["email"].is_string());
}
