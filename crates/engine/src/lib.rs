//! Khata bookkeeping engine.
//!
//! Tracks running balances between a user and their counterparties
//! ("people": customers and suppliers). Every credit/debit transaction
//! carries a cached running balance that the engine rebuilds from the start
//! of the person's history on every mutation, inside a single database
//! transaction, so the cache can never drift from the rows it is derived
//! from.

pub use error::EngineError;
pub use ops::{BalanceSheet, Engine, EngineBuilder, PersonStatement, SheetEntry, Totals, TypeTotals};
pub use people::{Person, PersonKind, PersonSummary};
pub use snapshot::{
    ImportSummary, SNAPSHOT_VERSION, Snapshot, SnapshotPerson, SnapshotTransaction, TableDump,
};
pub use transactions::{PaymentKind, Transaction};

mod error;
mod ops;
mod snapshot;
mod util;

pub mod people;
pub mod transactions;
pub mod users;

type ResultEngine<T> = Result<T, EngineError>;
