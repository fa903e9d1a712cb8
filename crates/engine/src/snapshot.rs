//! Portable backup documents.
//!
//! Two export shapes exist for two different consumers:
//!
//! - [`Snapshot`] is the structured backup: people grouped by kind and every
//!   transaction tagged with its owner, suitable for restoring into another
//!   database where all ids are reassigned.
//! - [`TableDump`] is the raw whole-table dump, rows serialized verbatim.
//!
//! The engine only produces and consumes these documents; reading and
//! writing the bytes at some path belongs to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, PaymentKind, PersonKind, ResultEngine, people, transactions, users,
};

/// Document version written by [`Engine::export_snapshot`].
///
/// [`Engine::export_snapshot`]: crate::Engine::export_snapshot
pub const SNAPSHOT_VERSION: &str = "1.0";

/// The structured backup document.
///
/// Deserialization is strict: a document missing any of the three
/// collections is rejected rather than partially imported.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub customers: Vec<SnapshotPerson>,
    pub suppliers: Vec<SnapshotPerson>,
    pub transactions: Vec<SnapshotTransaction>,
}

impl Snapshot {
    /// Parse a structured backup document, mapping any shape mismatch to a
    /// validation error.
    pub fn from_json(data: &str) -> ResultEngine<Self> {
        serde_json::from_str(data)
            .map_err(|err| EngineError::Validation(format!("invalid backup document: {err}")))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPerson {
    pub id: i32,
    pub name: String,
    pub mobile_number: Option<String>,
    pub balance: f64,
    #[serde(rename = "type")]
    pub kind: PersonKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTransaction {
    pub id: i32,
    pub amount: f64,
    pub description: String,
    pub transaction_date: String,
    pub transaction_time: String,
    pub payment_type: PaymentKind,
    pub balance: Option<f64>,
    pub person_id: i32,
    pub person_name: String,
    #[serde(rename = "type")]
    pub kind: PersonKind,
}

/// Raw whole-table export: the three tables, rows verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableDump {
    pub user: Vec<users::Model>,
    pub people: Vec<people::Model>,
    pub transactions: Vec<transactions::Model>,
}

/// What an import actually did.
///
/// `skipped` counts transactions whose `(person_name, type)` pair resolved
/// to no imported person; those are dropped softly rather than failing the
/// whole restore.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub customers: usize,
    pub suppliers: usize,
    pub transactions: usize,
    pub skipped: usize,
}
