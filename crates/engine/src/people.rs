//! People: the counterparties a user keeps accounts with.
//!
//! A person is either a customer or a supplier. The distinction never
//! changes after creation and is stored as text, validated into
//! [`PersonKind`] at the engine boundary.

use core::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Which side of the counter a person sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonKind {
    Customer,
    Supplier,
}

impl PersonKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Supplier => "supplier",
        }
    }
}

impl TryFrom<&str> for PersonKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "customer" => Ok(Self::Customer),
            "supplier" => Ok(Self::Supplier),
            other => Err(EngineError::Validation(format!(
                "invalid person type: {other}"
            ))),
        }
    }
}

impl fmt::Display for PersonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A counterparty as the engine hands it out.
#[derive(Clone, Debug, PartialEq)]
pub struct Person {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub mobile_number: Option<String>,
    pub kind: PersonKind,
}

/// One row of [`Engine::list_people`]: the person plus their lifetime
/// balance.
///
/// [`Engine::list_people`]: crate::Engine::list_people
#[derive(Clone, Debug, PartialEq)]
pub struct PersonSummary {
    pub id: i32,
    pub name: String,
    pub mobile_number: Option<String>,
    pub balance: f64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "people")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub mobile_number: Option<String>,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Person {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            mobile_number: model.mobile_number,
            kind: PersonKind::try_from(model.kind.as_str())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::PersonKind;

    #[test]
    fn kind_round_trips_through_storage_text() {
        for kind in [PersonKind::Customer, PersonKind::Supplier] {
            assert_eq!(PersonKind::try_from(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(PersonKind::try_from("vendor").is_err());
    }
}
