//! Enumerations stored as string columns.
//!
//! `MovementKind` distinguishes stock received from stock shipped, and `Unit` is the fixed
//! unit vocabulary shared by every transaction and cart line.

use crate::errors::{Error, Result};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a stock movement
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum MovementKind {
    /// Stock received from a supplier
    #[sea_orm(string_value = "input")]
    Input,
    /// Stock shipped to a customer
    #[sea_orm(string_value = "output")]
    Output,
}

impl MovementKind {
    /// Label used in exports (`INPUT` / `OUTPUT`)
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
        }
    }
}

/// Unit of measure for a quantity
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum Unit {
    /// Kilogram
    #[sea_orm(string_value = "KG")]
    Kg,
    /// Pieces
    #[sea_orm(string_value = "PCS")]
    Pcs,
    /// Liter
    #[sea_orm(string_value = "LITER")]
    Liter,
    /// Pack
    #[sea_orm(string_value = "PACK")]
    Pack,
    /// Box (carton)
    #[sea_orm(string_value = "BOX")]
    Box,
    /// Sack
    #[sea_orm(string_value = "KARUNG")]
    Karung,
}

impl Unit {
    /// The full unit vocabulary, in display order
    pub const ALL: [Self; 6] = [
        Self::Kg,
        Self::Pcs,
        Self::Liter,
        Self::Pack,
        Self::Box,
        Self::Karung,
    ];

    /// Canonical upper-case code
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Kg => "KG",
            Self::Pcs => "PCS",
            Self::Liter => "LITER",
            Self::Pack => "PACK",
            Self::Box => "BOX",
            Self::Karung => "KARUNG",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|unit| unit.code() == code)
            .ok_or_else(|| Error::UnknownUnit {
                unit: s.to_string(),
            })
    }
}
