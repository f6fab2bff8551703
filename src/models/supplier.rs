use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use super::{non_empty, required, UnknownVariant, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierType {
    Manufacturer,
    Distributor,
    Importer,
}

impl SupplierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierType::Manufacturer => "MANUFACTURER",
            SupplierType::Distributor => "DISTRIBUTOR",
            SupplierType::Importer => "IMPORTER",
        }
    }
}

impl FromStr for SupplierType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MANUFACTURER" => Ok(SupplierType::Manufacturer),
            "DISTRIBUTOR" => Ok(SupplierType::Distributor),
            "IMPORTER" => Ok(SupplierType::Importer),
            _ => Err(UnknownVariant {
                kind: "supplier type",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for SupplierType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub name_ru: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(try_from = "String")]
    pub supplier_type: SupplierType,
    pub contact: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub inn: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInput {
    pub name: String,
    pub name_ru: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub supplier_type: SupplierType,
    pub contact: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub inn: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl SupplierInput {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required(self.name, "name")?,
            name_ru: non_empty(self.name_ru),
            country: non_empty(self.country),
            supplier_type: self.supplier_type,
            contact: non_empty(self.contact),
            phone: non_empty(self.phone),
            email: non_empty(self.email),
            address: non_empty(self.address),
            inn: non_empty(self.inn),
            is_active: self.is_active,
        })
    }
}
