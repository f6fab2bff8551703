use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{non_empty, required, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Distributor {
    pub id: i64,
    pub name: String,
    pub name_ru: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Taxpayer identification number
    pub inn: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributorInput {
    pub name: String,
    pub name_ru: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub inn: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl DistributorInput {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required(self.name, "name")?,
            name_ru: non_empty(self.name_ru),
            country: non_empty(self.country),
            region: non_empty(self.region),
            address: non_empty(self.address),
            phone: non_empty(self.phone),
            email: non_empty(self.email),
            inn: non_empty(self.inn),
            is_active: self.is_active,
        })
    }
}
