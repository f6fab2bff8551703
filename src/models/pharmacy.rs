use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{non_empty, required, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Pharmacy {
    pub id: i64,
    pub name: String,
    pub region: String,
    pub district: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub manager: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyInput {
    pub name: String,
    pub region: String,
    pub district: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub manager: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl PharmacyInput {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required(self.name, "name")?,
            region: required(self.region, "region")?,
            district: non_empty(self.district),
            address: non_empty(self.address),
            phone: non_empty(self.phone),
            email: non_empty(self.email),
            manager: non_empty(self.manager),
            is_active: self.is_active,
        })
    }
}
