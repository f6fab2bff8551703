use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{non_empty, required, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Drug {
    pub id: i64,
    pub name: String,
    pub name_ru: Option<String>,
    pub name_uz: Option<String>,
    /// International non-proprietary name
    pub inn: Option<String>,
    pub atx_code: Option<String>,
    pub therapeutic_group: Option<String>,
    pub form: Option<String>,
    pub dosage: Option<String>,
    pub manufacturer: Option<String>,
    pub country: Option<String>,
    pub prescription: bool,
    pub barcode: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Body of `POST /api/drugs` and `PUT /api/drugs/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugInput {
    pub name: String,
    pub name_ru: Option<String>,
    pub name_uz: Option<String>,
    pub inn: Option<String>,
    pub atx_code: Option<String>,
    pub therapeutic_group: Option<String>,
    pub form: Option<String>,
    pub dosage: Option<String>,
    pub manufacturer: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub prescription: bool,
    pub barcode: Option<String>,
}

impl DrugInput {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required(self.name, "name")?,
            name_ru: non_empty(self.name_ru),
            name_uz: non_empty(self.name_uz),
            inn: non_empty(self.inn),
            atx_code: non_empty(self.atx_code).map(|c| c.to_uppercase()),
            therapeutic_group: non_empty(self.therapeutic_group),
            form: non_empty(self.form),
            dosage: non_empty(self.dosage),
            manufacturer: non_empty(self.manufacturer),
            country: non_empty(self.country),
            prescription: self.prescription,
            barcode: non_empty(self.barcode),
        })
    }
}
