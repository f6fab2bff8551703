use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{non_empty, ValidationError};
use crate::format::{self, ExpiryStatus, StockStatus};

/// Stock of one drug at one pharmacy, joined with display names.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: i64,
    pub drug_id: i64,
    pub pharmacy_id: i64,
    pub supplier_id: Option<i64>,
    pub quantity: i64,
    #[serde(rename = "purchasePriceUZS")]
    pub purchase_price_uzs: f64,
    #[serde(rename = "salePriceUZS")]
    pub sale_price_uzs: f64,
    #[serde(rename = "purchasePriceUSD")]
    pub purchase_price_usd: Option<f64>,
    #[serde(rename = "salePriceUSD")]
    pub sale_price_usd: Option<f64>,
    pub batch_number: Option<String>,
    /// `YYYY-MM-DD`
    pub expiry_date: Option<String>,
    pub min_stock: i64,
    pub max_stock: Option<i64>,
    pub location: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub drug_name: String,
    pub pharmacy_name: String,
    pub supplier_name: Option<String>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }

    /// Expires on or before `today + window_days` (already expired items included).
    /// A window reaching past the last representable date covers every dated item.
    pub fn is_expiring(&self, today: NaiveDate, window_days: i64) -> bool {
        let Some(expiry) = format::parse_date(self.expiry_date.as_deref()) else {
            return false;
        };
        match TimeDelta::try_days(window_days).and_then(|d| today.checked_add_signed(d)) {
            Some(cutoff) => expiry <= cutoff,
            None => window_days > 0,
        }
    }

    pub fn stock_status(&self) -> StockStatus {
        format::stock_status(self.quantity, self.min_stock)
    }

    pub fn expiry_status(&self, today: NaiveDate) -> ExpiryStatus {
        format::expiry_status(self.expiry_date.as_deref(), today)
    }

    pub fn value_uzs(&self) -> f64 {
        self.quantity as f64 * self.sale_price_uzs
    }

    pub fn into_view(self, today: NaiveDate) -> InventoryView {
        InventoryView {
            stock_status: self.stock_status(),
            expiry_status: self.expiry_status(today),
            item: self,
        }
    }
}

/// An inventory row as rendered by the API, with its derived statuses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryView {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub stock_status: StockStatus,
    pub expiry_status: ExpiryStatus,
}

/// Body of `POST /api/inventory`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryInput {
    pub drug_id: i64,
    pub pharmacy_id: i64,
    pub supplier_id: Option<i64>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(rename = "purchasePriceUZS")]
    pub purchase_price_uzs: f64,
    #[serde(rename = "salePriceUZS")]
    pub sale_price_uzs: f64,
    #[serde(rename = "purchasePriceUSD")]
    pub purchase_price_usd: Option<f64>,
    #[serde(rename = "salePriceUSD")]
    pub sale_price_usd: Option<f64>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<String>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub location: Option<String>,
    /// Carried over to the PURCHASE transaction created alongside the row.
    pub invoice_number: Option<String>,
}

impl InventoryInput {
    pub const DEFAULT_MIN_STOCK: i64 = 10;

    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.quantity < 0 {
            return Err(ValidationError("quantity must not be negative".to_string()));
        }
        if self.purchase_price_uzs < 0.0 || self.sale_price_uzs < 0.0 {
            return Err(ValidationError("prices must not be negative".to_string()));
        }
        let expiry_date = validate_expiry(self.expiry_date)?;
        Ok(Self {
            batch_number: non_empty(self.batch_number),
            expiry_date,
            location: non_empty(self.location),
            invoice_number: non_empty(self.invoice_number),
            ..self
        })
    }
}

/// Body of `PUT /api/inventory/{id}`. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUpdate {
    pub quantity: Option<i64>,
    #[serde(rename = "purchasePriceUZS")]
    pub purchase_price_uzs: Option<f64>,
    #[serde(rename = "salePriceUZS")]
    pub sale_price_uzs: Option<f64>,
    #[serde(rename = "purchasePriceUSD")]
    pub purchase_price_usd: Option<f64>,
    #[serde(rename = "salePriceUSD")]
    pub sale_price_usd: Option<f64>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<String>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub location: Option<String>,
}

impl InventoryUpdate {
    pub fn validate(self) -> Result<Self, ValidationError> {
        if matches!(self.quantity, Some(q) if q < 0) {
            return Err(ValidationError("quantity must not be negative".to_string()));
        }
        let expiry_date = validate_expiry(self.expiry_date)?;
        Ok(Self {
            batch_number: non_empty(self.batch_number),
            expiry_date,
            location: non_empty(self.location),
            ..self
        })
    }
}

fn validate_expiry(value: Option<String>) -> Result<Option<String>, ValidationError> {
    match non_empty(value) {
        Some(raw) => match format::parse_date(Some(&raw)) {
            Some(date) => Ok(Some(date.format("%Y-%m-%d").to_string())),
            None => Err(ValidationError(format!(
                "expiryDate '{raw}' is not a YYYY-MM-DD date"
            ))),
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, min_stock: i64, expiry: Option<&str>) -> InventoryItem {
        InventoryItem {
            id: 1,
            drug_id: 1,
            pharmacy_id: 1,
            supplier_id: None,
            quantity,
            purchase_price_uzs: 1000.0,
            sale_price_uzs: 1500.0,
            purchase_price_usd: None,
            sale_price_usd: None,
            batch_number: None,
            expiry_date: expiry.map(str::to_string),
            min_stock,
            max_stock: None,
            location: None,
            created_at: 0,
            updated_at: 0,
            drug_name: "Paracetamol".to_string(),
            pharmacy_name: "Central".to_string(),
            supplier_name: None,
        }
    }

    #[test]
    fn test_low_stock_is_inclusive() {
        assert!(item(10, 10, None).is_low_stock());
        assert!(!item(11, 10, None).is_low_stock());
    }

    #[test]
    fn test_expiring_window() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(item(5, 1, Some("2024-03-31")).is_expiring(today, 90));
        assert!(!item(5, 1, Some("2024-04-01")).is_expiring(today, 90));
        assert!(item(5, 1, Some("2023-12-01")).is_expiring(today, 90));
        assert!(!item(5, 1, None).is_expiring(today, 90));
    }

    #[test]
    fn test_expiring_window_past_calendar_range() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(item(5, 1, Some("2030-01-01")).is_expiring(today, 200_000_000));
        assert!(item(5, 1, Some("2030-01-01")).is_expiring(today, i64::MAX));
        assert!(!item(5, 1, Some("2023-12-01")).is_expiring(today, i64::MIN));
        assert!(!item(5, 1, None).is_expiring(today, i64::MAX));
    }

    #[test]
    fn test_value_uses_sale_price() {
        assert_eq!(item(4, 1, None).value_uzs(), 6000.0);
    }

    #[test]
    fn test_validate_rejects_bad_expiry() {
        let input = InventoryInput {
            drug_id: 1,
            pharmacy_id: 1,
            expiry_date: Some("31/12/2025".to_string()),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        let input = InventoryInput {
            drug_id: 1,
            pharmacy_id: 1,
            expiry_date: Some("2025-12-31T00:00:00.000Z".to_string()),
            ..Default::default()
        };
        assert_eq!(
            input.validate().unwrap().expiry_date.as_deref(),
            Some("2025-12-31")
        );
    }
}
