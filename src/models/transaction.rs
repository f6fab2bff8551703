use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use super::{non_empty, UnknownVariant, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Sale,
    Purchase,
    Transfer,
    Return,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "SALE",
            TransactionKind::Purchase => "PURCHASE",
            TransactionKind::Transfer => "TRANSFER",
            TransactionKind::Return => "RETURN",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SALE" => Ok(TransactionKind::Sale),
            "PURCHASE" => Ok(TransactionKind::Purchase),
            "TRANSFER" => Ok(TransactionKind::Transfer),
            "RETURN" => Ok(TransactionKind::Return),
            _ => Err(UnknownVariant {
                kind: "transaction type",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for TransactionKind {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A stock movement, joined with display names.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    #[serde(rename = "type")]
    #[sqlx(try_from = "String")]
    pub kind: TransactionKind,
    pub drug_id: i64,
    pub pharmacy_id: i64,
    pub supplier_id: Option<i64>,
    pub distributor_id: Option<i64>,
    pub quantity: i64,
    #[serde(rename = "unitPriceUZS")]
    pub unit_price_uzs: f64,
    /// Negative for returns.
    #[serde(rename = "totalAmountUZS")]
    pub total_amount_uzs: f64,
    pub currency: String,
    pub batch_number: Option<String>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub drug_name: String,
    pub pharmacy_name: String,
    pub supplier_name: Option<String>,
}

/// Body of `POST /api/transactions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub drug_id: i64,
    pub pharmacy_id: i64,
    pub supplier_id: Option<i64>,
    pub distributor_id: Option<i64>,
    pub quantity: i64,
    #[serde(default, rename = "unitPriceUZS")]
    pub unit_price_uzs: f64,
    #[serde(rename = "totalAmountUZS")]
    pub total_amount_uzs: Option<f64>,
    pub batch_number: Option<String>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    /// Backdated imports only; defaults to now.
    pub created_at: Option<i64>,
}

impl TransactionInput {
    pub fn new(kind: TransactionKind, drug_id: i64, pharmacy_id: i64, quantity: i64) -> Self {
        Self {
            kind,
            drug_id,
            pharmacy_id,
            supplier_id: None,
            distributor_id: None,
            quantity,
            unit_price_uzs: 0.0,
            total_amount_uzs: None,
            batch_number: None,
            invoice_number: None,
            notes: None,
            created_at: None,
        }
    }

    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.quantity <= 0 {
            return Err(ValidationError("quantity must be positive".to_string()));
        }
        if self.unit_price_uzs < 0.0 {
            return Err(ValidationError("unitPriceUZS must not be negative".to_string()));
        }
        Ok(Self {
            batch_number: non_empty(self.batch_number),
            invoice_number: non_empty(self.invoice_number),
            notes: non_empty(self.notes),
            ..self
        })
    }

    /// Explicit total if given, otherwise quantity × unit price.
    /// Returns are always stored as a negative amount.
    pub fn resolved_total(&self) -> f64 {
        let total = self
            .total_amount_uzs
            .unwrap_or(self.quantity as f64 * self.unit_price_uzs);
        match self.kind {
            TransactionKind::Return => -total.abs(),
            _ => total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_total_defaults_to_quantity_times_price() {
        let mut input = TransactionInput::new(TransactionKind::Sale, 1, 1, 3);
        input.unit_price_uzs = 2500.0;
        assert_eq!(input.resolved_total(), 7500.0);

        input.total_amount_uzs = Some(7000.0);
        assert_eq!(input.resolved_total(), 7000.0);
    }

    #[test]
    fn test_returns_are_negative() {
        let mut input = TransactionInput::new(TransactionKind::Return, 1, 1, 2);
        input.unit_price_uzs = 1000.0;
        assert_eq!(input.resolved_total(), -2000.0);

        input.total_amount_uzs = Some(-2000.0);
        assert_eq!(input.resolved_total(), -2000.0);
    }

    #[test]
    fn test_validate_rejects_non_positive_quantity() {
        let input = TransactionInput::new(TransactionKind::Sale, 1, 1, 0);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_kind_from_json() {
        let input: TransactionInput = serde_json::from_str(
            r#"{"type":"SALE","drugId":1,"pharmacyId":2,"quantity":5,"unitPriceUZS":100}"#,
        )
        .unwrap();
        assert_eq!(input.kind, TransactionKind::Sale);
        assert_eq!(input.resolved_total(), 500.0);
    }
}
