pub mod atx;
pub mod distributor;
pub mod drug;
pub mod inventory;
pub mod pharmacy;
pub mod settings;
pub mod supplier;
pub mod transaction;

pub use atx::AtxCategory;
pub use distributor::{Distributor, DistributorInput};
pub use drug::{Drug, DrugInput};
pub use inventory::{InventoryInput, InventoryItem, InventoryUpdate, InventoryView};
pub use pharmacy::{Pharmacy, PharmacyInput};
pub use settings::AppSettings;
pub use supplier::{Supplier, SupplierInput, SupplierType};
pub use transaction::{Transaction, TransactionInput, TransactionKind};

/// Collapse empty or whitespace-only form values to `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub(crate) fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Rejected request payload. Rendered as a 400 by the API layer.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

pub(crate) fn required(value: String, field: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// A stored or submitted enum string that matches no known variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
