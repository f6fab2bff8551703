use crate::models::{
    AtxCategory, Distributor, DistributorInput, Drug, DrugInput, InventoryInput, InventoryItem,
    InventoryUpdate, Pharmacy, PharmacyInput, Supplier, SupplierInput, Transaction,
    TransactionInput, TransactionKind,
};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("no inventory for drug {drug_id} at pharmacy {pharmacy_id}")]
    NoInventory { drug_id: i64, pharmacy_id: i64 },
    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i64, requested: i64 },
    #[error("referenced record does not exist: {0}")]
    InvalidReference(String),
    #[error("{entity} {id} is still referenced by other records")]
    InUse { entity: &'static str, id: i64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Map a failed insert: foreign key violations mean the payload pointed at a
/// missing drug/pharmacy/supplier.
pub(crate) fn insert_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return StorageError::InvalidReference(db.message().to_string());
        }
    }
    StorageError::Other(err.into())
}

/// Map a failed delete: foreign key violations mean rows still point at it.
pub(crate) fn delete_error(err: sqlx::Error, entity: &'static str, id: i64) -> StorageError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return StorageError::InUse { entity, id };
        }
    }
    StorageError::Other(err.into())
}

/// Filters for the paginated drug listing.
#[derive(Debug, Clone, Default)]
pub struct DrugQuery {
    /// Substring of `name`, `name_ru` or `name_uz`
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Filters for the paginated transaction listing.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub kind: Option<TransactionKind>,
    pub pharmacy_id: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EntityCounts {
    pub drugs: i64,
    pub pharmacies: i64,
    pub active_pharmacies: i64,
    pub suppliers: i64,
    pub active_suppliers: i64,
    pub distributors: i64,
    pub inventory: i64,
    pub transactions: i64,
}

pub(crate) fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s.to_lowercase()))
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Create tables and indexes if they don't exist yet
    async fn init(&self) -> Result<()>;

    /// Entity counts for the dashboard and debug endpoints
    async fn counts(&self) -> Result<EntityCounts>;

    // Drugs

    /// Newest first, with the total number of matches ignoring pagination
    async fn list_drugs(&self, query: &DrugQuery) -> Result<(Vec<Drug>, i64)>;

    /// Entire catalog, unfiltered. Input of every analytics aggregation.
    async fn all_drugs(&self) -> Result<Vec<Drug>>;

    async fn get_drug(&self, id: i64) -> Result<Option<Drug>>;

    async fn create_drug(&self, input: &DrugInput) -> Result<Drug>;

    async fn update_drug(&self, id: i64, input: &DrugInput) -> Result<Option<Drug>>;

    async fn delete_drug(&self, id: i64) -> StorageResult<bool>;

    // Pharmacies

    async fn list_pharmacies(&self, search: Option<&str>, active_only: bool)
        -> Result<Vec<Pharmacy>>;

    async fn get_pharmacy(&self, id: i64) -> Result<Option<Pharmacy>>;

    async fn create_pharmacy(&self, input: &PharmacyInput) -> Result<Pharmacy>;

    async fn update_pharmacy(&self, id: i64, input: &PharmacyInput) -> Result<Option<Pharmacy>>;

    async fn delete_pharmacy(&self, id: i64) -> StorageResult<bool>;

    // Suppliers

    async fn list_suppliers(&self, search: Option<&str>, active_only: bool)
        -> Result<Vec<Supplier>>;

    async fn get_supplier(&self, id: i64) -> Result<Option<Supplier>>;

    async fn create_supplier(&self, input: &SupplierInput) -> Result<Supplier>;

    async fn update_supplier(&self, id: i64, input: &SupplierInput) -> Result<Option<Supplier>>;

    async fn delete_supplier(&self, id: i64) -> StorageResult<bool>;

    // Distributors

    /// Ordered by name
    async fn list_distributors(
        &self,
        search: Option<&str>,
        region: Option<&str>,
    ) -> Result<Vec<Distributor>>;

    async fn get_distributor(&self, id: i64) -> Result<Option<Distributor>>;

    async fn create_distributor(&self, input: &DistributorInput) -> Result<Distributor>;

    async fn update_distributor(
        &self,
        id: i64,
        input: &DistributorInput,
    ) -> Result<Option<Distributor>>;

    async fn delete_distributor(&self, id: i64) -> StorageResult<bool>;

    // Inventory

    /// Newest first, optionally restricted to one pharmacy and/or drug
    async fn list_inventory(
        &self,
        pharmacy_id: Option<i64>,
        drug_id: Option<i64>,
    ) -> Result<Vec<InventoryItem>>;

    async fn get_inventory(&self, id: i64) -> Result<Option<InventoryItem>>;

    /// Insert a stock row. A positive quantity also records the matching
    /// PURCHASE transaction in the same database transaction.
    async fn create_inventory(&self, input: &InventoryInput) -> StorageResult<InventoryItem>;

    async fn update_inventory(
        &self,
        id: i64,
        update: &InventoryUpdate,
    ) -> Result<Option<InventoryItem>>;

    async fn delete_inventory(&self, id: i64) -> Result<bool>;

    // Transactions

    /// Newest first, with the total number of matches ignoring pagination
    async fn list_transactions(&self, query: &TransactionQuery)
        -> Result<(Vec<Transaction>, i64)>;

    /// Newest first, created at or after `since` when given
    async fn transactions_since(
        &self,
        since: Option<i64>,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<Transaction>>;

    /// Insert a transaction. A SALE atomically decrements the stock of the
    /// (drug, pharmacy) inventory row and fails if there is not enough.
    async fn record_transaction(&self, input: &TransactionInput) -> StorageResult<Transaction>;

    // Reference data

    /// Stored ATX categories of one level, optionally under a parent code
    async fn list_atx_categories(
        &self,
        level: i64,
        parent: Option<&str>,
    ) -> Result<Vec<AtxCategory>>;

    async fn upsert_atx_category(&self, category: &AtxCategory) -> Result<()>;

    // Settings

    async fn load_settings(&self) -> Result<HashMap<String, String>>;

    async fn save_settings(&self, pairs: &[(&'static str, String)]) -> Result<()>;
}
