use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{DisplayConfig, InventoryConfig};
use crate::format::DisplaySettings;
use crate::models::atx::standard_atx;
use crate::models::{
    AppSettings, AtxCategory, Distributor, DistributorInput, Drug, DrugInput, InventoryInput,
    InventoryUpdate, InventoryView, Pharmacy, PharmacyInput, Supplier, SupplierInput,
    Transaction, TransactionInput, TransactionKind,
};
use crate::storage::{DrugQuery, EntityCounts, Storage, TransactionQuery};

use super::error::{ApiError, ApiResult};
use super::extract::ApiQuery;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    /// Defaults for settings that have no stored row
    pub display: DisplayConfig,
    pub inventory: InventoryConfig,
}

impl AppState {
    pub async fn settings(&self) -> ApiResult<AppSettings> {
        self.storage
            .load_settings()
            .await
            .map(|pairs| AppSettings::from_pairs(&pairs))
            .map_err(|e| ApiError::internal("Failed to load settings", e))
    }
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

const MAX_PAGE: i64 = 500;

fn default_limit() -> i64 {
    50
}

/// Clamp user-supplied pagination to sane bounds.
fn page(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_PAGE), offset.max(0))
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
pub struct DebugResponse {
    pub status: &'static str,
    pub counts: EntityCounts,
}

/// Database connectivity probe
pub async fn debug_info(State(state): State<Arc<AppState>>) -> ApiResult<Json<DebugResponse>> {
    match state.storage.counts().await {
        Ok(counts) => Ok(Json(DebugResponse {
            status: "connected",
            counts,
        })),
        Err(e) => Err(ApiError::internal("Database connection failed", e)),
    }
}

// Drugs

#[derive(Deserialize)]
pub struct DrugListQuery {
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Serialize)]
pub struct DrugListResponse {
    pub drugs: Vec<Drug>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list_drugs(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<DrugListQuery>,
) -> ApiResult<Json<DrugListResponse>> {
    let (limit, offset) = page(query.limit, query.offset);
    let drug_query = DrugQuery {
        search: query.search,
        limit,
        offset,
    };

    match state.storage.list_drugs(&drug_query).await {
        Ok((drugs, total)) => Ok(Json(DrugListResponse {
            drugs,
            total,
            limit,
            offset,
        })),
        Err(e) => Err(ApiError::internal("Failed to fetch drugs", e)),
    }
}

pub async fn get_drug(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Drug>> {
    match state.storage.get_drug(id).await {
        Ok(Some(drug)) => Ok(Json(drug)),
        Ok(None) => Err(ApiError::not_found("Drug not found")),
        Err(e) => Err(ApiError::internal("Failed to fetch drug", e)),
    }
}

pub async fn create_drug(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DrugInput>,
) -> ApiResult<(StatusCode, Json<Drug>)> {
    let input = payload.validate()?;

    let drug = state
        .storage
        .create_drug(&input)
        .await
        .map_err(|e| ApiError::internal("Failed to create drug", e))?;

    tracing::info!("Created drug {} ({})", drug.id, drug.name);
    Ok((StatusCode::CREATED, Json(drug)))
}

pub async fn update_drug(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<DrugInput>,
) -> ApiResult<Json<Drug>> {
    let input = payload.validate()?;

    match state.storage.update_drug(id, &input).await {
        Ok(Some(drug)) => Ok(Json(drug)),
        Ok(None) => Err(ApiError::not_found("Drug not found")),
        Err(e) => Err(ApiError::internal("Failed to update drug", e)),
    }
}

pub async fn delete_drug(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse>> {
    match state.storage.delete_drug(id).await {
        Ok(true) => Ok(Json(SuccessResponse {
            message: "Drug deleted successfully".to_string(),
        })),
        Ok(false) => Err(ApiError::not_found("Drug not found")),
        Err(e) => Err(ApiError::storage("Failed to delete drug", e)),
    }
}

// Pharmacies and suppliers

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub active_only: bool,
}

pub async fn list_pharmacies(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<DirectoryQuery>,
) -> ApiResult<Json<Vec<Pharmacy>>> {
    state
        .storage
        .list_pharmacies(query.search.as_deref(), query.active_only)
        .await
        .map(Json)
        .map_err(|e| ApiError::internal("Failed to fetch pharmacies", e))
}

pub async fn get_pharmacy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Pharmacy>> {
    match state.storage.get_pharmacy(id).await {
        Ok(Some(pharmacy)) => Ok(Json(pharmacy)),
        Ok(None) => Err(ApiError::not_found("Pharmacy not found")),
        Err(e) => Err(ApiError::internal("Failed to fetch pharmacy", e)),
    }
}

pub async fn create_pharmacy(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PharmacyInput>,
) -> ApiResult<(StatusCode, Json<Pharmacy>)> {
    let input = payload.validate()?;

    let pharmacy = state
        .storage
        .create_pharmacy(&input)
        .await
        .map_err(|e| ApiError::internal("Failed to create pharmacy", e))?;

    Ok((StatusCode::CREATED, Json(pharmacy)))
}

pub async fn update_pharmacy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<PharmacyInput>,
) -> ApiResult<Json<Pharmacy>> {
    let input = payload.validate()?;

    match state.storage.update_pharmacy(id, &input).await {
        Ok(Some(pharmacy)) => Ok(Json(pharmacy)),
        Ok(None) => Err(ApiError::not_found("Pharmacy not found")),
        Err(e) => Err(ApiError::internal("Failed to update pharmacy", e)),
    }
}

pub async fn delete_pharmacy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse>> {
    match state.storage.delete_pharmacy(id).await {
        Ok(true) => Ok(Json(SuccessResponse {
            message: "Pharmacy deleted successfully".to_string(),
        })),
        Ok(false) => Err(ApiError::not_found("Pharmacy not found")),
        Err(e) => Err(ApiError::storage("Failed to delete pharmacy", e)),
    }
}

pub async fn list_suppliers(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<DirectoryQuery>,
) -> ApiResult<Json<Vec<Supplier>>> {
    state
        .storage
        .list_suppliers(query.search.as_deref(), query.active_only)
        .await
        .map(Json)
        .map_err(|e| ApiError::internal("Failed to fetch suppliers", e))
}

pub async fn get_supplier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Supplier>> {
    match state.storage.get_supplier(id).await {
        Ok(Some(supplier)) => Ok(Json(supplier)),
        Ok(None) => Err(ApiError::not_found("Supplier not found")),
        Err(e) => Err(ApiError::internal("Failed to fetch supplier", e)),
    }
}

pub async fn create_supplier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SupplierInput>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    let input = payload.validate()?;

    let supplier = state
        .storage
        .create_supplier(&input)
        .await
        .map_err(|e| ApiError::internal("Failed to create supplier", e))?;

    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<SupplierInput>,
) -> ApiResult<Json<Supplier>> {
    let input = payload.validate()?;

    match state.storage.update_supplier(id, &input).await {
        Ok(Some(supplier)) => Ok(Json(supplier)),
        Ok(None) => Err(ApiError::not_found("Supplier not found")),
        Err(e) => Err(ApiError::internal("Failed to update supplier", e)),
    }
}

pub async fn delete_supplier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse>> {
    match state.storage.delete_supplier(id).await {
        Ok(true) => Ok(Json(SuccessResponse {
            message: "Supplier deleted successfully".to_string(),
        })),
        Ok(false) => Err(ApiError::not_found("Supplier not found")),
        Err(e) => Err(ApiError::storage("Failed to delete supplier", e)),
    }
}

// Distributors

#[derive(Deserialize)]
pub struct DistributorQuery {
    pub search: Option<String>,
    pub region: Option<String>,
}

pub async fn list_distributors(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<DistributorQuery>,
) -> ApiResult<Json<Vec<Distributor>>> {
    state
        .storage
        .list_distributors(query.search.as_deref(), query.region.as_deref())
        .await
        .map(Json)
        .map_err(|e| ApiError::internal("Failed to fetch distributors", e))
}

pub async fn get_distributor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Distributor>> {
    match state.storage.get_distributor(id).await {
        Ok(Some(distributor)) => Ok(Json(distributor)),
        Ok(None) => Err(ApiError::not_found("Distributor not found")),
        Err(e) => Err(ApiError::internal("Failed to fetch distributor", e)),
    }
}

pub async fn create_distributor(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DistributorInput>,
) -> ApiResult<(StatusCode, Json<Distributor>)> {
    let input = payload.validate()?;

    let distributor = state
        .storage
        .create_distributor(&input)
        .await
        .map_err(|e| ApiError::internal("Failed to create distributor", e))?;

    Ok((StatusCode::CREATED, Json(distributor)))
}

pub async fn update_distributor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<DistributorInput>,
) -> ApiResult<Json<Distributor>> {
    let input = payload.validate()?;

    match state.storage.update_distributor(id, &input).await {
        Ok(Some(distributor)) => Ok(Json(distributor)),
        Ok(None) => Err(ApiError::not_found("Distributor not found")),
        Err(e) => Err(ApiError::internal("Failed to update distributor", e)),
    }
}

pub async fn delete_distributor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse>> {
    match state.storage.delete_distributor(id).await {
        Ok(true) => Ok(Json(SuccessResponse {
            message: "Distributor deleted successfully".to_string(),
        })),
        Ok(false) => Err(ApiError::not_found("Distributor not found")),
        Err(e) => Err(ApiError::storage("Failed to delete distributor", e)),
    }
}

// Inventory

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryQuery {
    pub pharmacy_id: Option<i64>,
    pub drug_id: Option<i64>,
    /// Only rows at or below their minimum stock
    #[serde(default)]
    pub low_stock: bool,
    /// Only rows expiring within the alert window
    #[serde(default)]
    pub expiring: bool,
    #[serde(default = "default_inventory_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_inventory_limit() -> i64 {
    100
}

#[derive(Serialize)]
pub struct InventoryListResponse {
    pub items: Vec<InventoryView>,
    pub total: usize,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list_inventory(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<InventoryQuery>,
) -> ApiResult<Json<InventoryListResponse>> {
    let settings = state.settings().await?;
    let alert_days = settings.expiry_alert_days(&state.inventory);
    let today = Utc::now().date_naive();
    let (limit, offset) = page(query.limit, query.offset);

    let items = state
        .storage
        .list_inventory(query.pharmacy_id, query.drug_id)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch inventory", e))?;

    // Status filters are computed, so they apply after the fetch.
    let filtered: Vec<_> = items
        .into_iter()
        .filter(|item| !query.low_stock || item.is_low_stock())
        .filter(|item| !query.expiring || item.is_expiring(today, alert_days))
        .collect();
    let total = filtered.len();

    let items = filtered
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .map(|item| item.into_view(today))
        .collect();

    Ok(Json(InventoryListResponse {
        items,
        total,
        limit,
        offset,
    }))
}

pub async fn get_inventory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<InventoryView>> {
    match state.storage.get_inventory(id).await {
        Ok(Some(item)) => Ok(Json(item.into_view(Utc::now().date_naive()))),
        Ok(None) => Err(ApiError::not_found("Inventory item not found")),
        Err(e) => Err(ApiError::internal("Failed to fetch inventory item", e)),
    }
}

pub async fn create_inventory(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<InventoryInput>,
) -> ApiResult<(StatusCode, Json<InventoryView>)> {
    let mut input = payload.validate()?;
    if input.min_stock.is_none() {
        input.min_stock = Some(state.settings().await?.default_min_stock());
    }

    let item = state
        .storage
        .create_inventory(&input)
        .await
        .map_err(|e| ApiError::storage("Failed to create inventory item", e))?;

    tracing::info!(
        "Stocked {} x {} at {}",
        item.quantity,
        item.drug_name,
        item.pharmacy_name
    );
    Ok((
        StatusCode::CREATED,
        Json(item.into_view(Utc::now().date_naive())),
    ))
}

pub async fn update_inventory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<InventoryUpdate>,
) -> ApiResult<Json<InventoryView>> {
    let update = payload.validate()?;

    match state.storage.update_inventory(id, &update).await {
        Ok(Some(item)) => Ok(Json(item.into_view(Utc::now().date_naive()))),
        Ok(None) => Err(ApiError::not_found("Inventory item not found")),
        Err(e) => Err(ApiError::internal("Failed to update inventory item", e)),
    }
}

pub async fn delete_inventory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse>> {
    match state.storage.delete_inventory(id).await {
        Ok(true) => Ok(Json(SuccessResponse {
            message: "Inventory item deleted successfully".to_string(),
        })),
        Ok(false) => Err(ApiError::not_found("Inventory item not found")),
        Err(e) => Err(ApiError::internal("Failed to delete inventory item", e)),
    }
}

// Transactions

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub pharmacy_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<Transaction>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TransactionListQuery>,
) -> ApiResult<Json<TransactionListResponse>> {
    let kind = match query.kind.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<TransactionKind>()
                .map_err(|e| ApiError::bad_request(e.to_string()))?,
        ),
    };
    let (limit, offset) = page(query.limit, query.offset);

    let tx_query = TransactionQuery {
        kind,
        pharmacy_id: query.pharmacy_id,
        limit,
        offset,
    };

    match state.storage.list_transactions(&tx_query).await {
        Ok((transactions, total)) => Ok(Json(TransactionListResponse {
            transactions,
            total,
            limit,
            offset,
        })),
        Err(e) => Err(ApiError::internal("Failed to fetch transactions", e)),
    }
}

pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TransactionInput>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    let input = payload.validate()?;

    let transaction = state
        .storage
        .record_transaction(&input)
        .await
        .map_err(|e| ApiError::storage("Failed to create transaction", e))?;

    tracing::info!(
        "Recorded {} of {} x {} at {}",
        transaction.kind.as_str(),
        transaction.quantity,
        transaction.drug_name,
        transaction.pharmacy_name
    );
    Ok((StatusCode::CREATED, Json(transaction)))
}

// Reference data

#[derive(Deserialize)]
pub struct AtxQuery {
    #[serde(default = "default_atx_level")]
    pub level: i64,
    pub parent: Option<String>,
}

fn default_atx_level() -> i64 {
    1
}

pub async fn list_atx(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<AtxQuery>,
) -> ApiResult<Json<Vec<AtxCategory>>> {
    let parent = query
        .parent
        .as_deref()
        .map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty());

    let stored = state
        .storage
        .list_atx_categories(query.level, parent.as_deref())
        .await
        .map_err(|e| ApiError::internal("Failed to fetch ATX categories", e))?;

    if stored.is_empty() {
        return Ok(Json(standard_atx(query.level, parent.as_deref())));
    }
    Ok(Json(stored))
}

// Settings

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    /// Stored values only
    pub settings: AppSettings,
    /// Values in effect after applying defaults
    pub display: DisplaySettings,
    pub low_stock_threshold: i64,
    pub expiry_alert_days: i64,
}

fn settings_response(state: &AppState, settings: AppSettings) -> SettingsResponse {
    SettingsResponse {
        display: settings.display(&state.display),
        low_stock_threshold: settings.default_min_stock(),
        expiry_alert_days: settings.expiry_alert_days(&state.inventory),
        settings,
    }
}

pub async fn get_settings(State(state): State<Arc<AppState>>) -> ApiResult<Json<SettingsResponse>> {
    let settings = state.settings().await?;
    Ok(Json(settings_response(&state, settings)))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AppSettings>,
) -> ApiResult<Json<SettingsResponse>> {
    if matches!(payload.usd_rate, Some(rate) if rate <= 0.0) {
        return Err(ApiError::bad_request("usdRate must be positive"));
    }
    if matches!(payload.low_stock_threshold, Some(n) if n < 0) {
        return Err(ApiError::bad_request("lowStockThreshold must not be negative"));
    }
    if matches!(payload.expiry_alert_days, Some(n) if !InventoryConfig::is_valid_alert_window(n)) {
        return Err(ApiError::bad_request(format!(
            "expiryAlertDays must be between 0 and {}",
            InventoryConfig::MAX_EXPIRY_ALERT_DAYS
        )));
    }

    state
        .storage
        .save_settings(&payload.to_pairs())
        .await
        .map_err(|e| ApiError::internal("Failed to save settings", e))?;

    let settings = state.settings().await?;
    Ok(Json(settings_response(&state, settings)))
}
