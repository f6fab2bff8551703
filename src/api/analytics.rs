//! Analytics API handlers
//!
//! Each handler fetches the whole drug catalog (and, where revenue is needed,
//! the SALE transactions of the requested window) and aggregates in memory.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::analytics::dashboard::{self, Dashboard, DashboardInput, RECENT_TRANSACTIONS};
use crate::analytics::reports::{self, DateRange};
use crate::analytics::{CorrelationReport, Dimension, MarketShareReport, SortBy, TopSalesReport};
use crate::models::{Drug, TransactionKind};
use crate::storage::TransactionQuery;

use super::error::{ApiError, ApiResult};
use super::extract::ApiQuery;
use super::handlers::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketShareParams {
    /// manufacturer (default), country, atxCode, form, ...
    pub dimension: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopSalesParams {
    /// drug (default), manufacturer, tradeName, inn, country, atxGroup, form
    pub dimension: Option<String>,
    #[serde(default = "default_top_limit")]
    pub limit: i64,
    pub sort_by: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

fn default_top_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct CorrelationParams {
    pub dim1: Option<String>,
    pub dim2: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DisplayParams {
    pub lang: Option<String>,
    pub currency: Option<String>,
}

async fn fetch_drugs(state: &AppState, failure: &str) -> ApiResult<Vec<Drug>> {
    state
        .storage
        .all_drugs()
        .await
        .map_err(|e| ApiError::internal(failure, e))
}

async fn fetch_revenue(
    state: &AppState,
    range: DateRange,
    failure: &str,
) -> ApiResult<HashMap<i64, f64>> {
    let sales = state
        .storage
        .transactions_since(range.start_timestamp(), Some(TransactionKind::Sale))
        .await
        .map_err(|e| ApiError::internal(failure, e))?;

    Ok(reports::revenue_by_drug(&sales, range))
}

/// Share of the catalog per dimension group
pub async fn market_share(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<MarketShareParams>,
) -> ApiResult<Json<MarketShareReport>> {
    const FAILURE: &str = "Failed to calculate market share";

    let dimension = Dimension::parse_or(params.dimension.as_deref(), Dimension::Manufacturer);
    let range = DateRange::parse(params.date_from.as_deref(), params.date_to.as_deref());

    let display = state.settings().await?.display(&state.display);

    let drugs = fetch_drugs(&state, FAILURE).await?;
    let revenue = fetch_revenue(&state, range, FAILURE).await?;

    Ok(Json(reports::market_share(&drugs, dimension, &revenue, display.usd_rate)))
}

/// Top-N groups by drug count or by sales revenue
pub async fn top_sales(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<TopSalesParams>,
) -> ApiResult<Json<TopSalesReport>> {
    const FAILURE: &str = "Failed to calculate top sales";

    let dimension = Dimension::parse_or(params.dimension.as_deref(), Dimension::Drug);
    let sort_by = SortBy::parse(params.sort_by.as_deref());

    let drugs = fetch_drugs(&state, FAILURE).await?;
    let revenue = match sort_by {
        SortBy::Amount => {
            let range = DateRange::parse(params.date_from.as_deref(), params.date_to.as_deref());
            fetch_revenue(&state, range, FAILURE).await?
        }
        SortBy::Count => HashMap::new(),
    };

    Ok(Json(reports::top_sales(
        &drugs,
        dimension,
        params.limit,
        sort_by,
        &revenue,
    )))
}

/// Joint distribution of two dimensions
pub async fn correlation(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<CorrelationParams>,
) -> ApiResult<Json<CorrelationReport>> {
    let dim1 = Dimension::parse_or(params.dim1.as_deref(), Dimension::Manufacturer);
    let dim2 = Dimension::parse_or(params.dim2.as_deref(), Dimension::Country);

    let drugs = fetch_drugs(&state, "Failed to calculate correlation").await?;

    Ok(Json(reports::correlation(&drugs, dim1, dim2)))
}

/// Summary cards, weekly sales chart and alert panels
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<DisplayParams>,
) -> ApiResult<Json<Dashboard>> {
    const FAILURE: &str = "Failed to fetch dashboard data";

    let now = Utc::now();
    let settings = state.settings().await?;
    let display = settings
        .display(&state.display)
        .with_overrides(params.lang.as_deref(), params.currency.as_deref());
    let expiry_alert_days = settings.expiry_alert_days(&state.inventory);

    let storage = &state.storage;
    let recent_query = TransactionQuery {
        limit: RECENT_TRANSACTIONS,
        ..Default::default()
    };
    let (counts, inventory, weekly, recent) = tokio::try_join!(
        storage.counts(),
        storage.list_inventory(None, None),
        storage.transactions_since(Some(dashboard::week_start(now)), None),
        storage.list_transactions(&recent_query),
    )
    .map_err(|e| ApiError::internal(FAILURE, e))?;

    let input = DashboardInput {
        counts,
        inventory,
        weekly_transactions: weekly,
        recent_transactions: recent.0,
    };

    Ok(Json(dashboard::build(
        input,
        now,
        display,
        expiry_alert_days,
    )))
}
