use axum::{routing::get, Router};
use std::sync::Arc;

use crate::config::{DisplayConfig, InventoryConfig};
use crate::storage::Storage;

use super::analytics::{correlation, get_dashboard, market_share, top_sales};
use super::handlers::{
    create_distributor, create_drug, create_inventory, create_pharmacy, create_supplier,
    create_transaction, debug_info, delete_distributor, delete_drug, delete_inventory,
    delete_pharmacy, delete_supplier, get_distributor, get_drug, get_inventory, get_pharmacy,
    get_settings, get_supplier, health_check, list_atx, list_distributors, list_drugs,
    list_inventory, list_pharmacies, list_suppliers, list_transactions, update_distributor,
    update_drug, update_inventory, update_pharmacy, update_settings, update_supplier, AppState,
};

/// All JSON endpoints, mounted under `/api`.
pub fn create_api_router(
    storage: Arc<dyn Storage>,
    display: DisplayConfig,
    inventory: InventoryConfig,
) -> Router {
    let state = Arc::new(AppState {
        storage,
        display,
        inventory,
    });

    let catalog_routes = Router::new()
        .route("/drugs", get(list_drugs).post(create_drug))
        .route(
            "/drugs/{id}",
            get(get_drug).put(update_drug).delete(delete_drug),
        )
        .route("/pharmacies", get(list_pharmacies).post(create_pharmacy))
        .route(
            "/pharmacies/{id}",
            get(get_pharmacy).put(update_pharmacy).delete(delete_pharmacy),
        )
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/suppliers/{id}",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
        .route(
            "/distributors",
            get(list_distributors).post(create_distributor),
        )
        .route(
            "/distributors/{id}",
            get(get_distributor)
                .put(update_distributor)
                .delete(delete_distributor),
        )
        .route("/atx", get(list_atx))
        .route("/settings", get(get_settings).put(update_settings));

    let stock_routes = Router::new()
        .route("/inventory", get(list_inventory).post(create_inventory))
        .route(
            "/inventory/{id}",
            get(get_inventory)
                .put(update_inventory)
                .delete(delete_inventory),
        )
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        );

    let analytics_routes = Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/market-share", get(market_share))
        .route("/top-sales", get(top_sales))
        .route("/correlation", get(correlation));

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/debug", get(debug_info))
        .merge(catalog_routes)
        .merge(stock_routes)
        .merge(analytics_routes)
        .with_state(state);

    Router::new().nest("/api", api)
}
