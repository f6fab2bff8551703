//! Integration tests for the storage backends
//!
//! Each scenario runs against SQLite and, when `DATABASE_URL` points at a
//! reachable server, PostgreSQL.
//!
//! Tests can be filtered by database backend using the DATABASE_BACKEND environment variable:
//! - `DATABASE_BACKEND=sqlite cargo test` - Run only SQLite tests
//! - `DATABASE_BACKEND=postgres cargo test` - Run only PostgreSQL tests
//! - By default, both backends are tested
//!
//! PostgreSQL runs share one database, so scenarios only assert on rows they
//! created themselves.

use pharmadash::models::{
    AtxCategory, DistributorInput, DrugInput, InventoryInput, InventoryUpdate, PharmacyInput,
    SupplierInput, SupplierType, TransactionInput, TransactionKind,
};
use pharmadash::storage::{
    DrugQuery, PostgresStorage, SqliteStorage, Storage, StorageError, TransactionQuery,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Get the database backend to test from environment variable
fn should_test_backend(backend: &str) -> bool {
    match std::env::var("DATABASE_BACKEND") {
        Ok(val) => val.to_lowercase() == backend.to_lowercase(),
        Err(_) => true, // Test all backends if not specified
    }
}

/// Helper to create SQLite test storage
async fn create_sqlite_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

/// Helper to create PostgreSQL test storage
async fn create_postgres_storage() -> Option<Arc<dyn Storage>> {
    let db_url = std::env::var("DATABASE_URL").ok()?;
    let storage = PostgresStorage::new(&db_url, 5).await.ok()?;
    storage.init().await.ok()?;
    Some(Arc::new(storage))
}

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Name that no other test run has used.
fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

async fn create_drug(storage: &Arc<dyn Storage>, name: &str) -> i64 {
    storage
        .create_drug(&DrugInput {
            name: name.to_string(),
            manufacturer: Some("Bayer".to_string()),
            country: Some("Germany".to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

async fn create_pharmacy(storage: &Arc<dyn Storage>) -> i64 {
    storage
        .create_pharmacy(&PharmacyInput {
            name: unique("Pharmacy"),
            region: "Tashkent".to_string(),
            is_active: true,
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

async fn create_stock(
    storage: &Arc<dyn Storage>,
    drug_id: i64,
    pharmacy_id: i64,
    quantity: i64,
) -> i64 {
    storage
        .create_inventory(&InventoryInput {
            drug_id,
            pharmacy_id,
            quantity,
            purchase_price_uzs: 1_000.0,
            sale_price_uzs: 1_500.0,
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

// Scenarios

async fn scenario_drug_crud(storage: Arc<dyn Storage>) {
    let name = unique("Drug");
    let id = create_drug(&storage, &name).await;

    let drug = storage.get_drug(id).await.unwrap().unwrap();
    assert_eq!(drug.name, name);
    assert_eq!(drug.manufacturer.as_deref(), Some("Bayer"));
    assert!(!drug.prescription);

    let updated = storage
        .update_drug(
            id,
            &DrugInput {
                name: format!("{name} Forte"),
                prescription: true,
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(updated.prescription);
    assert_eq!(updated.manufacturer, None);

    let (found, total) = storage
        .list_drugs(&DrugQuery {
            search: Some(format!("{name} forte")),
            limit: 10,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(found[0].id, id);

    assert!(storage.delete_drug(id).await.unwrap());
    assert!(!storage.delete_drug(id).await.unwrap());
    assert!(storage.get_drug(id).await.unwrap().is_none());
    assert!(storage.update_drug(id, &DrugInput::default()).await.unwrap().is_none());
}

async fn scenario_directory_crud(storage: Arc<dyn Storage>) {
    let supplier = storage
        .create_supplier(&SupplierInput {
            name: unique("Supplier"),
            name_ru: None,
            country: Some("India".to_string()),
            supplier_type: SupplierType::Importer,
            contact: None,
            phone: None,
            email: None,
            address: None,
            inn: None,
            is_active: false,
        })
        .await
        .unwrap();
    assert_eq!(supplier.supplier_type, SupplierType::Importer);

    let active = storage
        .list_suppliers(Some(&supplier.name), true)
        .await
        .unwrap();
    assert!(active.is_empty());
    let any = storage
        .list_suppliers(Some(&supplier.name), false)
        .await
        .unwrap();
    assert_eq!(any.len(), 1);

    let distributor = storage
        .create_distributor(&DistributorInput {
            name: unique("Distributor"),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(storage
        .get_distributor(distributor.id)
        .await
        .unwrap()
        .is_some());
    assert!(storage.delete_distributor(distributor.id).await.unwrap());
    assert!(storage.delete_supplier(supplier.id).await.unwrap());
}

async fn scenario_stock_movements(storage: Arc<dyn Storage>) {
    let drug_id = create_drug(&storage, &unique("Drug")).await;
    let pharmacy_id = create_pharmacy(&storage).await;
    let inventory_id = create_stock(&storage, drug_id, pharmacy_id, 10).await;

    // Stocking records the purchase
    let (purchases, total) = storage
        .list_transactions(&TransactionQuery {
            kind: Some(TransactionKind::Purchase),
            pharmacy_id: Some(pharmacy_id),
            limit: 10,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(purchases[0].quantity, 10);
    assert_eq!(purchases[0].total_amount_uzs, 10_000.0);

    let mut sale = TransactionInput::new(TransactionKind::Sale, drug_id, pharmacy_id, 4);
    sale.unit_price_uzs = 1_500.0;
    let recorded = storage.record_transaction(&sale).await.unwrap();
    assert_eq!(recorded.total_amount_uzs, 6_000.0);
    assert_eq!(recorded.pharmacy_id, pharmacy_id);

    let item = storage.get_inventory(inventory_id).await.unwrap().unwrap();
    assert_eq!(item.quantity, 6);

    let too_much = TransactionInput::new(TransactionKind::Sale, drug_id, pharmacy_id, 7);
    match storage.record_transaction(&too_much).await {
        Err(StorageError::InsufficientStock {
            available,
            requested,
        }) => {
            assert_eq!(available, 6);
            assert_eq!(requested, 7);
        }
        other => panic!("expected insufficient stock, got {other:?}"),
    }
    let item = storage.get_inventory(inventory_id).await.unwrap().unwrap();
    assert_eq!(item.quantity, 6);

    let mut refund = TransactionInput::new(TransactionKind::Return, drug_id, pharmacy_id, 1);
    refund.unit_price_uzs = 1_500.0;
    let refund = storage.record_transaction(&refund).await.unwrap();
    assert_eq!(refund.total_amount_uzs, -1_500.0);

    let other_pharmacy = create_pharmacy(&storage).await;
    let nowhere = TransactionInput::new(TransactionKind::Sale, drug_id, other_pharmacy, 1);
    assert!(matches!(
        storage.record_transaction(&nowhere).await,
        Err(StorageError::NoInventory { .. })
    ));
}

async fn scenario_concurrent_sales(storage: Arc<dyn Storage>) {
    let drug_id = create_drug(&storage, &unique("Drug")).await;
    let pharmacy_id = create_pharmacy(&storage).await;
    let inventory_id = create_stock(&storage, drug_id, pharmacy_id, 5).await;

    let mut handles = vec![];
    for _ in 0..10 {
        let storage = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            let sale = TransactionInput::new(TransactionKind::Sale, drug_id, pharmacy_id, 1);
            storage.record_transaction(&sale).await
        }));
    }

    let mut sold = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(StorageError::InsufficientStock { .. }) => {}
            // SQLite may refuse a writer while another holds the lock
            Err(StorageError::Other(_)) => {}
            Err(e) => panic!("Unexpected error: {e:?}"),
        }
    }

    let item = storage.get_inventory(inventory_id).await.unwrap().unwrap();
    assert!(sold <= 5, "sold {sold} units out of 5");
    assert_eq!(item.quantity, 5 - sold);
}

async fn scenario_inventory_update_and_delete(storage: Arc<dyn Storage>) {
    let drug_id = create_drug(&storage, &unique("Drug")).await;
    let pharmacy_id = create_pharmacy(&storage).await;
    let inventory_id = create_stock(&storage, drug_id, pharmacy_id, 20).await;

    let updated = storage
        .update_inventory(
            inventory_id,
            &InventoryUpdate {
                min_stock: Some(25),
                expiry_date: Some("2030-01-31".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.quantity, 20);
    assert_eq!(updated.min_stock, 25);
    assert!(updated.is_low_stock());
    assert_eq!(updated.expiry_date.as_deref(), Some("2030-01-31"));

    let listed = storage
        .list_inventory(Some(pharmacy_id), None)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    // The drug is still referenced by stock and history
    assert!(matches!(
        storage.delete_drug(drug_id).await,
        Err(StorageError::InUse { .. })
    ));

    assert!(storage.delete_inventory(inventory_id).await.unwrap());
    assert!(storage.get_inventory(inventory_id).await.unwrap().is_none());
}

async fn scenario_reference_data(storage: Arc<dyn Storage>) {
    let code = format!("Z{}", COUNTER.fetch_add(1, Ordering::Relaxed) % 90 + 10);
    let mut category = AtxCategory {
        code: code.clone(),
        level: 2,
        name: "Test group".to_string(),
        name_ru: None,
        name_uz: None,
        parent_code: Some("Z".to_string()),
    };
    storage.upsert_atx_category(&category).await.unwrap();
    category.name = "Renamed group".to_string();
    storage.upsert_atx_category(&category).await.unwrap();

    let stored = storage
        .list_atx_categories(2, Some("Z"))
        .await
        .unwrap();
    let found: Vec<_> = stored.iter().filter(|c| c.code == code).collect();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Renamed group");

    storage
        .save_settings(&[("organization_name", "PharmaCentral".to_string())])
        .await
        .unwrap();
    storage
        .save_settings(&[("organization_name", "PharmaNorth".to_string())])
        .await
        .unwrap();
    let settings = storage.load_settings().await.unwrap();
    assert_eq!(
        settings.get("organization_name").map(String::as_str),
        Some("PharmaNorth")
    );
}

async fn scenario_counts(storage: Arc<dyn Storage>) {
    let before = storage.counts().await.unwrap();
    create_drug(&storage, &unique("Drug")).await;
    create_pharmacy(&storage).await;
    let after = storage.counts().await.unwrap();

    assert_eq!(after.drugs, before.drugs + 1);
    assert_eq!(after.pharmacies, before.pharmacies + 1);
    assert_eq!(after.active_pharmacies, before.active_pharmacies + 1);
}

macro_rules! backend_tests {
    ($($scenario:ident => $sqlite:ident, $postgres:ident;)*) => {
        $(
            #[tokio::test]
            async fn $sqlite() {
                if !should_test_backend("sqlite") {
                    return;
                }
                $scenario(create_sqlite_storage().await).await;
            }

            #[tokio::test]
            async fn $postgres() {
                if !should_test_backend("postgres") {
                    return;
                }
                let Some(storage) = create_postgres_storage().await else {
                    eprintln!("Skipping PostgreSQL test: DATABASE_URL not set or unreachable");
                    return;
                };
                $scenario(storage).await;
            }
        )*
    };
}

backend_tests! {
    scenario_drug_crud => test_drug_crud_sqlite, test_drug_crud_postgres;
    scenario_directory_crud => test_directory_crud_sqlite, test_directory_crud_postgres;
    scenario_stock_movements => test_stock_movements_sqlite, test_stock_movements_postgres;
    scenario_concurrent_sales => test_concurrent_sales_sqlite, test_concurrent_sales_postgres;
    scenario_inventory_update_and_delete => test_inventory_update_and_delete_sqlite, test_inventory_update_and_delete_postgres;
    scenario_reference_data => test_reference_data_sqlite, test_reference_data_postgres;
    scenario_counts => test_counts_sqlite, test_counts_postgres;
}
