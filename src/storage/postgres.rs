use crate::models::{
    now_unix, AtxCategory, Distributor, DistributorInput, Drug, DrugInput, InventoryInput,
    InventoryItem, InventoryUpdate, Pharmacy, PharmacyInput, Supplier, SupplierInput,
    Transaction, TransactionInput, TransactionKind,
};
use crate::storage::trait_def::{delete_error, insert_error, like_pattern};
use crate::storage::{
    DrugQuery, EntityCounts, Storage, StorageError, StorageResult, TransactionQuery,
};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use std::sync::Arc;

const DRUG_COLUMNS: &str = "id, name, name_ru, name_uz, inn, atx_code, therapeutic_group, form, \
     dosage, manufacturer, country, prescription, barcode, created_at, updated_at";

const PHARMACY_COLUMNS: &str =
    "id, name, region, district, address, phone, email, manager, is_active, created_at, updated_at";

const SUPPLIER_COLUMNS: &str = "id, name, name_ru, country, supplier_type, contact, phone, email, \
     address, inn, is_active, created_at, updated_at";

const DISTRIBUTOR_COLUMNS: &str = "id, name, name_ru, country, region, address, phone, email, inn, \
     is_active, created_at, updated_at";

const INVENTORY_SELECT: &str = r#"
    SELECT i.id, i.drug_id, i.pharmacy_id, i.supplier_id, i.quantity,
           i.purchase_price_uzs, i.sale_price_uzs, i.purchase_price_usd, i.sale_price_usd,
           i.batch_number, i.expiry_date, i.min_stock, i.max_stock, i.location,
           i.created_at, i.updated_at,
           d.name AS drug_name, p.name AS pharmacy_name, s.name AS supplier_name
    FROM inventory i
    JOIN drugs d ON d.id = i.drug_id
    JOIN pharmacies p ON p.id = i.pharmacy_id
    LEFT JOIN suppliers s ON s.id = i.supplier_id
"#;

const TRANSACTION_SELECT: &str = r#"
    SELECT t.id, t.kind, t.drug_id, t.pharmacy_id, t.supplier_id, t.distributor_id,
           t.quantity, t.unit_price_uzs, t.total_amount_uzs, t.currency,
           t.batch_number, t.invoice_number, t.notes, t.created_at,
           d.name AS drug_name, p.name AS pharmacy_name, s.name AS supplier_name
    FROM transactions t
    JOIN drugs d ON d.id = t.drug_id
    JOIN pharmacies p ON p.id = t.pharmacy_id
    LEFT JOIN suppliers s ON s.id = t.supplier_id
"#;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn fetch_inventory(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<InventoryItem>, sqlx::Error> {
        sqlx::query_as::<_, InventoryItem>(&format!("{INVENTORY_SELECT} WHERE i.id = $1"))
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    async fn fetch_transaction(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(&format!("{TRANSACTION_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    async fn insert_transaction(
        conn: &mut PgConnection,
        input: &TransactionInput,
    ) -> Result<i64, sqlx::Error> {
        let created_at = input.created_at.unwrap_or_else(now_unix);

        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO transactions (kind, drug_id, pharmacy_id, supplier_id, distributor_id,
                quantity, unit_price_uzs, total_amount_uzs, currency, batch_number,
                invoice_number, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'UZS', $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(input.kind.as_str())
        .bind(input.drug_id)
        .bind(input.pharmacy_id)
        .bind(input.supplier_id)
        .bind(input.distributor_id)
        .bind(input.quantity)
        .bind(input.unit_price_uzs)
        .bind(input.resolved_total())
        .bind(&input.batch_number)
        .bind(&input.invoice_number)
        .bind(&input.notes)
        .bind(created_at)
        .fetch_one(conn)
        .await
    }

    async fn delete_by_id(
        &self,
        table: &str,
        entity: &'static str,
        id: i64,
    ) -> StorageResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| delete_error(e, entity, id))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS drugs (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                name_ru TEXT,
                name_uz TEXT,
                inn TEXT,
                atx_code TEXT,
                therapeutic_group TEXT,
                form TEXT,
                dosage TEXT,
                manufacturer TEXT,
                country TEXT,
                prescription BOOLEAN NOT NULL DEFAULT FALSE,
                barcode TEXT,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pharmacies (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                region TEXT NOT NULL,
                district TEXT,
                address TEXT,
                phone TEXT,
                email TEXT,
                manager TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS suppliers (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                name_ru TEXT,
                country TEXT,
                supplier_type TEXT NOT NULL,
                contact TEXT,
                phone TEXT,
                email TEXT,
                address TEXT,
                inn TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS distributors (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                name_ru TEXT,
                country TEXT,
                region TEXT,
                address TEXT,
                phone TEXT,
                email TEXT,
                inn TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inventory (
                id BIGSERIAL PRIMARY KEY,
                drug_id BIGINT NOT NULL REFERENCES drugs(id),
                pharmacy_id BIGINT NOT NULL REFERENCES pharmacies(id),
                supplier_id BIGINT REFERENCES suppliers(id) ON DELETE SET NULL,
                quantity BIGINT NOT NULL DEFAULT 0,
                purchase_price_uzs DOUBLE PRECISION NOT NULL,
                sale_price_uzs DOUBLE PRECISION NOT NULL,
                purchase_price_usd DOUBLE PRECISION,
                sale_price_usd DOUBLE PRECISION,
                batch_number TEXT,
                expiry_date TEXT,
                min_stock BIGINT NOT NULL DEFAULT 10,
                max_stock BIGINT,
                location TEXT,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_inventory_drug_pharmacy ON inventory(drug_id, pharmacy_id)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id BIGSERIAL PRIMARY KEY,
                kind TEXT NOT NULL,
                drug_id BIGINT NOT NULL REFERENCES drugs(id),
                pharmacy_id BIGINT NOT NULL REFERENCES pharmacies(id),
                supplier_id BIGINT REFERENCES suppliers(id) ON DELETE SET NULL,
                distributor_id BIGINT REFERENCES distributors(id) ON DELETE SET NULL,
                quantity BIGINT NOT NULL,
                unit_price_uzs DOUBLE PRECISION NOT NULL DEFAULT 0,
                total_amount_uzs DOUBLE PRECISION NOT NULL DEFAULT 0,
                currency TEXT NOT NULL DEFAULT 'UZS',
                batch_number TEXT,
                invoice_number TEXT,
                notes TEXT,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_transactions_created_at ON transactions(created_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_kind ON transactions(kind)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS atx_categories (
                code TEXT PRIMARY KEY,
                level BIGINT NOT NULL,
                name TEXT NOT NULL,
                name_ru TEXT,
                name_uz TEXT,
                parent_code TEXT
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn counts(&self) -> Result<EntityCounts> {
        let counts = sqlx::query_as::<_, EntityCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM drugs) AS drugs,
                (SELECT COUNT(*) FROM pharmacies) AS pharmacies,
                (SELECT COUNT(*) FROM pharmacies WHERE is_active) AS active_pharmacies,
                (SELECT COUNT(*) FROM suppliers) AS suppliers,
                (SELECT COUNT(*) FROM suppliers WHERE is_active) AS active_suppliers,
                (SELECT COUNT(*) FROM distributors) AS distributors,
                (SELECT COUNT(*) FROM inventory) AS inventory,
                (SELECT COUNT(*) FROM transactions) AS transactions
            "#,
        )
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(counts)
    }

    async fn list_drugs(&self, query: &DrugQuery) -> Result<(Vec<Drug>, i64)> {
        let pattern = like_pattern(query.search.as_deref());
        let filter = "($1::TEXT IS NULL OR LOWER(name) LIKE $1 OR LOWER(name_ru) LIKE $1 OR LOWER(name_uz) LIKE $1)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM drugs WHERE {filter}"
        ))
        .bind(&pattern)
        .fetch_one(self.pool.as_ref())
        .await?;

        let drugs = sqlx::query_as::<_, Drug>(&format!(
            "SELECT {DRUG_COLUMNS} FROM drugs WHERE {filter} \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok((drugs, total))
    }

    async fn all_drugs(&self) -> Result<Vec<Drug>> {
        let drugs = sqlx::query_as::<_, Drug>(&format!(
            "SELECT {DRUG_COLUMNS} FROM drugs ORDER BY id"
        ))
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(drugs)
    }

    async fn get_drug(&self, id: i64) -> Result<Option<Drug>> {
        let drug = sqlx::query_as::<_, Drug>(&format!(
            "SELECT {DRUG_COLUMNS} FROM drugs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(drug)
    }

    async fn create_drug(&self, input: &DrugInput) -> Result<Drug> {
        let now = now_unix();

        let drug = sqlx::query_as::<_, Drug>(&format!(
            r#"
            INSERT INTO drugs (name, name_ru, name_uz, inn, atx_code, therapeutic_group, form,
                dosage, manufacturer, country, prescription, barcode, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING {DRUG_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.name_ru)
        .bind(&input.name_uz)
        .bind(&input.inn)
        .bind(&input.atx_code)
        .bind(&input.therapeutic_group)
        .bind(&input.form)
        .bind(&input.dosage)
        .bind(&input.manufacturer)
        .bind(&input.country)
        .bind(input.prescription)
        .bind(&input.barcode)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(drug)
    }

    async fn update_drug(&self, id: i64, input: &DrugInput) -> Result<Option<Drug>> {
        let drug = sqlx::query_as::<_, Drug>(&format!(
            r#"
            UPDATE drugs
            SET name = $1, name_ru = $2, name_uz = $3, inn = $4, atx_code = $5,
                therapeutic_group = $6, form = $7, dosage = $8, manufacturer = $9, country = $10,
                prescription = $11, barcode = $12, updated_at = $13
            WHERE id = $14
            RETURNING {DRUG_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.name_ru)
        .bind(&input.name_uz)
        .bind(&input.inn)
        .bind(&input.atx_code)
        .bind(&input.therapeutic_group)
        .bind(&input.form)
        .bind(&input.dosage)
        .bind(&input.manufacturer)
        .bind(&input.country)
        .bind(input.prescription)
        .bind(&input.barcode)
        .bind(now_unix())
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(drug)
    }

    async fn delete_drug(&self, id: i64) -> StorageResult<bool> {
        self.delete_by_id("drugs", "drug", id).await
    }

    async fn list_pharmacies(
        &self,
        search: Option<&str>,
        active_only: bool,
    ) -> Result<Vec<Pharmacy>> {
        let pattern = like_pattern(search);

        let pharmacies = sqlx::query_as::<_, Pharmacy>(&format!(
            r#"
            SELECT {PHARMACY_COLUMNS} FROM pharmacies
            WHERE ($1::TEXT IS NULL OR LOWER(name) LIKE $1 OR LOWER(region) LIKE $1)
              AND (NOT $2 OR is_active)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(&pattern)
        .bind(active_only)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(pharmacies)
    }

    async fn get_pharmacy(&self, id: i64) -> Result<Option<Pharmacy>> {
        let pharmacy = sqlx::query_as::<_, Pharmacy>(&format!(
            "SELECT {PHARMACY_COLUMNS} FROM pharmacies WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(pharmacy)
    }

    async fn create_pharmacy(&self, input: &PharmacyInput) -> Result<Pharmacy> {
        let now = now_unix();

        let pharmacy = sqlx::query_as::<_, Pharmacy>(&format!(
            r#"
            INSERT INTO pharmacies (name, region, district, address, phone, email, manager,
                is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {PHARMACY_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.region)
        .bind(&input.district)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.manager)
        .bind(input.is_active)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(pharmacy)
    }

    async fn update_pharmacy(&self, id: i64, input: &PharmacyInput) -> Result<Option<Pharmacy>> {
        let pharmacy = sqlx::query_as::<_, Pharmacy>(&format!(
            r#"
            UPDATE pharmacies
            SET name = $1, region = $2, district = $3, address = $4, phone = $5, email = $6,
                manager = $7, is_active = $8, updated_at = $9
            WHERE id = $10
            RETURNING {PHARMACY_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.region)
        .bind(&input.district)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.manager)
        .bind(input.is_active)
        .bind(now_unix())
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(pharmacy)
    }

    async fn delete_pharmacy(&self, id: i64) -> StorageResult<bool> {
        self.delete_by_id("pharmacies", "pharmacy", id).await
    }

    async fn list_suppliers(
        &self,
        search: Option<&str>,
        active_only: bool,
    ) -> Result<Vec<Supplier>> {
        let pattern = like_pattern(search);

        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            SELECT {SUPPLIER_COLUMNS} FROM suppliers
            WHERE ($1::TEXT IS NULL OR LOWER(name) LIKE $1 OR LOWER(name_ru) LIKE $1)
              AND (NOT $2 OR is_active)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(&pattern)
        .bind(active_only)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(suppliers)
    }

    async fn get_supplier(&self, id: i64) -> Result<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(supplier)
    }

    async fn create_supplier(&self, input: &SupplierInput) -> Result<Supplier> {
        let now = now_unix();

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers (name, name_ru, country, supplier_type, contact, phone, email,
                address, inn, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.name_ru)
        .bind(&input.country)
        .bind(input.supplier_type.as_str())
        .bind(&input.contact)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.inn)
        .bind(input.is_active)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(supplier)
    }

    async fn update_supplier(&self, id: i64, input: &SupplierInput) -> Result<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers
            SET name = $1, name_ru = $2, country = $3, supplier_type = $4, contact = $5,
                phone = $6, email = $7, address = $8, inn = $9, is_active = $10, updated_at = $11
            WHERE id = $12
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.name_ru)
        .bind(&input.country)
        .bind(input.supplier_type.as_str())
        .bind(&input.contact)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.inn)
        .bind(input.is_active)
        .bind(now_unix())
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(supplier)
    }

    async fn delete_supplier(&self, id: i64) -> StorageResult<bool> {
        self.delete_by_id("suppliers", "supplier", id).await
    }

    async fn list_distributors(
        &self,
        search: Option<&str>,
        region: Option<&str>,
    ) -> Result<Vec<Distributor>> {
        let pattern = like_pattern(search);
        let region = region.map(str::trim).filter(|r| !r.is_empty());

        let distributors = sqlx::query_as::<_, Distributor>(&format!(
            r#"
            SELECT {DISTRIBUTOR_COLUMNS} FROM distributors
            WHERE ($1::TEXT IS NULL OR LOWER(name) LIKE $1 OR LOWER(name_ru) LIKE $1
                   OR LOWER(country) LIKE $1)
              AND ($2::TEXT IS NULL OR region = $2)
            ORDER BY name, id
            "#
        ))
        .bind(&pattern)
        .bind(region)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(distributors)
    }

    async fn get_distributor(&self, id: i64) -> Result<Option<Distributor>> {
        let distributor = sqlx::query_as::<_, Distributor>(&format!(
            "SELECT {DISTRIBUTOR_COLUMNS} FROM distributors WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(distributor)
    }

    async fn create_distributor(&self, input: &DistributorInput) -> Result<Distributor> {
        let now = now_unix();

        let distributor = sqlx::query_as::<_, Distributor>(&format!(
            r#"
            INSERT INTO distributors (name, name_ru, country, region, address, phone, email, inn,
                is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {DISTRIBUTOR_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.name_ru)
        .bind(&input.country)
        .bind(&input.region)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.inn)
        .bind(input.is_active)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(distributor)
    }

    async fn update_distributor(
        &self,
        id: i64,
        input: &DistributorInput,
    ) -> Result<Option<Distributor>> {
        let distributor = sqlx::query_as::<_, Distributor>(&format!(
            r#"
            UPDATE distributors
            SET name = $1, name_ru = $2, country = $3, region = $4, address = $5, phone = $6,
                email = $7, inn = $8, is_active = $9, updated_at = $10
            WHERE id = $11
            RETURNING {DISTRIBUTOR_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.name_ru)
        .bind(&input.country)
        .bind(&input.region)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.inn)
        .bind(input.is_active)
        .bind(now_unix())
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(distributor)
    }

    async fn delete_distributor(&self, id: i64) -> StorageResult<bool> {
        self.delete_by_id("distributors", "distributor", id).await
    }

    async fn list_inventory(
        &self,
        pharmacy_id: Option<i64>,
        drug_id: Option<i64>,
    ) -> Result<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            {INVENTORY_SELECT}
            WHERE ($1::BIGINT IS NULL OR i.pharmacy_id = $1)
              AND ($2::BIGINT IS NULL OR i.drug_id = $2)
            ORDER BY i.created_at DESC, i.id DESC
            "#
        ))
        .bind(pharmacy_id)
        .bind(drug_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(items)
    }

    async fn get_inventory(&self, id: i64) -> Result<Option<InventoryItem>> {
        let mut conn = self.pool.acquire().await?;
        Ok(Self::fetch_inventory(&mut conn, id).await?)
    }

    async fn create_inventory(&self, input: &InventoryInput) -> StorageResult<InventoryItem> {
        let now = now_unix();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        let inventory_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO inventory (drug_id, pharmacy_id, supplier_id, quantity,
                purchase_price_uzs, sale_price_uzs, purchase_price_usd, sale_price_usd,
                batch_number, expiry_date, min_stock, max_stock, location, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            RETURNING id
            "#,
        )
        .bind(input.drug_id)
        .bind(input.pharmacy_id)
        .bind(input.supplier_id)
        .bind(input.quantity)
        .bind(input.purchase_price_uzs)
        .bind(input.sale_price_uzs)
        .bind(input.purchase_price_usd)
        .bind(input.sale_price_usd)
        .bind(&input.batch_number)
        .bind(&input.expiry_date)
        .bind(input.min_stock.unwrap_or(InventoryInput::DEFAULT_MIN_STOCK))
        .bind(input.max_stock)
        .bind(&input.location)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(insert_error)?;

        if input.quantity > 0 {
            let purchase = TransactionInput {
                supplier_id: input.supplier_id,
                unit_price_uzs: input.purchase_price_uzs,
                batch_number: input.batch_number.clone(),
                invoice_number: input.invoice_number.clone(),
                created_at: Some(now),
                ..TransactionInput::new(
                    TransactionKind::Purchase,
                    input.drug_id,
                    input.pharmacy_id,
                    input.quantity,
                )
            };
            Self::insert_transaction(&mut tx, &purchase)
                .await
                .map_err(insert_error)?;
        }

        let item = Self::fetch_inventory(&mut tx, inventory_id)
            .await
            .map_err(|e| StorageError::Other(e.into()))?
            .ok_or_else(|| {
                StorageError::Other(anyhow::anyhow!("inventory vanished after insert"))
            })?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        Ok(item)
    }

    async fn update_inventory(
        &self,
        id: i64,
        update: &InventoryUpdate,
    ) -> Result<Option<InventoryItem>> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = COALESCE($1, quantity),
                purchase_price_uzs = COALESCE($2, purchase_price_uzs),
                sale_price_uzs = COALESCE($3, sale_price_uzs),
                purchase_price_usd = COALESCE($4, purchase_price_usd),
                sale_price_usd = COALESCE($5, sale_price_usd),
                batch_number = COALESCE($6, batch_number),
                expiry_date = COALESCE($7, expiry_date),
                min_stock = COALESCE($8, min_stock),
                max_stock = COALESCE($9, max_stock),
                location = COALESCE($10, location),
                updated_at = $11
            WHERE id = $12
            "#,
        )
        .bind(update.quantity)
        .bind(update.purchase_price_uzs)
        .bind(update.sale_price_uzs)
        .bind(update.purchase_price_usd)
        .bind(update.sale_price_usd)
        .bind(&update.batch_number)
        .bind(&update.expiry_date)
        .bind(update.min_stock)
        .bind(update.max_stock)
        .bind(&update.location)
        .bind(now_unix())
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_inventory(id).await
    }

    async fn delete_inventory(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM inventory WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<(Vec<Transaction>, i64)> {
        let kind = query.kind.map(|k| k.as_str());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM transactions t
            WHERE ($1::TEXT IS NULL OR t.kind = $1)
              AND ($2::BIGINT IS NULL OR t.pharmacy_id = $2)
            "#,
        )
        .bind(kind)
        .bind(query.pharmacy_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            {TRANSACTION_SELECT}
            WHERE ($1::TEXT IS NULL OR t.kind = $1)
              AND ($2::BIGINT IS NULL OR t.pharmacy_id = $2)
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(kind)
        .bind(query.pharmacy_id)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok((transactions, total))
    }

    async fn transactions_since(
        &self,
        since: Option<i64>,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<Transaction>> {
        let kind = kind.map(|k| k.as_str());

        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            {TRANSACTION_SELECT}
            WHERE ($1::BIGINT IS NULL OR t.created_at >= $1)
              AND ($2::TEXT IS NULL OR t.kind = $2)
            ORDER BY t.created_at DESC, t.id DESC
            "#
        ))
        .bind(since)
        .bind(kind)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(transactions)
    }

    async fn record_transaction(&self, input: &TransactionInput) -> StorageResult<Transaction> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        if input.kind == TransactionKind::Sale {
            let stock = sqlx::query_as::<_, (i64, i64)>(
                r#"
                SELECT id, quantity FROM inventory
                WHERE drug_id = $1 AND pharmacy_id = $2
                ORDER BY quantity DESC, id
                LIMIT 1
                FOR UPDATE
                "#,
            )
            .bind(input.drug_id)
            .bind(input.pharmacy_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

            let (inventory_id, available) = stock.ok_or(StorageError::NoInventory {
                drug_id: input.drug_id,
                pharmacy_id: input.pharmacy_id,
            })?;

            if available < input.quantity {
                return Err(StorageError::InsufficientStock {
                    available,
                    requested: input.quantity,
                });
            }

            let updated = sqlx::query(
                r#"
                UPDATE inventory
                SET quantity = quantity - $1, updated_at = $2
                WHERE id = $3 AND quantity >= $1
                "#,
            )
            .bind(input.quantity)
            .bind(now_unix())
            .bind(inventory_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

            if updated.rows_affected() == 0 {
                return Err(StorageError::InsufficientStock {
                    available,
                    requested: input.quantity,
                });
            }
        }

        let id = Self::insert_transaction(&mut tx, input)
            .await
            .map_err(insert_error)?;

        let transaction = Self::fetch_transaction(&mut tx, id)
            .await
            .map_err(|e| StorageError::Other(e.into()))?
            .ok_or_else(|| {
                StorageError::Other(anyhow::anyhow!("transaction vanished after insert"))
            })?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        Ok(transaction)
    }

    async fn list_atx_categories(
        &self,
        level: i64,
        parent: Option<&str>,
    ) -> Result<Vec<AtxCategory>> {
        let categories = sqlx::query_as::<_, AtxCategory>(
            r#"
            SELECT code, level, name, name_ru, name_uz, parent_code
            FROM atx_categories
            WHERE level = $1 AND ($2::TEXT IS NULL OR parent_code = $2)
            ORDER BY code
            "#,
        )
        .bind(level)
        .bind(parent)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(categories)
    }

    async fn upsert_atx_category(&self, category: &AtxCategory) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO atx_categories (code, level, name, name_ru, name_uz, parent_code)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (code) DO UPDATE SET
                level = EXCLUDED.level,
                name = EXCLUDED.name,
                name_ru = EXCLUDED.name_ru,
                name_uz = EXCLUDED.name_uz,
                parent_code = EXCLUDED.parent_code
            "#,
        )
        .bind(&category.code)
        .bind(category.level)
        .bind(&category.name)
        .bind(&category.name_ru)
        .bind(&category.name_uz)
        .bind(&category.parent_code)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn load_settings(&self) -> Result<HashMap<String, String>> {
        let rows = sqlx::query_as::<_, (String, String)>("SELECT key, value FROM settings")
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().collect())
    }

    async fn save_settings(&self, pairs: &[(&'static str, String)]) -> Result<()> {
        let now = now_unix();
        let mut tx = self.pool.begin().await?;

        for (key, value) in pairs {
            sqlx::query(
                r#"
                INSERT INTO settings (key, value, updated_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (key) DO UPDATE SET
                    value = EXCLUDED.value,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(*key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
