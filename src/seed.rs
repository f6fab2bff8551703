//! Deterministic sample data for local development and demos.
//!
//! Everything goes through the [`Storage`] trait, so the same data lands in
//! SQLite or PostgreSQL. Quantities and prices are derived from row indices
//! instead of a random generator; seeding twice produces the same shape.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Months, Utc};
use tracing::{debug, info};

use crate::config::DisplayConfig;
use crate::models::settings::{
    KEY_CURRENCY, KEY_EXPIRY_ALERT_DAYS, KEY_LANGUAGE, KEY_LOW_STOCK_THRESHOLD,
    KEY_ORGANIZATION_NAME, KEY_USD_RATE,
};
use crate::models::{
    atx::standard_atx, Drug, DrugInput, InventoryInput, Pharmacy, PharmacyInput, Supplier,
    SupplierInput, SupplierType, TransactionInput, TransactionKind,
};
use crate::storage::{Storage, StorageError};

pub const TRANSACTIONS: usize = 200;

/// (name, country, type, contact, phone, email, address, tax id)
type SupplierRow = (
    &'static str,
    &'static str,
    SupplierType,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
);

#[rustfmt::skip]
const SUPPLIERS: [SupplierRow; 8] = [
    ("Uzpharma", "Uzbekistan", SupplierType::Manufacturer, "Aliev Rustam", "+998 71 256-78-90", "info@uzpharma.uz", "Tashkent, Chilanzar", "123456789"),
    ("Nobel Pharma", "Turkey", SupplierType::Distributor, "Mehmet Yilmaz", "+90 212 555-12-34", "info@nobelpharma.com", "Istanbul", "987654321"),
    ("Sandoz", "Switzerland", SupplierType::Manufacturer, "Hans Mueller", "+41 61 324-25-26", "orders@sandoz.com", "Basel", "CHE123456"),
    ("Dr. Reddy's", "India", SupplierType::Manufacturer, "Raj Patel", "+91 40 4900-2900", "export@drreddys.com", "Hyderabad", "IND456789"),
    ("Bayer", "Germany", SupplierType::Manufacturer, "Klaus Schmidt", "+49 214 30-1", "pharma@bayer.com", "Leverkusen", "DE123456789"),
    ("Biokom", "Russia", SupplierType::Importer, "Sergeev P.A.", "+7 495 123-45-67", "sales@biokom.ru", "Moscow", "RU987654321"),
    ("Teva Pharmaceuticals", "Israel", SupplierType::Manufacturer, "David Cohen", "+972 3 926-7267", "orders@teva.com", "Tel Aviv", "IL555666777"),
    ("Novartis", "Switzerland", SupplierType::Manufacturer, "Emma Brunner", "+41 61 324-11-11", "export@novartis.com", "Basel", "CHE789012"),
];

/// (name, region, district, address, phone, email, manager)
type PharmacyRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
);

#[rustfmt::skip]
const PHARMACIES: [PharmacyRow; 5] = [
    ("Pharmacy #1 - Central", "Tashkent", "Chilanzar", "Katartal St, 28", "+998 71 123-45-67", "apteka1@pharma.uz", "Ivanova A.S."),
    ("Pharmacy #2 - Yunusabad", "Tashkent", "Yunusabad", "Amir Temur Ave, 108", "+998 71 234-56-78", "apteka2@pharma.uz", "Petrov I.V."),
    ("Pharmacy #3 - Sergeli", "Tashkent", "Sergeli", "Mustaqillik St, 45", "+998 71 345-67-89", "apteka3@pharma.uz", "Sidorova M.K."),
    ("Pharmacy #4 - Samarkand", "Samarkand", "Center", "Registan Ave, 12", "+998 66 123-45-67", "apteka4@pharma.uz", "Aliev R.Sh."),
    ("Pharmacy #5 - Bukhara", "Bukhara", "Center", "Navoi St, 5", "+998 65 221-33-44", "apteka5@pharma.uz", "Karimov O.T."),
];

/// (name, name_ru, inn, atx code, therapeutic group, form, dosage,
/// manufacturer, country, prescription)
type DrugRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    bool,
);

#[rustfmt::skip]
const DRUGS: [DrugRow; 36] = [
    ("Paracetamol", "Парацетамол", "Paracetamolum", "N02BE01", "Analgesics", "Tablets", "500mg", "Uzpharma", "Uzbekistan", false),
    ("Paracetamol Pediatric", "Парацетамол Детский", "Paracetamolum", "N02BE01", "Analgesics", "Syrup", "120mg/5ml", "Uzpharma", "Uzbekistan", false),
    ("Analgin", "Анальгин", "Metamizolum natricum", "N02BB02", "Analgesics", "Tablets", "500mg", "Biokom", "Russia", false),
    ("Ketanov", "Кетанов", "Ketorolacum", "M01AB15", "NSAIDs", "Tablets", "10mg", "Teva", "Israel", true),
    ("Ibuprofen", "Ибупрофен", "Ibuprofenum", "M01AE01", "NSAIDs", "Tablets", "400mg", "Nobel Pharma", "Turkey", false),
    ("Diclofenac", "Диклофенак", "Diclofenacum", "M01AB05", "NSAIDs", "Tablets", "50mg", "Sandoz", "Switzerland", true),
    ("Diclofenac Gel", "Диклофенак Гель", "Diclofenacum", "M02AA15", "NSAIDs", "Gel", "1%", "Sandoz", "Switzerland", false),
    ("Nimesulide", "Нимесулид", "Nimesulidum", "M01AX17", "NSAIDs", "Tablets", "100mg", "Dr. Reddy's", "India", true),
    ("Amoxicillin", "Амоксициллин", "Amoxicillinum", "J01CA04", "Antibiotics", "Capsules", "500mg", "Sandoz", "Switzerland", true),
    ("Amoxiclav", "Амоксиклав", "Amoxicillinum + Acidum clavulanicum", "J01CR02", "Antibiotics", "Tablets", "625mg", "Sandoz", "Switzerland", true),
    ("Ceftriaxone", "Цефтриаксон", "Ceftriaxonum", "J01DD04", "Antibiotics", "Powder", "1g", "Biokom", "Russia", true),
    ("Azithromycin", "Азитромицин", "Azithromycinum", "J01FA10", "Antibiotics", "Tablets", "500mg", "Teva", "Israel", true),
    ("Ciprofloxacin", "Ципрофлоксацин", "Ciprofloxacinum", "J01MA02", "Antibiotics", "Tablets", "500mg", "Bayer", "Germany", true),
    ("Aspirin Cardio", "Аспирин Кардио", "Acidum acetylsalicylicum", "B01AC06", "Antiplatelets", "Tablets", "100mg", "Bayer", "Germany", false),
    ("Amlodipine", "Амлодипин", "Amlodipinum", "C08CA01", "Calcium channel blockers", "Tablets", "5mg", "Novartis", "Switzerland", true),
    ("Lisinopril", "Лизиноприл", "Lisinoprilum", "C09AA03", "ACE inhibitors", "Tablets", "10mg", "Teva", "Israel", true),
    ("Enalapril", "Эналаприл", "Enalaprilum", "C09AA02", "ACE inhibitors", "Tablets", "20mg", "Dr. Reddy's", "India", true),
    ("Bisoprolol", "Бисопролол", "Bisoprololum", "C07AB07", "Beta blockers", "Tablets", "5mg", "Sandoz", "Switzerland", true),
    ("Atorvastatin", "Аторвастатин", "Atorvastatinum", "C10AA05", "Statins", "Tablets", "20mg", "Teva", "Israel", true),
    ("Omeprazole", "Омепразол", "Omeprazolum", "A02BC01", "PPIs", "Capsules", "20mg", "Dr. Reddy's", "India", true),
    ("Pantoprazole", "Пантопразол", "Pantoprazolum", "A02BC02", "PPIs", "Tablets", "40mg", "Novartis", "Switzerland", true),
    ("Famotidine", "Фамотидин", "Famotidinum", "A02BA03", "H2 blockers", "Tablets", "40mg", "Uzpharma", "Uzbekistan", false),
    ("Mezym Forte", "Мезим Форте", "Pancreatinum", "A09AA02", "Digestive enzymes", "Tablets", "10000 IU", "Berlin-Chemie", "Germany", false),
    ("Smecta", "Смекта", "Diosmectite", "A07BC05", "Antidiarrheals", "Powder", "3g", "Ipsen", "France", false),
    ("Metformin", "Метформин", "Metforminum", "A10BA02", "Antidiabetics", "Tablets", "850mg", "Merck", "Germany", true),
    ("Glibenclamide", "Глибенкламид", "Glibenclamidum", "A10BB01", "Antidiabetics", "Tablets", "5mg", "Sanofi", "France", true),
    ("Loratadine", "Лоратадин", "Loratadinum", "R06AX13", "Antihistamines", "Tablets", "10mg", "Uzpharma", "Uzbekistan", false),
    ("Cetirizine", "Цетиризин", "Cetirizinum", "R06AE07", "Antihistamines", "Tablets", "10mg", "Teva", "Israel", false),
    ("Suprastin", "Супрастин", "Chloropyramine", "R06AC03", "Antihistamines", "Tablets", "25mg", "Egis", "Hungary", false),
    ("Ambroxol", "Амброксол", "Ambroxolum", "R05CB06", "Mucolytics", "Syrup", "30mg/5ml", "Uzpharma", "Uzbekistan", false),
    ("ACC", "АЦЦ", "Acetylcysteinum", "R05CB01", "Mucolytics", "Powder", "200mg", "Sandoz", "Switzerland", false),
    ("Vitamin C", "Витамин C", "Acidum ascorbicum", "A11GA01", "Vitamins", "Tablets", "500mg", "Uzpharma", "Uzbekistan", false),
    ("Vitamin D3", "Витамин D3", "Colecalciferolum", "A11CC05", "Vitamins", "Drops", "500 IU/drop", "Teva", "Israel", false),
    ("Complivit", "Компливит", "Multivitamins", "A11AA03", "Vitamins", "Tablets", "", "Pharmstandard", "Russia", false),
    ("Clotrimazole cream", "Клотримазол крем", "Clotrimazolum", "D01AC01", "Antifungals", "Cream", "1%", "Bayer", "Germany", false),
    ("Hydrocortisone ointment", "Гидрокортизон мазь", "Hydrocortisonum", "D07AA02", "Corticosteroids", "Ointment", "1%", "Novartis", "Switzerland", true),
];

/// Transaction kinds cycle through this pattern: mostly sales.
const KIND_CYCLE: [TransactionKind; 5] = [
    TransactionKind::Sale,
    TransactionKind::Purchase,
    TransactionKind::Sale,
    TransactionKind::Sale,
    TransactionKind::Return,
];

/// What a seed run inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub atx_categories: usize,
    pub suppliers: usize,
    pub pharmacies: usize,
    pub drugs: usize,
    pub inventory: usize,
    pub transactions: usize,
    /// Sales dropped because the pharmacy had no stock of the drug
    pub skipped_sales: usize,
}

/// Stable pseudo-random value in `0..modulus` for a pair of indices.
fn spread(a: usize, b: usize, modulus: u64) -> u64 {
    let mut x = (a as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((b as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F))
        .wrapping_add(0x1656_67B1_9E37_79F9);
    x ^= x >> 31;
    x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x ^= x >> 29;
    x % modulus.max(1)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Insert the full sample data set.
pub async fn run(storage: &dyn Storage, now: DateTime<Utc>) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    info!("Seeding ATX categories");
    for category in standard_atx(1, None) {
        storage
            .upsert_atx_category(&category)
            .await
            .with_context(|| format!("Failed to store ATX category {}", category.code))?;
        summary.atx_categories += 1;
    }

    info!("Seeding suppliers");
    let suppliers = seed_suppliers(storage).await?;
    summary.suppliers = suppliers.len();

    info!("Seeding pharmacies");
    let pharmacies = seed_pharmacies(storage).await?;
    summary.pharmacies = pharmacies.len();

    info!("Seeding drugs");
    let drugs = seed_drugs(storage).await?;
    summary.drugs = drugs.len();

    info!("Seeding inventory");
    summary.inventory = seed_inventory(storage, &drugs, &pharmacies, &suppliers, now).await?;

    info!("Seeding transactions");
    let (recorded, skipped) =
        seed_transactions(storage, &drugs, &pharmacies, &suppliers, now).await?;
    summary.transactions = recorded;
    summary.skipped_sales = skipped;

    let rate = DisplayConfig::DEFAULT_USD_RATE;
    storage
        .save_settings(&[
            (KEY_ORGANIZATION_NAME, "PharmaCentral".to_string()),
            (KEY_LANGUAGE, "ru".to_string()),
            (KEY_CURRENCY, "UZS".to_string()),
            (KEY_USD_RATE, rate.to_string()),
            (KEY_LOW_STOCK_THRESHOLD, "20".to_string()),
            (KEY_EXPIRY_ALERT_DAYS, "90".to_string()),
        ])
        .await
        .context("Failed to store settings")?;

    info!(?summary, "Seed complete");
    Ok(summary)
}

async fn seed_suppliers(storage: &dyn Storage) -> Result<Vec<Supplier>> {
    let mut created = Vec::with_capacity(SUPPLIERS.len());
    for (name, country, supplier_type, contact, phone, email, address, inn) in SUPPLIERS {
        let input = SupplierInput {
            name: name.to_string(),
            name_ru: None,
            country: Some(country.to_string()),
            supplier_type,
            contact: Some(contact.to_string()),
            phone: Some(phone.to_string()),
            email: Some(email.to_string()),
            address: Some(address.to_string()),
            inn: Some(inn.to_string()),
            is_active: true,
        };
        created.push(
            storage
                .create_supplier(&input)
                .await
                .with_context(|| format!("Failed to create supplier {name}"))?,
        );
    }
    Ok(created)
}

async fn seed_pharmacies(storage: &dyn Storage) -> Result<Vec<Pharmacy>> {
    let mut created = Vec::with_capacity(PHARMACIES.len());
    for (name, region, district, address, phone, email, manager) in PHARMACIES {
        let input = PharmacyInput {
            name: name.to_string(),
            region: region.to_string(),
            district: Some(district.to_string()),
            address: Some(address.to_string()),
            phone: Some(phone.to_string()),
            email: Some(email.to_string()),
            manager: Some(manager.to_string()),
            is_active: true,
        };
        created.push(
            storage
                .create_pharmacy(&input)
                .await
                .with_context(|| format!("Failed to create pharmacy {name}"))?,
        );
    }
    Ok(created)
}

async fn seed_drugs(storage: &dyn Storage) -> Result<Vec<Drug>> {
    let mut created = Vec::with_capacity(DRUGS.len());
    for (i, row) in DRUGS.iter().enumerate() {
        let (name, name_ru, inn, atx, group, form, dosage, manufacturer, country, rx) = *row;
        let input = DrugInput {
            name: name.to_string(),
            name_ru: Some(name_ru.to_string()),
            name_uz: None,
            inn: Some(inn.to_string()),
            atx_code: Some(atx.to_string()),
            therapeutic_group: Some(group.to_string()),
            form: Some(form.to_string()),
            dosage: (!dosage.is_empty()).then(|| dosage.to_string()),
            manufacturer: Some(manufacturer.to_string()),
            country: Some(country.to_string()),
            prescription: rx,
            barcode: Some(format!("86000000{:05}", i + 1)),
        };
        created.push(
            storage
                .create_drug(&input)
                .await
                .with_context(|| format!("Failed to create drug {name}"))?,
        );
    }
    Ok(created)
}

async fn seed_inventory(
    storage: &dyn Storage,
    drugs: &[Drug],
    pharmacies: &[Pharmacy],
    suppliers: &[Supplier],
    now: DateTime<Utc>,
) -> Result<usize> {
    let today = now.date_naive();
    let year = today.format("%Y");
    let mut count = 0;

    for (p, pharmacy) in pharmacies.iter().enumerate() {
        for (d, drug) in drugs.iter().enumerate() {
            // Roughly one pair in seven is out of the assortment.
            if spread(p, d, 7) == 0 {
                continue;
            }

            let purchase = 5_000.0 + spread(d, p + 11, 80_000) as f64;
            let markup = 1.25 + spread(p + 3, d, 50) as f64 / 100.0;
            let sale = (purchase * markup).floor();
            let expiry = today
                .checked_add_months(Months::new(2 + spread(d + 5, p, 34) as u32))
                .map(|date| date.format("%Y-%m-%d").to_string());
            let atx_prefix: String = drug
                .atx_code
                .as_deref()
                .unwrap_or("XXX")
                .chars()
                .take(3)
                .collect();
            let supplier = &suppliers[spread(p, d + 17, suppliers.len() as u64) as usize];

            let input = InventoryInput {
                drug_id: drug.id,
                pharmacy_id: pharmacy.id,
                supplier_id: Some(supplier.id),
                quantity: 5 + spread(p + 1, d + 1, 500) as i64,
                purchase_price_uzs: purchase,
                sale_price_uzs: sale,
                purchase_price_usd: Some(round_cents(purchase / DisplayConfig::DEFAULT_USD_RATE)),
                sale_price_usd: Some(round_cents(sale / DisplayConfig::DEFAULT_USD_RATE)),
                batch_number: Some(format!("{atx_prefix}-{year}-{:03}", spread(d, p, 999))),
                expiry_date: expiry,
                min_stock: Some(10 + spread(d + 2, p + 2, 30) as i64),
                max_stock: None,
                location: None,
                invoice_number: Some(format!("PO-{:06}", 10_000 + count)),
            };

            storage
                .create_inventory(&input)
                .await
                .with_context(|| format!("Failed to stock {} at {}", drug.name, pharmacy.name))?;
            count += 1;
        }
    }
    Ok(count)
}

async fn seed_transactions(
    storage: &dyn Storage,
    drugs: &[Drug],
    pharmacies: &[Pharmacy],
    suppliers: &[Supplier],
    now: DateTime<Utc>,
) -> Result<(usize, usize)> {
    let today = now.date_naive();
    let mut recorded = 0;
    let mut skipped = 0;

    for i in 0..TRANSACTIONS {
        let kind = KIND_CYCLE[i % KIND_CYCLE.len()];
        let drug = &drugs[spread(i, 1, drugs.len() as u64) as usize];
        let pharmacy = &pharmacies[spread(i, 2, pharmacies.len() as u64) as usize];
        let quantity = 1 + spread(i, 3, 50) as i64;

        let day = today - Duration::days(spread(i, 4, 30) as i64);
        let created_at = day
            .and_hms_opt(8 + spread(i, 5, 12) as u32, spread(i, 6, 60) as u32, 0)
            .map(|t| t.and_utc().timestamp().min(now.timestamp()));

        let prefix = match kind {
            TransactionKind::Sale => "INV",
            TransactionKind::Purchase => "PO",
            _ => "RET",
        };

        let mut input = TransactionInput::new(kind, drug.id, pharmacy.id, quantity);
        input.unit_price_uzs = 5_000.0 + spread(i, 7, 80_000) as f64;
        input.invoice_number = Some(format!("{prefix}-{:06}", 100_000 + i));
        input.created_at = created_at;
        if kind == TransactionKind::Purchase {
            input.supplier_id = Some(suppliers[spread(i, 8, suppliers.len() as u64) as usize].id);
        }

        match storage.record_transaction(&input).await {
            Ok(_) => recorded += 1,
            Err(StorageError::NoInventory { .. } | StorageError::InsufficientStock { .. }) => {
                debug!(drug = %drug.name, pharmacy = %pharmacy.name, "Skipping sale without stock");
                skipped += 1;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to record transaction {}", i + 1)))
            }
        }
    }
    Ok((recorded, skipped))
}
