use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use serde::Serialize;
use std::collections::HashMap;

use crate::format::{self, DisplaySettings};
use crate::models::{InventoryItem, InventoryView, Transaction, TransactionKind};
use crate::storage::EntityCounts;

/// Rows shown in the low-stock and expiring panels.
pub const PANEL_ROWS: usize = 5;
pub const TOP_DRUGS: usize = 5;
pub const RECENT_TRANSACTIONS: i64 = 10;

/// Everything the dashboard needs, fetched up front.
pub struct DashboardInput {
    pub counts: EntityCounts,
    pub inventory: Vec<InventoryItem>,
    /// Transactions of the last seven days, any kind
    pub weekly_transactions: Vec<Transaction>,
    pub recent_transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_drugs: i64,
    pub total_pharmacies: i64,
    pub total_suppliers: i64,
    pub total_inventory_value: f64,
    pub total_inventory_value_formatted: String,
    pub today_sales_amount: f64,
    pub today_sales_formatted: String,
    pub today_sales_count: usize,
    pub low_stock_count: usize,
    pub expiring_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaySales {
    pub name: &'static str,
    pub sales: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopDrug {
    pub drug_id: i64,
    pub drug_name: String,
    pub quantity: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub weekly_sales: Vec<DaySales>,
    pub top_drugs: Vec<TopDrug>,
    pub low_stock_items: Vec<InventoryView>,
    pub expiring_items: Vec<InventoryView>,
    pub recent_transactions: Vec<Transaction>,
    pub display: DisplaySettings,
}

/// Start of the seven-day window ending at `now`.
pub fn week_start(now: DateTime<Utc>) -> i64 {
    (now - Duration::days(7)).timestamp()
}

const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

pub fn build(
    input: DashboardInput,
    now: DateTime<Utc>,
    display: DisplaySettings,
    expiry_alert_days: i64,
) -> Dashboard {
    let today = now.date_naive();
    let today_start = today.and_time(NaiveTime::MIN).and_utc().timestamp();

    let sales: Vec<&Transaction> = input
        .weekly_transactions
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Sale)
        .collect();

    let today_sales: Vec<&&Transaction> =
        sales.iter().filter(|tx| tx.created_at >= today_start).collect();
    let today_sales_amount: f64 = today_sales.iter().map(|tx| tx.total_amount_uzs).sum();

    let mut by_weekday: HashMap<Weekday, f64> = HashMap::new();
    let mut by_drug: HashMap<i64, TopDrug> = HashMap::new();
    for tx in &sales {
        if let Some(created) = DateTime::from_timestamp(tx.created_at, 0) {
            *by_weekday.entry(created.weekday()).or_insert(0.0) += tx.total_amount_uzs;
        }

        let entry = by_drug.entry(tx.drug_id).or_insert_with(|| TopDrug {
            drug_id: tx.drug_id,
            drug_name: tx.drug_name.clone(),
            quantity: 0,
            revenue: 0.0,
        });
        entry.quantity += tx.quantity;
        entry.revenue += tx.total_amount_uzs;
    }

    let weekly_sales = WEEK
        .iter()
        .map(|day| DaySales {
            name: format::weekday_label(*day, display.language),
            sales: by_weekday.get(day).copied().unwrap_or(0.0),
        })
        .collect();

    let mut top_drugs: Vec<TopDrug> = by_drug.into_values().collect();
    top_drugs.sort_by(|a, b| {
        b.revenue
            .partial_cmp(&a.revenue)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.drug_name.cmp(&b.drug_name))
    });
    top_drugs.truncate(TOP_DRUGS);

    let total_inventory_value: f64 = input.inventory.iter().map(InventoryItem::value_uzs).sum();

    let low_stock: Vec<&InventoryItem> =
        input.inventory.iter().filter(|i| i.is_low_stock()).collect();
    let expiring: Vec<&InventoryItem> = input
        .inventory
        .iter()
        .filter(|i| i.is_expiring(today, expiry_alert_days))
        .collect();

    let panel = |items: &[&InventoryItem]| -> Vec<InventoryView> {
        items
            .iter()
            .take(PANEL_ROWS)
            .map(|item| (*item).clone().into_view(today))
            .collect()
    };

    Dashboard {
        stats: DashboardStats {
            total_drugs: input.counts.drugs,
            total_pharmacies: input.counts.active_pharmacies,
            total_suppliers: input.counts.active_suppliers,
            total_inventory_value,
            total_inventory_value_formatted: format::format_money(total_inventory_value, &display),
            today_sales_amount,
            today_sales_formatted: format::format_money(today_sales_amount, &display),
            today_sales_count: today_sales.len(),
            low_stock_count: low_stock.len(),
            expiring_count: expiring.len(),
        },
        weekly_sales,
        top_drugs,
        low_stock_items: panel(&low_stock),
        expiring_items: panel(&expiring),
        recent_transactions: input.recent_transactions,
        display,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Currency, Language};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        // Wednesday
        Utc.with_ymd_and_hms(2024, 3, 6, 15, 0, 0).unwrap()
    }

    fn display(language: Language) -> DisplaySettings {
        DisplaySettings {
            language,
            currency: Currency::Uzs,
            usd_rate: 12850.0,
        }
    }

    fn tx(kind: TransactionKind, drug_id: i64, amount: f64, created_at: i64) -> Transaction {
        Transaction {
            id: 0,
            kind,
            drug_id,
            pharmacy_id: 1,
            supplier_id: None,
            distributor_id: None,
            quantity: 2,
            unit_price_uzs: amount / 2.0,
            total_amount_uzs: amount,
            currency: "UZS".to_string(),
            batch_number: None,
            invoice_number: None,
            notes: None,
            created_at,
            drug_name: format!("Drug {drug_id}"),
            pharmacy_name: "Central".to_string(),
            supplier_name: None,
        }
    }

    fn stock(quantity: i64, min_stock: i64, expiry: Option<&str>) -> InventoryItem {
        InventoryItem {
            id: 1,
            drug_id: 1,
            pharmacy_id: 1,
            supplier_id: None,
            quantity,
            purchase_price_uzs: 1000.0,
            sale_price_uzs: 2000.0,
            purchase_price_usd: None,
            sale_price_usd: None,
            batch_number: None,
            expiry_date: expiry.map(str::to_string),
            min_stock,
            max_stock: None,
            location: None,
            created_at: 0,
            updated_at: 0,
            drug_name: "Drug 1".to_string(),
            pharmacy_name: "Central".to_string(),
            supplier_name: None,
        }
    }

    fn input(weekly: Vec<Transaction>, inventory: Vec<InventoryItem>) -> DashboardInput {
        DashboardInput {
            counts: EntityCounts {
                drugs: 3,
                pharmacies: 2,
                active_pharmacies: 1,
                suppliers: 4,
                active_suppliers: 3,
                ..Default::default()
            },
            inventory,
            weekly_transactions: weekly,
            recent_transactions: Vec::new(),
        }
    }

    #[test]
    fn test_today_and_weekly_sales() {
        let now = now();
        let ts = now.timestamp();
        let yesterday = ts - 86_400;

        let weekly = vec![
            tx(TransactionKind::Sale, 1, 10_000.0, ts - 60),
            tx(TransactionKind::Sale, 2, 5_000.0, yesterday),
            tx(TransactionKind::Purchase, 1, 99_000.0, ts - 30),
        ];
        let dashboard = build(input(weekly, Vec::new()), now, display(Language::En), 90);

        assert_eq!(dashboard.stats.today_sales_amount, 10_000.0);
        assert_eq!(dashboard.stats.today_sales_count, 1);
        assert_eq!(dashboard.stats.today_sales_formatted, "10 000 UZS");
        assert_eq!(dashboard.stats.total_pharmacies, 1);
        assert_eq!(dashboard.stats.total_suppliers, 3);

        assert_eq!(dashboard.weekly_sales.len(), 7);
        assert_eq!(dashboard.weekly_sales[0].name, "Sun");
        assert_eq!(dashboard.weekly_sales[3].name, "Wed");
        assert_eq!(dashboard.weekly_sales[3].sales, 10_000.0);
        assert_eq!(dashboard.weekly_sales[2].sales, 5_000.0);
        assert_eq!(dashboard.weekly_sales[0].sales, 0.0);
    }

    #[test]
    fn test_weekday_labels_follow_language() {
        let dashboard = build(input(Vec::new(), Vec::new()), now(), display(Language::Ru), 90);
        assert_eq!(dashboard.weekly_sales[1].name, "Пн");
    }

    #[test]
    fn test_top_drugs_by_revenue() {
        let ts = now().timestamp();
        let weekly = vec![
            tx(TransactionKind::Sale, 1, 1_000.0, ts),
            tx(TransactionKind::Sale, 2, 8_000.0, ts),
            tx(TransactionKind::Sale, 1, 2_000.0, ts),
            tx(TransactionKind::Return, 2, -9_000.0, ts),
        ];
        let dashboard = build(input(weekly, Vec::new()), now(), display(Language::En), 90);

        assert_eq!(dashboard.top_drugs.len(), 2);
        assert_eq!(dashboard.top_drugs[0].drug_id, 2);
        assert_eq!(dashboard.top_drugs[1].revenue, 3_000.0);
        assert_eq!(dashboard.top_drugs[1].quantity, 4);
    }

    #[test]
    fn test_inventory_panels() {
        let inventory = vec![
            stock(5, 10, None),
            stock(50, 10, Some("2024-04-01")),
            stock(50, 10, Some("2025-01-01")),
            stock(0, 10, Some("2024-01-01")),
        ];
        let dashboard = build(input(Vec::new(), inventory), now(), display(Language::En), 90);

        assert_eq!(dashboard.stats.low_stock_count, 2);
        assert_eq!(dashboard.stats.expiring_count, 2);
        assert_eq!(dashboard.stats.total_inventory_value, 210_000.0);
        assert_eq!(dashboard.low_stock_items.len(), 2);
        assert_eq!(
            dashboard.expiring_items[1].expiry_status,
            format::ExpiryStatus::Expired
        );
    }

    #[test]
    fn test_week_start() {
        assert_eq!(week_start(now()), now().timestamp() - 7 * 86_400);
    }
}
