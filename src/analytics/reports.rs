//! Response bodies of the market-share, top-sales and correlation endpoints,
//! built from a fetched drug catalog.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::analytics::aggregator::{
    aggregate, count_by_dimension, cross_tabulate, sort_by_amount, to_market_share, top_n,
    CrossTab,
};
use crate::analytics::dimension::Dimension;
use crate::format;
use crate::models::{Drug, Transaction, TransactionKind};

/// Inclusive calendar-day window, open on either side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Malformed dates are treated as absent.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Self {
        Self {
            from: format::parse_date(from),
            to: format::parse_date(to),
        }
    }

    /// First second of `from`, for narrowing the transaction fetch.
    pub fn start_timestamp(&self) -> Option<i64> {
        self.from.map(|d| d.and_time(NaiveTime::MIN).and_utc().timestamp())
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        let Some(day) = chrono::DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
        else {
            return false;
        };
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

/// SALE revenue (UZS) per drug id within `range`.
pub fn revenue_by_drug(transactions: &[Transaction], range: DateRange) -> HashMap<i64, f64> {
    let mut revenue = HashMap::new();
    for tx in transactions
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Sale && range.contains(tx.created_at))
    {
        *revenue.entry(tx.drug_id).or_insert(0.0) += tx.total_amount_uzs;
    }
    revenue
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketShareRow {
    pub id: String,
    pub name: String,
    pub count: usize,
    pub share_by_quantity: f64,
    pub total_quantity: usize,
    #[serde(rename = "totalAmountUZS")]
    pub total_amount_uzs: f64,
    #[serde(rename = "totalAmountUSD")]
    pub total_amount_usd: f64,
    pub share_by_amount: f64,
    /// Revenue per drug in the group
    pub average: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketShareSummary {
    pub total_items: usize,
    pub unique_groups: usize,
    pub top_group: Option<String>,
    pub top_group_share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketShareReport {
    pub dimension: Dimension,
    pub total: usize,
    pub results: Vec<MarketShareRow>,
    pub summary: MarketShareSummary,
}

pub fn market_share(
    drugs: &[Drug],
    dimension: Dimension,
    revenue: &HashMap<i64, f64>,
    usd_rate: f64,
) -> MarketShareReport {
    let grouping = aggregate(
        drugs,
        |d| dimension.key(d),
        |d| revenue.get(&d.id).copied().unwrap_or(0.0),
    );
    let total = grouping.total;

    let results: Vec<MarketShareRow> = to_market_share(grouping)
        .into_iter()
        .map(|share| MarketShareRow {
            id: share.name.clone(),
            total_amount_usd: format::convert_to_usd(share.amount, usd_rate),
            average: if share.count > 0 {
                share.amount / share.count as f64
            } else {
                0.0
            },
            name: share.name,
            count: share.count,
            share_by_quantity: share.share_percent,
            total_quantity: share.count,
            total_amount_uzs: share.amount,
            share_by_amount: share.amount_share_percent,
        })
        .collect();

    let summary = MarketShareSummary {
        total_items: total,
        unique_groups: results.len(),
        top_group: results.first().map(|r| r.name.clone()),
        top_group_share: results.first().map_or(0.0, |r| r.share_by_quantity),
    };

    MarketShareReport {
        dimension,
        total,
        results,
        summary,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Count,
    Amount,
}

impl SortBy {
    /// Anything but `amount` means `count`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("amount") => SortBy::Amount,
            _ => SortBy::Count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopSalesRow {
    pub rank: usize,
    pub name: String,
    pub count: usize,
    pub share: f64,
    /// SALE revenue of the group in UZS
    pub amount: f64,
    pub representative: Option<Drug>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopSalesReport {
    pub dimension: Dimension,
    pub limit: i64,
    pub sort_by: SortBy,
    pub total_items: usize,
    pub total_groups: usize,
    pub results: Vec<TopSalesRow>,
}

/// `limit <= 0` returns every group.
pub fn top_sales(
    drugs: &[Drug],
    dimension: Dimension,
    limit: i64,
    sort_by: SortBy,
    revenue: &HashMap<i64, f64>,
) -> TopSalesReport {
    let grouping = aggregate(
        drugs,
        |d| dimension.key(d),
        |d| revenue.get(&d.id).copied().unwrap_or(0.0),
    );
    let total_items = grouping.total;
    let total_groups = grouping.buckets.len();

    let mut shares = to_market_share(grouping);
    if sort_by == SortBy::Amount {
        sort_by_amount(&mut shares);
    }

    let n = usize::try_from(limit).unwrap_or(0);
    let results = top_n(shares, n)
        .into_iter()
        .map(|ranked| TopSalesRow {
            rank: ranked.rank,
            representative: drugs.get(ranked.item.representative).cloned(),
            name: ranked.item.name,
            count: ranked.item.count,
            share: ranked.item.share_percent,
            amount: ranked.item.amount,
        })
        .collect();

    TopSalesReport {
        dimension,
        limit,
        sort_by,
        total_items,
        total_groups,
        results,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationReport {
    pub dimension1: Dimension,
    pub dimension2: Dimension,
    #[serde(flatten)]
    pub table: CrossTab,
}

pub fn correlation(drugs: &[Drug], dim1: Dimension, dim2: Dimension) -> CorrelationReport {
    CorrelationReport {
        dimension1: dim1,
        dimension2: dim2,
        table: cross_tabulate(drugs, |d| dim1.key(d), |d| dim2.key(d)),
    }
}

/// Group counts only, for console output.
pub fn group_counts(drugs: &[Drug], dimension: Dimension) -> Vec<(String, usize)> {
    to_market_share(count_by_dimension(drugs, |d| dimension.key(d)))
        .into_iter()
        .map(|s| (s.name, s.count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dimension::drug;

    fn catalog() -> Vec<Drug> {
        let rows = [
            (1, "Paracetamol", "Nobel", "Uzbekistan", "N02BE01"),
            (2, "Ibuprofen", "Nobel", "Uzbekistan", "M01AE01"),
            (3, "Aspirin", "Bayer", "Germany", "N02BA01"),
            (4, "Amoxicillin", "Sandoz", "Austria", "J01CA04"),
        ];
        rows.into_iter()
            .map(|(id, name, manufacturer, country, atx)| {
                let mut d = drug(name);
                d.id = id;
                d.manufacturer = Some(manufacturer.to_string());
                d.country = Some(country.to_string());
                d.atx_code = Some(atx.to_string());
                d
            })
            .collect()
    }

    fn sale(drug_id: i64, amount: f64, created_at: i64) -> Transaction {
        Transaction {
            id: 0,
            kind: TransactionKind::Sale,
            drug_id,
            pharmacy_id: 1,
            supplier_id: None,
            distributor_id: None,
            quantity: 1,
            unit_price_uzs: amount,
            total_amount_uzs: amount,
            currency: "UZS".to_string(),
            batch_number: None,
            invoice_number: None,
            notes: None,
            created_at,
            drug_name: String::new(),
            pharmacy_name: String::new(),
            supplier_name: None,
        }
    }

    #[test]
    fn test_market_share_summary() {
        let report = market_share(&catalog(), Dimension::Manufacturer, &HashMap::new(), 12850.0);

        assert_eq!(report.total, 4);
        assert_eq!(report.summary.unique_groups, 3);
        assert_eq!(report.summary.top_group.as_deref(), Some("Nobel"));
        assert_eq!(report.summary.top_group_share, 50.0);
        assert_eq!(report.results[0].id, "Nobel");
        assert_eq!(report.results[0].total_quantity, 2);
        assert_eq!(report.results[0].share_by_amount, 0.0);
    }

    #[test]
    fn test_market_share_of_empty_catalog() {
        let report = market_share(&[], Dimension::Country, &HashMap::new(), 12850.0);
        assert_eq!(report.total, 0);
        assert!(report.results.is_empty());
        assert_eq!(report.summary.top_group, None);
        assert_eq!(report.summary.top_group_share, 0.0);
    }

    #[test]
    fn test_market_share_revenue_columns() {
        let revenue = HashMap::from([(1, 25_700.0), (3, 12_850.0)]);
        let report = market_share(&catalog(), Dimension::Manufacturer, &revenue, 12850.0);

        let nobel = &report.results[0];
        assert_eq!(nobel.total_amount_uzs, 25_700.0);
        assert_eq!(nobel.total_amount_usd, 2.0);
        assert_eq!(nobel.average, 12_850.0);
        assert!((nobel.share_by_amount - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_sales_by_count_and_amount() {
        let revenue = HashMap::from([(4, 90_000.0), (1, 10_000.0)]);

        let by_count = top_sales(&catalog(), Dimension::Manufacturer, 2, SortBy::Count, &revenue);
        assert_eq!(by_count.total_groups, 3);
        assert_eq!(by_count.results.len(), 2);
        assert_eq!(by_count.results[0].name, "Nobel");
        assert_eq!(
            by_count.results[0].representative.as_ref().map(|d| d.name.as_str()),
            Some("Paracetamol")
        );

        let by_amount = top_sales(&catalog(), Dimension::Manufacturer, 2, SortBy::Amount, &revenue);
        assert_eq!(by_amount.results[0].name, "Sandoz");
        assert_eq!(by_amount.results[0].rank, 1);
        assert_eq!(by_amount.results[1].name, "Nobel");
    }

    #[test]
    fn test_top_sales_non_positive_limit_returns_all() {
        let report = top_sales(&catalog(), Dimension::Drug, -5, SortBy::Count, &HashMap::new());
        assert_eq!(report.results.len(), 4);
        assert_eq!(report.limit, -5);
        // Equal counts: alphabetical
        assert_eq!(report.results[0].name, "Amoxicillin");
    }

    #[test]
    fn test_correlation_report_shape() {
        let report = correlation(&catalog(), Dimension::AtxCode, Dimension::Country);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["dimension1"], "atxCode");
        assert_eq!(json["dimension2"], "country");
        assert_eq!(json["totalRecords"], 4);
        assert_eq!(json["dim1Values"], serde_json::json!(["J", "M", "N"]));
        assert_eq!(json["matrix"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_revenue_respects_kind_and_range() {
        // 2024-03-05 and 2024-03-07, both 12:00 UTC
        let day1 = 1_709_640_000;
        let day3 = day1 + 2 * 86_400;

        let mut purchase = sale(1, 500.0, day1);
        purchase.kind = TransactionKind::Purchase;
        let txs = vec![sale(1, 100.0, day1), sale(1, 50.0, day3), purchase];

        let all = revenue_by_drug(&txs, DateRange::default());
        assert_eq!(all.get(&1), Some(&150.0));

        let range = DateRange::parse(Some("2024-03-05"), Some("2024-03-05"));
        assert_eq!(revenue_by_drug(&txs, range).get(&1), Some(&100.0));

        let range = DateRange::parse(Some("2024-03-06"), None);
        assert_eq!(range.start_timestamp(), Some(1_709_683_200));
        assert_eq!(revenue_by_drug(&txs, range).get(&1), Some(&50.0));
    }

    #[test]
    fn test_sort_by_parse() {
        assert_eq!(SortBy::parse(Some("amount")), SortBy::Amount);
        assert_eq!(SortBy::parse(Some("AMOUNT")), SortBy::Amount);
        assert_eq!(SortBy::parse(Some("price")), SortBy::Count);
        assert_eq!(SortBy::parse(None), SortBy::Count);
    }
}
