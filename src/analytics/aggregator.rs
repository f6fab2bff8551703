//! Single-pass group-by over an in-memory record set.
//!
//! All functions here are pure and total: empty input yields empty output,
//! never an error. Share percentages are always computed against the full
//! input, before any truncation.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Accumulator for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBucket {
    pub count: usize,
    /// Sum of the optional per-record weight (e.g. sales revenue)
    pub amount: f64,
    /// Index of the first record that fell into this group
    pub representative: usize,
}

/// Unordered result of [`count_by_dimension`] / [`aggregate`].
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    pub buckets: HashMap<String, GroupBucket>,
    /// Number of records processed
    pub total: usize,
}

impl Grouping {
    pub fn count(&self, key: &str) -> usize {
        self.buckets.get(key).map_or(0, |b| b.count)
    }

    pub fn total_amount(&self) -> f64 {
        self.buckets.values().map(|b| b.amount).sum()
    }
}

/// One group of an ordered market-share result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupShare {
    pub name: String,
    pub count: usize,
    /// `count / total * 100`, 0 for empty input
    pub share_percent: f64,
    pub amount: f64,
    /// `amount / total amount * 100`, 0 when nothing was weighted
    pub amount_share_percent: f64,
    #[serde(skip)]
    pub representative: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked<T> {
    pub rank: usize,
    #[serde(flatten)]
    pub item: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossTabCell {
    pub dim1: String,
    pub dim2: String,
    pub count: usize,
}

/// Joint distribution of two dimensions. Only non-zero cells are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTab {
    pub dim1_values: Vec<String>,
    pub dim2_values: Vec<String>,
    pub matrix: Vec<CrossTabCell>,
    pub dim1_summary: Vec<NameCount>,
    pub dim2_summary: Vec<NameCount>,
    pub total_records: usize,
}

pub fn count_by_dimension<R>(records: &[R], key: impl Fn(&R) -> String) -> Grouping {
    aggregate(records, key, |_| 0.0)
}

/// Like [`count_by_dimension`], additionally summing `amount` per group.
pub fn aggregate<R>(
    records: &[R],
    key: impl Fn(&R) -> String,
    amount: impl Fn(&R) -> f64,
) -> Grouping {
    let mut buckets: HashMap<String, GroupBucket> = HashMap::new();

    for (idx, record) in records.iter().enumerate() {
        let bucket = buckets.entry(key(record)).or_insert(GroupBucket {
            count: 0,
            amount: 0.0,
            representative: idx,
        });
        bucket.count += 1;
        bucket.amount += amount(record);
    }

    Grouping {
        buckets,
        total: records.len(),
    }
}

/// Count desc, then name asc.
fn by_count(a_count: usize, a_name: &str, b_count: usize, b_name: &str) -> Ordering {
    b_count.cmp(&a_count).then_with(|| a_name.cmp(b_name))
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Turn a grouping into shares of the total, ordered by count desc then name.
pub fn to_market_share(grouping: Grouping) -> Vec<GroupShare> {
    let total = grouping.total as f64;
    let total_amount = grouping.total_amount();

    let mut shares: Vec<GroupShare> = grouping
        .buckets
        .into_iter()
        .map(|(name, bucket)| GroupShare {
            share_percent: percent(bucket.count as f64, total),
            amount_share_percent: percent(bucket.amount, total_amount),
            name,
            count: bucket.count,
            amount: bucket.amount,
            representative: bucket.representative,
        })
        .collect();

    shares.sort_by(|a, b| by_count(a.count, &a.name, b.count, &b.name));
    shares
}

/// Reorder by weighted amount desc, then count desc, then name asc.
pub fn sort_by_amount(shares: &mut [GroupShare]) {
    shares.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(Ordering::Equal)
            .then_with(|| by_count(a.count, &a.name, b.count, &b.name))
    });
}

/// Keep the first `n` items and number them 1..=n. `n == 0` keeps everything.
pub fn top_n<T>(ordered: Vec<T>, n: usize) -> Vec<Ranked<T>> {
    let keep = if n == 0 { ordered.len() } else { n };

    ordered
        .into_iter()
        .take(keep)
        .enumerate()
        .map(|(idx, item)| Ranked {
            rank: idx + 1,
            item,
        })
        .collect()
}

fn summary(totals: HashMap<String, usize>) -> Vec<NameCount> {
    let mut summary: Vec<NameCount> = totals
        .into_iter()
        .map(|(name, count)| NameCount { name, count })
        .collect();
    summary.sort_by(|a, b| by_count(a.count, &a.name, b.count, &b.name));
    summary
}

pub fn cross_tabulate<R>(
    records: &[R],
    key1: impl Fn(&R) -> String,
    key2: impl Fn(&R) -> String,
) -> CrossTab {
    // Tuple keys: no delimiter that could collide with key content.
    let mut cells: BTreeMap<(String, String), usize> = BTreeMap::new();
    for record in records {
        *cells.entry((key1(record), key2(record))).or_insert(0) += 1;
    }

    let mut dim1_totals: HashMap<String, usize> = HashMap::new();
    let mut dim2_totals: HashMap<String, usize> = HashMap::new();
    let mut matrix = Vec::with_capacity(cells.len());

    for ((dim1, dim2), count) in cells {
        *dim1_totals.entry(dim1.clone()).or_insert(0) += count;
        *dim2_totals.entry(dim2.clone()).or_insert(0) += count;
        matrix.push(CrossTabCell { dim1, dim2, count });
    }

    let mut dim1_values: Vec<String> = dim1_totals.keys().cloned().collect();
    let mut dim2_values: Vec<String> = dim2_totals.keys().cloned().collect();
    dim1_values.sort();
    dim2_values.sort();

    CrossTab {
        dim1_values,
        dim2_values,
        matrix,
        dim1_summary: summary(dim1_totals),
        dim2_summary: summary(dim2_totals),
        total_records: records.len(),
    }
}
