//! Catalog analytics: group-by-dimension counting, market share, top-N
//! ranking, two-dimension cross-tabulation and the dashboard summary.
//!
//! Input records are fetched fresh for each request; nothing here holds state
//! between calls.

pub mod aggregator;
pub mod dashboard;
pub mod dimension;
pub mod reports;

pub use aggregator::{
    aggregate, count_by_dimension, cross_tabulate, to_market_share, top_n, CrossTab, GroupShare,
    Grouping, Ranked,
};
pub use dashboard::{Dashboard, DashboardInput};
pub use dimension::{Dimension, FieldValue, UNKNOWN};
pub use reports::{CorrelationReport, DateRange, MarketShareReport, SortBy, TopSalesReport};
