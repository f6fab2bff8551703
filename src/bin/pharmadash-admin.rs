use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use pharmadash::analytics::reports::{self, DateRange};
use pharmadash::analytics::{Dimension, SortBy};
use pharmadash::config::{Config, DatabaseBackend};
use pharmadash::models::TransactionKind;
use pharmadash::seed;
use pharmadash::storage::{PostgresStorage, SqliteStorage, Storage};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pharmadash-admin")]
#[command(about = "Pharmadash admin management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert sample catalog, stock and sales history
    Seed {
        /// Append even if the catalog already has drugs
        #[arg(long)]
        force: bool,
    },
    /// Show record counts
    Stats,
    /// Print catalog share per group
    MarketShare {
        /// manufacturer, country, atxCode, form, ...
        #[arg(long, default_value = "manufacturer")]
        dimension: String,
    },
    /// Print the top groups by drug count, or by sales revenue
    TopSales {
        #[arg(long, default_value = "drug")]
        dimension: String,
        /// 0 prints every group
        #[arg(long, default_value_t = 10)]
        limit: i64,
        /// count or amount
        #[arg(long, default_value = "count")]
        sort_by: String,
    },
    /// Print the joint distribution of two dimensions
    Correlation {
        #[arg(long, default_value = "manufacturer")]
        dim1: String,
        #[arg(long, default_value = "country")]
        dim2: String,
    },
}

async fn sales_revenue(storage: &dyn Storage) -> Result<HashMap<i64, f64>> {
    let sales = storage
        .transactions_since(None, Some(TransactionKind::Sale))
        .await?;
    Ok(reports::revenue_by_drug(&sales, DateRange::default()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => Arc::new(
            SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
        DatabaseBackend::Postgres => Arc::new(
            PostgresStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
    };

    // Ensure database is initialized
    storage.init().await?;

    match cli.command {
        Commands::Seed { force } => {
            let counts = storage.counts().await?;
            if counts.drugs > 0 && !force {
                bail!(
                    "database already holds {} drugs; pass --force to append sample data",
                    counts.drugs
                );
            }

            let summary = seed::run(storage.as_ref(), Utc::now()).await?;
            println!("✓ Seeded sample data");
            println!("  {:<20} {}", "ATX categories", summary.atx_categories);
            println!("  {:<20} {}", "Suppliers", summary.suppliers);
            println!("  {:<20} {}", "Pharmacies", summary.pharmacies);
            println!("  {:<20} {}", "Drugs", summary.drugs);
            println!("  {:<20} {}", "Inventory rows", summary.inventory);
            println!("  {:<20} {}", "Transactions", summary.transactions);
            if summary.skipped_sales > 0 {
                println!(
                    "⚠ Skipped {} sales for drugs without stock",
                    summary.skipped_sales
                );
            }
        }
        Commands::Stats => {
            let counts = storage.counts().await?;
            println!("{:<20} {:>10} {:>10}", "Entity", "Total", "Active");
            println!("{}", "-".repeat(42));
            println!("{:<20} {:>10}", "Drugs", counts.drugs);
            println!(
                "{:<20} {:>10} {:>10}",
                "Pharmacies", counts.pharmacies, counts.active_pharmacies
            );
            println!(
                "{:<20} {:>10} {:>10}",
                "Suppliers", counts.suppliers, counts.active_suppliers
            );
            println!("{:<20} {:>10}", "Distributors", counts.distributors);
            println!("{:<20} {:>10}", "Inventory rows", counts.inventory);
            println!("{:<20} {:>10}", "Transactions", counts.transactions);

            let drugs = storage.all_drugs().await?;
            if !drugs.is_empty() {
                println!();
                println!("Drugs per country:");
                for (country, count) in reports::group_counts(&drugs, Dimension::Country) {
                    println!("  {:<30} {:>6}", country, count);
                }
            }
        }
        Commands::MarketShare { dimension } => {
            let dimension = Dimension::parse_or(Some(&dimension), Dimension::Manufacturer);
            let drugs = storage.all_drugs().await?;
            let revenue = sales_revenue(storage.as_ref()).await?;
            let report =
                reports::market_share(&drugs, dimension, &revenue, config.display.usd_rate);

            println!("Market share by {} ({} drugs)", report.dimension, report.total);
            println!(
                "{:<40} {:>6} {:>8} {:>18} {:>8}",
                "Group", "Drugs", "Share %", "Revenue UZS", "Rev %"
            );
            println!("{}", "-".repeat(84));
            for row in &report.results {
                println!(
                    "{:<40} {:>6} {:>8.2} {:>18.0} {:>8.2}",
                    row.name,
                    row.count,
                    row.share_by_quantity,
                    row.total_amount_uzs,
                    row.share_by_amount
                );
            }
        }
        Commands::TopSales {
            dimension,
            limit,
            sort_by,
        } => {
            let dimension = Dimension::parse_or(Some(&dimension), Dimension::Drug);
            let sort_by = SortBy::parse(Some(&sort_by));
            let drugs = storage.all_drugs().await?;
            let revenue = match sort_by {
                SortBy::Amount => sales_revenue(storage.as_ref()).await?,
                SortBy::Count => HashMap::new(),
            };
            let report = reports::top_sales(&drugs, dimension, limit, sort_by, &revenue);

            println!(
                "Top {} by {} ({} groups)",
                report.dimension, sort_by_label(report.sort_by), report.total_groups
            );
            println!(
                "{:<5} {:<40} {:>6} {:>8} {:>18}",
                "#", "Group", "Drugs", "Share %", "Revenue UZS"
            );
            println!("{}", "-".repeat(81));
            for row in &report.results {
                println!(
                    "{:<5} {:<40} {:>6} {:>8.2} {:>18.0}",
                    row.rank, row.name, row.count, row.share, row.amount
                );
            }
        }
        Commands::Correlation { dim1, dim2 } => {
            let dim1 = Dimension::parse_or(Some(&dim1), Dimension::Manufacturer);
            let dim2 = Dimension::parse_or(Some(&dim2), Dimension::Country);
            let drugs = storage.all_drugs().await?;
            let report = reports::correlation(&drugs, dim1, dim2);

            if report.table.matrix.is_empty() {
                println!("No drugs found.");
            } else {
                println!(
                    "{} × {} ({} drugs)",
                    report.dimension1, report.dimension2, report.table.total_records
                );
                println!("{:<35} {:<35} {:>6}", dim1.as_str(), dim2.as_str(), "Drugs");
                println!("{}", "-".repeat(78));
                for cell in &report.table.matrix {
                    println!("{:<35} {:<35} {:>6}", cell.dim1, cell.dim2, cell.count);
                }
            }
        }
    }

    Ok(())
}

fn sort_by_label(sort_by: SortBy) -> &'static str {
    match sort_by {
        SortBy::Count => "drug count",
        SortBy::Amount => "revenue",
    }
}
