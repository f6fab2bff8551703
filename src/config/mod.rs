use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::format::{Currency, Language};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub frontend: FrontendConfig,
    pub display: DisplayConfig,
    pub inventory: InventoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Directory with a prebuilt dashboard UI. Served for every non-API path
    /// when set.
    pub static_dir: Option<String>,
}

/// Defaults used when neither the settings table nor the request says otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub language: Language,
    pub currency: Currency,
    pub usd_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    pub expiry_alert_days: i64,
}

impl DisplayConfig {
    pub const DEFAULT_USD_RATE: f64 = 12850.0;
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            language: Language::Ru,
            currency: Currency::Uzs,
            usd_rate: Self::DEFAULT_USD_RATE,
        }
    }
}

impl InventoryConfig {
    pub const DEFAULT_EXPIRY_ALERT_DAYS: i64 = 90;
    /// Upper bound for the alert window, one century
    pub const MAX_EXPIRY_ALERT_DAYS: i64 = 36_500;

    pub fn is_valid_alert_window(days: i64) -> bool {
        (0..=Self::MAX_EXPIRY_ALERT_DAYS).contains(&days)
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            expiry_alert_days: Self::DEFAULT_EXPIRY_ALERT_DAYS,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./pharmadash.db?mode=rwc".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let language = match std::env::var("DEFAULT_LANGUAGE") {
            Ok(value) => value.parse::<Language>().unwrap_or_else(|_| {
                tracing::warn!(
                    "Unknown DEFAULT_LANGUAGE '{value}', falling back to 'ru'. Supported values: ru, uz, en"
                );
                Language::Ru
            }),
            Err(_) => Language::Ru,
        };

        let currency = match std::env::var("DEFAULT_CURRENCY") {
            Ok(value) => value.parse::<Currency>().unwrap_or_else(|_| {
                tracing::warn!(
                    "Unknown DEFAULT_CURRENCY '{value}', falling back to 'UZS'. Supported values: UZS, USD"
                );
                Currency::Uzs
            }),
            Err(_) => Currency::Uzs,
        };

        let usd_rate = match std::env::var("USD_RATE") {
            Ok(value) => value
                .parse::<f64>()
                .context("USD_RATE must be a number (UZS per 1 USD)")?,
            Err(_) => DisplayConfig::DEFAULT_USD_RATE,
        };

        let expiry_alert_days = match std::env::var("EXPIRY_ALERT_DAYS") {
            Ok(value) => value
                .parse::<i64>()
                .context("EXPIRY_ALERT_DAYS must be an integer number of days")?,
            Err(_) => InventoryConfig::DEFAULT_EXPIRY_ALERT_DAYS,
        };
        if !InventoryConfig::is_valid_alert_window(expiry_alert_days) {
            anyhow::bail!(
                "EXPIRY_ALERT_DAYS must be between 0 and {}",
                InventoryConfig::MAX_EXPIRY_ALERT_DAYS
            );
        }

        let frontend_static_dir = std::env::var("FRONTEND_STATIC_DIR").ok();

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            frontend: FrontendConfig {
                static_dir: frontend_static_dir,
            },
            display: DisplayConfig {
                language,
                currency,
                usd_rate,
            },
            inventory: InventoryConfig { expiry_alert_days },
        })
    }
}
