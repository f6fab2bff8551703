use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::{DisplayConfig, InventoryConfig};
use crate::format::{Currency, DisplaySettings, Language};
use crate::models::InventoryInput;

pub const KEY_ORGANIZATION_NAME: &str = "organization_name";
pub const KEY_LANGUAGE: &str = "language";
pub const KEY_CURRENCY: &str = "currency";
pub const KEY_USD_RATE: &str = "usd_rate";
pub const KEY_LOW_STOCK_THRESHOLD: &str = "low_stock_threshold";
pub const KEY_EXPIRY_ALERT_DAYS: &str = "expiry_alert_days";

/// Typed view over the key/value `settings` table.
///
/// Every field is optional: an absent row means "use the configured default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub organization_name: Option<String>,
    pub language: Option<Language>,
    pub currency: Option<Currency>,
    pub usd_rate: Option<f64>,
    pub low_stock_threshold: Option<i64>,
    pub expiry_alert_days: Option<i64>,
}

impl AppSettings {
    /// Build from stored rows. Unparseable values are treated as absent.
    pub fn from_pairs(pairs: &HashMap<String, String>) -> Self {
        let get = |key: &str| pairs.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        Self {
            organization_name: get(KEY_ORGANIZATION_NAME).map(str::to_string),
            language: get(KEY_LANGUAGE).and_then(|v| v.parse().ok()),
            currency: get(KEY_CURRENCY).and_then(|v| v.parse().ok()),
            usd_rate: get(KEY_USD_RATE)
                .and_then(|v| v.parse().ok())
                .filter(|r: &f64| *r > 0.0),
            low_stock_threshold: get(KEY_LOW_STOCK_THRESHOLD).and_then(|v| v.parse().ok()),
            expiry_alert_days: get(KEY_EXPIRY_ALERT_DAYS).and_then(|v| v.parse().ok()),
        }
    }

    /// Rows to write for the fields that are set.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(name) = &self.organization_name {
            pairs.push((KEY_ORGANIZATION_NAME, name.clone()));
        }
        if let Some(language) = self.language {
            pairs.push((KEY_LANGUAGE, language.as_str().to_string()));
        }
        if let Some(currency) = self.currency {
            pairs.push((KEY_CURRENCY, currency.as_str().to_string()));
        }
        if let Some(rate) = self.usd_rate {
            pairs.push((KEY_USD_RATE, rate.to_string()));
        }
        if let Some(threshold) = self.low_stock_threshold {
            pairs.push((KEY_LOW_STOCK_THRESHOLD, threshold.to_string()));
        }
        if let Some(days) = self.expiry_alert_days {
            pairs.push((KEY_EXPIRY_ALERT_DAYS, days.to_string()));
        }
        pairs
    }

    pub fn display(&self, defaults: &DisplayConfig) -> DisplaySettings {
        DisplaySettings {
            language: self.language.unwrap_or(defaults.language),
            currency: self.currency.unwrap_or(defaults.currency),
            usd_rate: self.usd_rate.unwrap_or(defaults.usd_rate),
        }
    }

    pub fn expiry_alert_days(&self, defaults: &InventoryConfig) -> i64 {
        self.expiry_alert_days.unwrap_or(defaults.expiry_alert_days)
    }

    /// Minimum stock applied to new inventory rows that don't specify one.
    pub fn default_min_stock(&self) -> i64 {
        self.low_stock_threshold.unwrap_or(InventoryInput::DEFAULT_MIN_STOCK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> HashMap<String, String> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_pairs_parses_known_keys() {
        let settings = AppSettings::from_pairs(&pairs(&[
            ("organization_name", "PharmaCentral"),
            ("language", "uz"),
            ("currency", "USD"),
            ("usd_rate", "12900.5"),
            ("low_stock_threshold", "20"),
            ("expiry_alert_days", "60"),
            ("unrelated", "x"),
        ]));

        assert_eq!(settings.organization_name.as_deref(), Some("PharmaCentral"));
        assert_eq!(settings.language, Some(Language::Uz));
        assert_eq!(settings.currency, Some(Currency::Usd));
        assert_eq!(settings.usd_rate, Some(12900.5));
        assert_eq!(settings.default_min_stock(), 20);
        assert_eq!(settings.expiry_alert_days, Some(60));
    }

    #[test]
    fn test_garbage_values_fall_back_to_defaults() {
        let settings = AppSettings::from_pairs(&pairs(&[
            ("language", "klingon"),
            ("usd_rate", "-5"),
            ("expiry_alert_days", "soon"),
        ]));
        let display = settings.display(&DisplayConfig::default());

        assert_eq!(display.language, Language::Ru);
        assert_eq!(display.usd_rate, DisplayConfig::DEFAULT_USD_RATE);
        assert_eq!(settings.expiry_alert_days(&InventoryConfig::default()), 90);
        assert_eq!(settings.default_min_stock(), 10);
    }

    #[test]
    fn test_pairs_round_trip_only_set_fields() {
        let settings = AppSettings {
            currency: Some(Currency::Usd),
            usd_rate: Some(13000.0),
            ..Default::default()
        };
        let written: HashMap<String, String> = settings
            .to_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        assert_eq!(written.len(), 2);
        assert_eq!(AppSettings::from_pairs(&written), settings);
    }
}
