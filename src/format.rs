//! Request-scoped display settings and the formatting helpers that take them.
//!
//! Nothing in here reads global state: every function gets the
//! [`DisplaySettings`] (or the raw values) it needs from the caller.

use chrono::{DateTime, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::DisplayConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ru,
    Uz,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::Uz => "uz",
            Language::En => "en",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ru" => Ok(Language::Ru),
            "uz" => Ok(Language::Uz),
            "en" => Ok(Language::En),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Uzs,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Uzs => "UZS",
            Currency::Usd => "USD",
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "UZS" => Ok(Currency::Uzs),
            "USD" => Ok(Currency::Usd),
            other => Err(format!("unsupported currency '{other}'")),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language, currency and exchange rate in effect for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    pub language: Language,
    pub currency: Currency,
    /// UZS per 1 USD
    pub usd_rate: f64,
}

impl From<&DisplayConfig> for DisplaySettings {
    fn from(config: &DisplayConfig) -> Self {
        Self {
            language: config.language,
            currency: config.currency,
            usd_rate: config.usd_rate,
        }
    }
}

impl DisplaySettings {
    /// Apply per-request overrides (e.g. `?lang=en&currency=USD`).
    /// Unparseable values are ignored.
    pub fn with_overrides(mut self, language: Option<&str>, currency: Option<&str>) -> Self {
        if let Some(language) = language.and_then(|l| l.parse().ok()) {
            self.language = language;
        }
        if let Some(currency) = currency.and_then(|c| c.parse().ok()) {
            self.currency = currency;
        }
        self
    }
}

pub fn convert_to_usd(amount_uzs: f64, usd_rate: f64) -> f64 {
    if usd_rate <= 0.0 {
        return 0.0;
    }
    amount_uzs / usd_rate
}

pub fn convert_to_uzs(amount_usd: f64, usd_rate: f64) -> f64 {
    if usd_rate <= 0.0 {
        return 0.0;
    }
    amount_usd * usd_rate
}

/// Render an amount held in UZS in the request's currency.
///
/// UZS: `1 234 567 UZS` (no fraction digits). USD: `$1,234.57`.
pub fn format_money(amount_uzs: f64, settings: &DisplaySettings) -> String {
    match settings.currency {
        Currency::Uzs => {
            let rounded = amount_uzs.round() as i64;
            let sign = if rounded < 0 { "-" } else { "" };
            format!(
                "{sign}{} UZS",
                group_digits(&rounded.unsigned_abs().to_string(), ' ')
            )
        }
        Currency::Usd => {
            let usd = convert_to_usd(amount_uzs, settings.usd_rate);
            let cents = (usd * 100.0).round() as i64;
            let sign = if cents < 0 { "-" } else { "" };
            let cents = cents.unsigned_abs();
            format!(
                "{sign}${}.{:02}",
                group_digits(&(cents / 100).to_string(), ','),
                cents % 100
            )
        }
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

/// `dd.mm.yyyy` for a Unix timestamp (UTC).
pub fn format_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%d.%m.%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// `dd.mm.yyyy hh:mm` for a Unix timestamp (UTC).
pub fn format_date_time(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn weekday_label(weekday: Weekday, language: Language) -> &'static str {
    const EN: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
    const RU: [&str; 7] = ["Вс", "Пн", "Вт", "Ср", "Чт", "Пт", "Сб"];
    const UZ: [&str; 7] = ["Ya", "Du", "Se", "Ch", "Pa", "Ju", "Sh"];

    let idx = weekday.num_days_from_sunday() as usize;
    match language {
        Language::En => EN[idx],
        Language::Ru => RU[idx],
        Language::Uz => UZ[idx],
    }
}

/// Parse an ISO `YYYY-MM-DD` date; `None` for missing or malformed input.
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?.trim();
    // Accept full timestamps too, only the date part matters.
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Critical,
    Low,
    Ok,
}

pub fn stock_status(quantity: i64, min_stock: i64) -> StockStatus {
    if quantity <= 0 {
        StockStatus::Critical
    } else if quantity <= min_stock {
        StockStatus::Low
    } else {
        StockStatus::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryStatus {
    Expired,
    Warning,
    Ok,
}

/// Expired before `today`, warning within three months, ok otherwise or when
/// no usable date is recorded.
pub fn expiry_status(expiry_date: Option<&str>, today: NaiveDate) -> ExpiryStatus {
    let Some(expiry) = parse_date(expiry_date) else {
        return ExpiryStatus::Ok;
    };

    if expiry < today {
        return ExpiryStatus::Expired;
    }

    match today.checked_add_months(Months::new(3)) {
        Some(limit) if expiry < limit => ExpiryStatus::Warning,
        _ => ExpiryStatus::Ok,
    }
}
