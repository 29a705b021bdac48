//! Core data models shared across the scanner, storage and API layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_PROFIT_THRESHOLD;

/// Source tag stamped on every opportunity and price-history row.
pub const DATA_SOURCE: &str = "wine-searcher";

/// Lifecycle of one orchestrated scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Idle,
    Running,
    Completed,
    CompletedWithErrors,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Idle => "idle",
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::CompletedWithErrors => "completed_with_errors",
        }
    }
}

/// A single merchant offer as parsed off the marketplace, in its native
/// currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub merchant: String,
    pub price: f64,
    pub currency: String,
    pub country: String,
    pub url: String,
    pub captured_at: DateTime<Utc>,
}

/// A quote with its price restated in USD so offers from different markets
/// compare directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedQuote {
    #[serde(flatten)]
    pub quote: Quote,
    pub price_usd: f64,
}

/// Result of one full market lookup for one wine: the cheapest offer anywhere
/// plus the outlier-filtered Hong Kong reference price.
#[derive(Debug, Clone, Serialize)]
pub struct WineSnapshot {
    pub wine_name: String,
    pub global_lowest: Option<NormalizedQuote>,
    pub reference_price_usd: Option<f64>,
}

impl WineSnapshot {
    pub fn found(&self) -> bool {
        self.global_lowest.is_some()
    }
}

/// A qualifying buy-low/sell-high opportunity. At most one active row per
/// wine name exists in storage; re-discovery updates it in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Option<i64>,
    pub wine_name: String,
    pub vintage: Option<String>,
    pub region: String,
    pub category: String,
    pub buy_price: f64,
    pub buy_currency: String,
    pub buy_merchant: String,
    pub buy_country: String,
    pub buy_url: String,
    pub sell_price_hk: f64,
    pub total_cost: f64,
    pub shipping_cost: f64,
    pub profit_rate: f64,
    pub score: u8,
    pub data_source: String,
    pub status: String,
    pub created_at: Option<String>,
}

/// Append-only record of one scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanLog {
    pub id: Option<i64>,
    pub scan_type: String,
    pub wines_scanned: i64,
    pub wines_skipped: i64,
    pub opportunities_found: i64,
    pub errors: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: f64,
}

/// One historical buy-side price observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub id: Option<i64>,
    pub wine_name: String,
    pub vintage: Option<String>,
    pub price: f64,
    pub currency: String,
    pub source: Option<String>,
    pub merchant: Option<String>,
    pub country: Option<String>,
    pub recorded_at: Option<String>,
}

/// User-managed watch entry. Removal is a soft delete (`active = false`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEntry {
    pub id: i64,
    pub wine_name: String,
    pub region: Option<String>,
    pub target_price: Option<f64>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: Option<String>,
}

/// Live progress of the current (or most recent) scan. Written only by the
/// orchestrator; everyone else reads snapshot copies.
#[derive(Debug, Clone, Serialize)]
pub struct ScanProgress {
    pub status: ScanStatus,
    pub total: usize,
    pub scanned: usize,
    pub skipped: usize,
    pub found: usize,
    pub errors: usize,
    pub current_wine: String,
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self {
            status: ScanStatus::Idle,
            total: 0,
            scanned: 0,
            skipped: 0,
            found: 0,
            errors: 0,
            current_wine: String::new(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub port: u16,
    pub scan_interval_minutes: u64,
    pub profit_threshold: f64,
    pub scraper_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let db_path =
            std::env::var("DB_PATH").unwrap_or_else(|_| "./cellarbot.db".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let scan_interval_minutes = std::env::var("SCAN_INTERVAL_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let profit_threshold = std::env::var("PROFIT_THRESHOLD")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(DEFAULT_PROFIT_THRESHOLD);

        let scraper_api_key = std::env::var("SCRAPER_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        Ok(Self {
            db_path,
            port,
            scan_interval_minutes,
            profit_threshold,
            scraper_api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_status_serializes_snake_case() {
        let s = serde_json::to_string(&ScanStatus::CompletedWithErrors).expect("serialize");
        assert_eq!(s, "\"completed_with_errors\"");
        assert_eq!(ScanStatus::Running.as_str(), "running");
    }

    #[test]
    fn test_progress_starts_idle() {
        let p = ScanProgress::default();
        assert_eq!(p.status, ScanStatus::Idle);
        assert_eq!(p.scanned, 0);
        assert!(p.current_wine.is_empty());
    }

    #[test]
    fn test_normalized_quote_flattens() {
        let q = NormalizedQuote {
            quote: Quote {
                merchant: "Vinfolio".to_string(),
                price: 820.0,
                currency: "EUR".to_string(),
                country: "France".to_string(),
                url: "https://www.wine-searcher.com/find/petrus/1/a".to_string(),
                captured_at: Utc::now(),
            },
            price_usd: 885.6,
        };
        let v = serde_json::to_value(&q).expect("serialize");
        assert_eq!(v["merchant"], "Vinfolio");
        assert_eq!(v["price_usd"], 885.6);
    }

    #[test]
    fn test_snapshot_found() {
        let empty = WineSnapshot {
            wine_name: "Petrus".to_string(),
            global_lowest: None,
            reference_price_usd: None,
        };
        assert!(!empty.found());
    }
}
