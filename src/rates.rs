//! USD exchange-rate book.
//!
//! Rates are quoted as: 1 unit of foreign currency = `rate` US dollars
//! (so HKD ≈ 0.128 means one Hong Kong dollar buys 12.8 US cents). The book
//! refreshes itself at most every six hours from two public endpoints; when
//! both are unreachable it keeps serving the last good table, and before the
//! first successful refresh it serves a built-in snapshot. The read path never
//! performs I/O and never fails.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use reqwest::Client;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long a fetched rate table stays fresh.
pub const RATE_CACHE_TTL: Duration = Duration::from_secs(6 * 3600);

// Endpoint and the JSON key its USD-base table lives under.
const RATE_ENDPOINTS: [(&str, &str); 2] = [
    ("https://open.er-api.com/v6/latest/USD", "rates"),
    (
        "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1/currencies/usd.json",
        "usd",
    ),
];

lazy_static! {
    // Approximate snapshot used until the first successful refresh.
    static ref FALLBACK_RATES: HashMap<&'static str, f64> = {
        let mut m = HashMap::new();
        m.insert("USD", 1.0);
        m.insert("EUR", 1.08);
        m.insert("GBP", 1.27);
        m.insert("HKD", 0.128);
        m.insert("CNY", 0.14);
        m.insert("AUD", 0.65);
        m.insert("NZD", 0.60);
        m.insert("CAD", 0.74);
        m.insert("JPY", 0.0067);
        m.insert("CHF", 1.12);
        m.insert("SGD", 0.75);
        m.insert("KRW", 0.00072);
        m.insert("SEK", 0.095);
        m.insert("DKK", 0.145);
        m.insert("NOK", 0.093);
        m
    };
}

struct RateCache {
    rates: HashMap<String, f64>,
    fetched_at: Instant,
}

/// Shared rate table. Owned by `main`, passed to collaborators as `Arc`.
pub struct RateBook {
    client: Client,
    cache: RwLock<Option<RateCache>>,
}

impl RateBook {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            cache: RwLock::new(None),
        }
    }

    /// Refresh the table if it is older than [`RATE_CACHE_TTL`]. Failures are
    /// logged and swallowed; callers keep reading whatever is cached.
    pub async fn ensure_fresh(&self) {
        if self.is_fresh() {
            return;
        }

        match self.fetch_remote().await {
            Some(rates) => {
                info!(
                    "💱 Rates updated: EUR={:.3} GBP={:.3} HKD={:.4} CNY={:.3} AUD={:.3}",
                    rates.get("EUR").copied().unwrap_or(0.0),
                    rates.get("GBP").copied().unwrap_or(0.0),
                    rates.get("HKD").copied().unwrap_or(0.0),
                    rates.get("CNY").copied().unwrap_or(0.0),
                    rates.get("AUD").copied().unwrap_or(0.0),
                );
                *self.cache.write() = Some(RateCache {
                    rates,
                    fetched_at: Instant::now(),
                });
            }
            None => {
                if self.cache.read().is_some() {
                    warn!("💱 Rate refresh failed, serving stale cache");
                } else {
                    warn!("💱 Rate refresh failed with no cache yet, using built-in table");
                }
            }
        }
    }

    /// USD value of one unit of `currency`. Unknown codes convert 1:1.
    pub fn rate(&self, currency: &str) -> f64 {
        let code = currency.trim().to_uppercase();
        if let Some(cache) = self.cache.read().as_ref() {
            if let Some(r) = cache.rates.get(&code) {
                return *r;
            }
        }
        FALLBACK_RATES.get(code.as_str()).copied().unwrap_or(1.0)
    }

    /// Restate `amount` of `currency` in USD.
    pub fn to_usd(&self, amount: f64, currency: &str) -> f64 {
        amount * self.rate(currency)
    }

    fn is_fresh(&self) -> bool {
        self.cache
            .read()
            .as_ref()
            .map(|c| c.fetched_at.elapsed() < RATE_CACHE_TTL)
            .unwrap_or(false)
    }

    async fn fetch_remote(&self) -> Option<HashMap<String, f64>> {
        for (url, key) in RATE_ENDPOINTS {
            match self.fetch_table(url, key).await {
                Ok(rates) if !rates.is_empty() => {
                    debug!("💱 Loaded {} rates from {}", rates.len(), url);
                    return Some(rates);
                }
                Ok(_) => warn!("💱 Rate endpoint {} returned an empty table", url),
                Err(e) => warn!("💱 Rate endpoint {} failed: {}", url, e),
            }
        }
        None
    }

    // Both endpoints publish USD-base tables ("1 USD = x foreign"); entries
    // are inverted into the foreign → USD direction this book serves.
    async fn fetch_table(&self, url: &str, key: &str) -> Result<HashMap<String, f64>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("Rate request failed")?;

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("Rate endpoint returned {}", resp.status()));
        }

        let body: serde_json::Value = resp.json().await.context("Rate response was not JSON")?;
        let table = body
            .get(key)
            .and_then(|v| v.as_object())
            .ok_or_else(|| anyhow::anyhow!("Rate response missing '{}' table", key))?;

        let mut rates = HashMap::new();
        for (code, value) in table {
            if let Some(v) = value.as_f64() {
                if v > 0.0 {
                    rates.insert(code.to_uppercase(), 1.0 / v);
                }
            }
        }
        rates.insert("USD".to_string(), 1.0);
        Ok(rates)
    }
}

impl Default for RateBook {
    fn default() -> Self {
        Self::new()
    }
}
