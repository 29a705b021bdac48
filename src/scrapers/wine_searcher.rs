//! Wine-Searcher marketplace client.
//!
//! Builds search URLs, fetches result pages through the engine waterfall,
//! restates offers in USD via the shared rate book, and derives the two
//! numbers the analyzer consumes: the cheapest offer worldwide and the
//! outlier-filtered Hong Kong reference price.

use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

use super::engines::{human_delay, SmartFetcher};
use super::parse::parse_offer_page;
use crate::models::{NormalizedQuote, Quote, WineSnapshot};
use crate::rates::RateBook;

pub const BASE_URL: &str = "https://www.wine-searcher.com";

/// Country filter token for the Hong Kong results page.
pub const HK_COUNTRY_FILTER: &str = "hong+kong";

pub struct WineSearcherClient {
    fetcher: SmartFetcher,
    rates: Arc<RateBook>,
}

impl WineSearcherClient {
    pub fn new(scraper_api_key: Option<String>, rates: Arc<RateBook>) -> Self {
        Self {
            fetcher: SmartFetcher::with_default_engines(scraper_api_key, BASE_URL),
            rates,
        }
    }

    /// Alternate engine lineup, mainly for tests.
    pub fn with_fetcher(fetcher: SmartFetcher, rates: Arc<RateBook>) -> Self {
        Self { fetcher, rates }
    }

    /// Search-results URL for a wine, optionally filtered to one market.
    pub fn search_url(wine_name: &str, country_filter: Option<&str>) -> String {
        let query = wine_name.trim().replace(' ', "+");
        let mut url = format!("{}/find/{}/1/a", BASE_URL, query);
        if let Some(filter) = country_filter {
            url.push_str("?Xcountry=");
            url.push_str(filter);
        }
        url
    }

    /// Canonical listing link, used whenever a scraped offer URL is missing
    /// or points at a merchant's own site.
    pub fn canonical_search_url(wine_name: &str) -> String {
        Self::search_url(wine_name, None)
    }

    /// All offers on the (optionally market-filtered) results page, in USD.
    pub async fn search_offers(
        &self,
        wine_name: &str,
        country_filter: Option<&str>,
    ) -> Vec<NormalizedQuote> {
        let url = Self::search_url(wine_name, country_filter);

        human_delay(2.0, 5.0).await;
        let Some(html) = self.fetcher.fetch(&url).await else {
            return Vec::new();
        };

        let mut offers = self.normalize(parse_offer_page(&html));
        if country_filter
            .map(|f| f.to_lowercase().contains("hong"))
            .unwrap_or(false)
        {
            self.apply_hk_currency_policy(&mut offers);
        }

        debug!(
            "🍇 {} offers for '{}' ({})",
            offers.len(),
            wine_name,
            country_filter.unwrap_or("global")
        );
        offers
    }

    /// Cheapest offer worldwide by USD price.
    pub async fn global_lowest(&self, wine_name: &str) -> Option<NormalizedQuote> {
        let offers = self.search_offers(wine_name, None).await;
        offers.into_iter().min_by(|a, b| {
            a.price_usd
                .partial_cmp(&b.price_usd)
                .unwrap_or(Ordering::Equal)
        })
    }

    /// Representative Hong Kong sell price: median-anchored outlier rejection,
    /// then the mean of what survives.
    pub async fn reference_price_usd(&self, wine_name: &str) -> Option<f64> {
        let offers = self.search_offers(wine_name, Some(HK_COUNTRY_FILTER)).await;
        let prices: Vec<f64> = offers
            .iter()
            .map(|o| o.price_usd)
            .filter(|p| *p > 0.0)
            .collect();

        let (avg, median, kept) = average_with_outlier_rejection(prices)?;
        info!(
            "🇭🇰 HK reference for '{}': ${:.2} USD ({} kept, median ${:.2})",
            wine_name, avg, kept, median
        );
        Some(avg)
    }

    /// One full market lookup: global lowest (with canonical-link repair),
    /// a human pause, then the HK reference. A wine with no global offer
    /// skips the HK fetch entirely.
    pub async fn snapshot(&self, wine_name: &str) -> WineSnapshot {
        self.rates.ensure_fresh().await;

        let Some(mut lowest) = self.global_lowest(wine_name).await else {
            return WineSnapshot {
                wine_name: wine_name.to_string(),
                global_lowest: None,
                reference_price_usd: None,
            };
        };

        if lowest.quote.url.is_empty() || !lowest.quote.url.contains("wine-searcher.com") {
            lowest.quote.url = Self::canonical_search_url(wine_name);
        }

        human_delay(3.0, 6.0).await;
        let reference = self.reference_price_usd(wine_name).await;

        WineSnapshot {
            wine_name: wine_name.to_string(),
            global_lowest: Some(lowest),
            reference_price_usd: reference,
        }
    }

    fn normalize(&self, quotes: Vec<Quote>) -> Vec<NormalizedQuote> {
        quotes
            .into_iter()
            .map(|q| {
                let price_usd = self.rates.to_usd(q.price, &q.currency);
                NormalizedQuote {
                    quote: q,
                    price_usd,
                }
            })
            .collect()
    }

    // The HK results page labels most prices with a bare "$" that means HKD.
    // Per-market heuristic: offers that came through as generic USD are
    // reinterpreted as HKD and re-converted.
    fn apply_hk_currency_policy(&self, offers: &mut [NormalizedQuote]) {
        for offer in offers.iter_mut() {
            if offer.quote.currency == "USD" {
                offer.quote.currency = "HKD".to_string();
                offer.price_usd = self.rates.to_usd(offer.quote.price, "HKD");
                debug!(
                    "🇭🇰 currency corrected: ${:.0} HKD -> ${:.2} USD",
                    offer.quote.price, offer.price_usd
                );
            }
        }
    }
}

/// Keep values strictly inside (0.2×median, 5×median), fall back to the
/// unfiltered set when nothing survives, and return (mean, median, kept).
fn average_with_outlier_rejection(mut prices: Vec<f64>) -> Option<(f64, f64, usize)> {
    if prices.is_empty() {
        return None;
    }
    prices.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let median = prices[prices.len() / 2];

    let filtered: Vec<f64> = prices
        .iter()
        .copied()
        .filter(|p| *p < median * 5.0 && *p > median * 0.2)
        .collect();
    let kept = if filtered.is_empty() { prices } else { filtered };

    let avg = kept.iter().sum::<f64>() / kept.len() as f64;
    Some((avg, median, kept.len()))
}
