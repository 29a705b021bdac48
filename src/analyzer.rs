//! Deal analysis engine.
//!
//! Pure decision logic: given one wine's market snapshot, decide whether the
//! global-lowest/HK-reference pair is a real arbitrage opportunity, and if so
//! price it out and score it. Anything implausible is dropped with a warning
//! rather than surfaced as an error, because scraped price data lies
//! routinely.

use tracing::{info, warn};

use crate::catalog::{self, CatalogItem};
use crate::models::{Opportunity, WineSnapshot, DATA_SOURCE};

// Plausibility gates. A single bottle outside these bands is either a data
// error or not a retail bottle at all.
const MIN_BUY_PRICE_USD: f64 = 10.0;
const MAX_BUY_PRICE_USD: f64 = 20_000.0;
const MIN_SELL_PRICE_USD: f64 = 10.0;
const MAX_SELL_PRICE_USD: f64 = 50_000.0;
const MAX_SPREAD_MULTIPLE: f64 = 10.0;
const MAX_PROFIT_RATE_PCT: f64 = 500.0;

// Score bands.
const TOP_TIER_KEYWORDS: &[&str] = &["First Growth", "Grand Cru"];
const MID_TIER_KEYWORDS: &[&str] = &["Super Second", "Right Bank", "Icon", "Prestige"];

/// Judge one market snapshot against one catalog entry.
///
/// # Arguments
/// * `snapshot` - global lowest offer + HK reference from the fetch layer
/// * `item` - the wine's catalog config (region drives shipping, category
///   drives scoring)
/// * `profit_threshold` - minimum qualifying profit rate in percent
///
/// # Returns
/// The priced and scored opportunity, or None when any gate fails.
pub fn analyze(
    snapshot: &WineSnapshot,
    item: &CatalogItem,
    profit_threshold: f64,
) -> Option<Opportunity> {
    let lowest = snapshot.global_lowest.as_ref()?;
    let buy_price = lowest.price_usd;
    let sell_price = snapshot.reference_price_usd?;

    if buy_price <= 0.0 || sell_price <= 0.0 {
        return None;
    }

    if !(MIN_BUY_PRICE_USD..=MAX_BUY_PRICE_USD).contains(&buy_price) {
        warn!(
            "⚠️ Implausible buy price for {}: ${:.2} USD, dropping",
            item.name, buy_price
        );
        return None;
    }
    if !(MIN_SELL_PRICE_USD..=MAX_SELL_PRICE_USD).contains(&sell_price) {
        warn!(
            "⚠️ Implausible HK price for {}: ${:.2} USD, dropping",
            item.name, sell_price
        );
        return None;
    }

    if sell_price > buy_price * MAX_SPREAD_MULTIPLE {
        warn!(
            "⚠️ Extreme spread for {}: buy ${:.0} vs sell ${:.0}, dropping",
            item.name, buy_price, sell_price
        );
        return None;
    }

    let profit_rate = catalog::profit_rate(buy_price, sell_price, &item.region);
    if profit_rate > MAX_PROFIT_RATE_PCT {
        warn!(
            "⚠️ Profit rate for {} is {:.1}%, treating as bad data",
            item.name, profit_rate
        );
        return None;
    }
    if profit_rate < profit_threshold {
        return None;
    }

    let total_cost = catalog::total_cost(buy_price, &item.region);
    let score = opportunity_score(profit_rate, buy_price, sell_price, &item.category);

    let opportunity = Opportunity {
        id: None,
        wine_name: item.name.clone(),
        vintage: None,
        region: item.region.clone(),
        category: item.category.clone(),
        buy_price: round2(buy_price),
        buy_currency: lowest.quote.currency.clone(),
        buy_merchant: lowest.quote.merchant.clone(),
        buy_country: lowest.quote.country.clone(),
        buy_url: lowest.quote.url.clone(),
        sell_price_hk: round2(sell_price),
        total_cost: round2(total_cost),
        shipping_cost: catalog::shipping_cost(&item.region, true),
        profit_rate: round1(profit_rate),
        score,
        data_source: DATA_SOURCE.to_string(),
        status: "active".to_string(),
        created_at: None,
    };

    info!(
        "🍷 Deal found: {} | buy ${:.0} USD | sell ${:.0} USD | profit {:.1}% | score {}/10",
        item.name, buy_price, sell_price, profit_rate, score
    );

    Some(opportunity)
}

/// Additive 0-10 score: profit band, category tier, sensible price bracket,
/// absolute spread bonus.
fn opportunity_score(profit_rate: f64, buy_price: f64, sell_price: f64, category: &str) -> u8 {
    let mut score: u32 = 0;

    // Profit band (up to 4)
    if profit_rate >= 50.0 {
        score += 4;
    } else if profit_rate >= 30.0 {
        score += 3;
    } else if profit_rate >= 20.0 {
        score += 2;
    } else if profit_rate >= 15.0 {
        score += 1;
    }

    // Category tier (up to 3)
    if TOP_TIER_KEYWORDS.iter().any(|kw| category.contains(kw)) {
        score += 3;
    } else if MID_TIER_KEYWORDS.iter().any(|kw| category.contains(kw)) {
        score += 2;
    } else {
        score += 1;
    }

    // Price bracket (up to 2). The mid range is where bottles actually
    // hold value; very cheap bottles don't, very dear ones carry risk.
    if (50.0..=5000.0).contains(&buy_price) {
        score += 2;
    } else if buy_price > 5000.0 {
        score += 1;
    }

    // Absolute spread bonus
    if sell_price - buy_price > 100.0 {
        score += 1;
    }

    score.min(10) as u8
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
