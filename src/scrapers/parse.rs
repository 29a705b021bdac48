//! Offer-page extraction.
//!
//! The marketplace's markup shifts between page generations, so extraction
//! runs three methods in order and keeps the first that yields anything:
//! candidate CSS card selectors, embedded JSON-LD offer listings, and a
//! last-resort price-pattern sweep over the page text. Auction/lot/bulk
//! listings and junk prices are filtered at the edge so downstream code only
//! ever sees plausible single-bottle retail offers.

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::wine_searcher::BASE_URL;
use crate::models::Quote;

// Tried in order; the first selector producing matches wins.
const OFFER_CARD_SELECTORS: &[&str] = &[
    ".card__offer",
    ".offer-row",
    ".result-row",
    "[data-offer]",
    "tr.offer",
    ".search-result-item",
    ".wine-card",
    ".listing-row",
    ".price-listing",
    r#"div[class*="offer"]"#,
    r#"div[class*="listing"]"#,
    r#"tr[class*="offer"]"#,
    r#"tr[class*="result"]"#,
];

const MERCHANT_SELECTOR: &str = ".merchant-name, .offer-merchant, a[data-merchant]";
const PRICE_SELECTOR: &str = ".offer-price, .price, [data-price]";
const COUNTRY_SELECTOR: &str = ".country, .offer-country, [data-country]";

// Listings we never want: auctions, bids, multi-bottle lots.
const AUCTION_KEYWORDS: &[&str] = &["auction", "bid ", "lot of", "case of", "set of"];
const JSON_LD_KEYWORDS: &[&str] = &["auction", "bid", "lot of"];

/// Below this a "price" is an accessory or a parser misfire, not a bottle.
pub const MIN_OFFER_PRICE: f64 = 20.0;
/// Ceiling for the text-sweep fallback, which has no structure to lean on.
pub const MAX_TEXT_PRICE: f64 = 15000.0;

const MAX_OFFERS_PER_PAGE: usize = 20;
const MAX_TEXT_PRICE_MATCHES: usize = 5;

lazy_static! {
    static ref PRICE_RE: Regex =
        Regex::new(r"\$[\d,]+\.?\d*").expect("price pattern is a valid regex");
}

/// Extract merchant offers from a search-results page.
pub fn parse_offer_page(html: &str) -> Vec<Quote> {
    let doc = Html::parse_document(html);

    let mut quotes = parse_cards(&doc);
    if quotes.is_empty() {
        quotes = parse_json_ld(&doc);
    }
    if quotes.is_empty() {
        quotes = parse_text_prices(&doc);
    }
    quotes
}

fn parse_cards(doc: &Html) -> Vec<Quote> {
    let mut cards = Vec::new();
    for sel in OFFER_CARD_SELECTORS {
        if let Ok(selector) = Selector::parse(sel) {
            cards = doc.select(&selector).collect::<Vec<_>>();
            if !cards.is_empty() {
                debug!("🧩 offer selector hit: {} ({} cards)", sel, cards.len());
                break;
            }
        }
    }

    let mut quotes = Vec::new();
    for card in cards.into_iter().take(MAX_OFFERS_PER_PAGE) {
        let merchant =
            first_text(&card, MERCHANT_SELECTOR).unwrap_or_else(|| "Unknown merchant".to_string());

        let card_text = card.text().collect::<String>().to_lowercase();
        if AUCTION_KEYWORDS.iter().any(|kw| card_text.contains(kw)) {
            continue;
        }
        if merchant.to_lowercase().contains("auction") {
            continue;
        }

        let Some(price_text) = first_text(&card, PRICE_SELECTOR) else {
            continue;
        };
        let Some(price) = parse_price_text(&price_text) else {
            continue;
        };
        if price < MIN_OFFER_PRICE {
            continue;
        }

        let country = first_text(&card, COUNTRY_SELECTOR).unwrap_or_default();

        quotes.push(Quote {
            merchant,
            price,
            currency: detect_currency(&price_text).to_string(),
            country,
            url: extract_preferred_link(&card),
            captured_at: Utc::now(),
        });
    }
    quotes
}

fn parse_json_ld(doc: &Html) -> Vec<Quote> {
    let mut quotes = Vec::new();
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return quotes;
    };

    for script in doc.select(&selector) {
        let raw = script.text().collect::<String>();
        let Ok(data) = serde_json::from_str::<serde_json::Value>(&raw) else {
            continue;
        };
        let Some(offers) = data.get("offers").and_then(|o| o.as_array()) else {
            continue;
        };

        for offer in offers.iter().take(MAX_OFFERS_PER_PAGE) {
            let description = offer
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or("")
                .to_lowercase();
            let seller = offer
                .get("seller")
                .and_then(|s| s.get("name"))
                .and_then(|n| n.as_str())
                .unwrap_or("");
            let seller_lower = seller.to_lowercase();
            if JSON_LD_KEYWORDS
                .iter()
                .any(|kw| description.contains(kw) || seller_lower.contains(kw))
            {
                continue;
            }

            let Some(price) = json_price(offer.get("price")) else {
                continue;
            };
            if price <= MIN_OFFER_PRICE {
                continue;
            }

            quotes.push(Quote {
                merchant: if seller.is_empty() {
                    "Unknown merchant".to_string()
                } else {
                    seller.to_string()
                },
                price,
                currency: offer
                    .get("priceCurrency")
                    .and_then(|c| c.as_str())
                    .unwrap_or("USD")
                    .to_string(),
                country: String::new(),
                url: offer
                    .get("url")
                    .and_then(|u| u.as_str())
                    .unwrap_or("")
                    .to_string(),
                captured_at: Utc::now(),
            });
        }
    }
    quotes
}

// No structure left to trust, so the accepted range is tight.
fn parse_text_prices(doc: &Html) -> Vec<Quote> {
    let text: String = doc.root_element().text().collect();

    let mut quotes = Vec::new();
    for m in PRICE_RE.find_iter(&text).take(MAX_TEXT_PRICE_MATCHES) {
        let Some(price) = parse_price_text(m.as_str()) else {
            continue;
        };
        if price > MIN_OFFER_PRICE && price < MAX_TEXT_PRICE {
            quotes.push(Quote {
                merchant: "Wine-Searcher".to_string(),
                price,
                currency: "USD".to_string(),
                country: String::new(),
                url: String::new(),
                captured_at: Utc::now(),
            });
        }
    }
    quotes
}

fn first_text(card: &ElementRef, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let element = card.select(&sel).next()?;
    let text = element.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// Prefer marketplace listing links over merchant home pages; resolve
// relative paths against the marketplace base.
fn extract_preferred_link(card: &ElementRef) -> String {
    let Ok(sel) = Selector::parse("a[href]") else {
        return String::new();
    };
    for a in card.select(&sel) {
        if let Some(href) = a.value().attr("href") {
            if href.contains("wine-searcher.com")
                || href.starts_with("/find")
                || href.starts_with("/merchant")
            {
                return if href.starts_with("http") {
                    href.to_string()
                } else {
                    format!("{}{}", BASE_URL, href)
                };
            }
        }
    }
    String::new()
}

fn json_price(value: Option<&serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a displayed price. Handles thousands separators in both conventions
/// ("1,234.56" and "1.234,56") plus a bare decimal comma ("12,50").
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.find(','), cleaned.find('.')) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                // European style: dots group thousands, comma is decimal
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (Some(_), None) => {
            let decimal_comma = cleaned
                .rsplit(',')
                .next()
                .map(|last| last.len() == 2)
                .unwrap_or(false);
            if decimal_comma {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        _ => cleaned,
    };

    normalized.parse::<f64>().ok()
}

/// Currency from the symbols/codes in a price label. `HK$` is tested before
/// the generic `$`; a bare `$` defaults to USD and market-specific pages
/// correct it downstream.
pub fn detect_currency(text: &str) -> &'static str {
    if text.contains("HK$") || text.contains("HKD") {
        "HKD"
    } else if text.contains('€') || text.contains("EUR") {
        "EUR"
    } else if text.contains('£') || text.contains("GBP") {
        "GBP"
    } else if text.contains('¥') || text.contains("CNY") {
        "CNY"
    } else if text.contains('$') || text.contains("USD") {
        "USD"
    } else {
        "USD"
    }
}
