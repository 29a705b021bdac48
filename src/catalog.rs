//! Investment-grade wine catalog.
//!
//! The priority list is the 20 most liquid blue-chip labels (auction volume,
//! price transparency) and is what scheduled scans iterate. The extended list
//! adds 30 more labels for manual lookups and display. Shipping, insurance and
//! the default profit threshold live here because they are properties of the
//! goods, not of the analyzer.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

// Category tags. The tier keywords ("First Growth", "Grand Cru", "Super
// Second", "Right Bank", "Icon", "Prestige") are what the analyzer scores on.
pub const CAT_FIRST_GROWTH: &str = "Bordeaux First Growth";
pub const CAT_RIGHT_BANK: &str = "Bordeaux Right Bank";
pub const CAT_SUPER_SECOND: &str = "Bordeaux Super Second";
pub const CAT_GRAND_CRU: &str = "Burgundy Grand Cru";
pub const CAT_ITALIAN_ICON: &str = "Italian Icon";
pub const CAT_NEW_WORLD_ICON: &str = "New World Icon";
pub const CAT_CHAMPAGNE: &str = "Champagne Prestige";
pub const CAT_RHONE: &str = "Rhone Valley";

/// Insurance premium applied to the buy price when computing landed cost.
pub const INSURANCE_RATE: f64 = 0.025; // 2.5%

/// Minimum profit rate (%) for an opportunity to qualify.
pub const DEFAULT_PROFIT_THRESHOLD: f64 = 15.0;

/// One catalog entry. `name` doubles as the marketplace search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub region: String,
    pub category: String,
}

impl CatalogItem {
    pub fn new(name: &str, region: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            region: region.to_string(),
            category: category.to_string(),
        }
    }
}

fn wine(name: &str, region: &str, category: &str) -> CatalogItem {
    CatalogItem::new(name, region, category)
}

lazy_static! {
    /// Core scan list. Kept small to conserve fetch quota.
    pub static ref PRIORITY_WINES: Vec<CatalogItem> = vec![
        // Bordeaux first growths
        wine("Chateau Lafite Rothschild", "Bordeaux", CAT_FIRST_GROWTH),
        wine("Chateau Latour", "Bordeaux", CAT_FIRST_GROWTH),
        wine("Chateau Mouton Rothschild", "Bordeaux", CAT_FIRST_GROWTH),
        wine("Chateau Margaux", "Bordeaux", CAT_FIRST_GROWTH),
        wine("Chateau Haut-Brion", "Bordeaux", CAT_FIRST_GROWTH),
        // Right bank
        wine("Petrus", "Bordeaux", CAT_RIGHT_BANK),
        wine("Chateau Cheval Blanc", "Bordeaux", CAT_RIGHT_BANK),
        wine("Chateau Angelus", "Bordeaux", CAT_RIGHT_BANK),
        // Burgundy
        wine("Domaine de la Romanee-Conti", "Burgundy", CAT_GRAND_CRU),
        wine("Domaine Leroy", "Burgundy", CAT_GRAND_CRU),
        wine("Domaine Armand Rousseau", "Burgundy", CAT_GRAND_CRU),
        // Italy
        wine("Sassicaia", "Italy", CAT_ITALIAN_ICON),
        wine("Ornellaia", "Italy", CAT_ITALIAN_ICON),
        wine("Masseto", "Italy", CAT_ITALIAN_ICON),
        // New world
        wine("Penfolds Grange", "Australia", CAT_NEW_WORLD_ICON),
        wine("Opus One", "USA", CAT_NEW_WORLD_ICON),
        wine("Screaming Eagle", "USA", CAT_NEW_WORLD_ICON),
        // Champagne
        wine("Dom Perignon", "Champagne", CAT_CHAMPAGNE),
        wine("Louis Roederer Cristal", "Champagne", CAT_CHAMPAGNE),
        // Rhone
        wine("Guigal La Mouline", "Rhone", CAT_RHONE),
    ];

    /// Extension list for manual lookups.
    pub static ref EXTENDED_WINES: Vec<CatalogItem> = vec![
        // Super seconds
        wine("Chateau Leoville Las Cases", "Bordeaux", CAT_SUPER_SECOND),
        wine("Chateau Cos d'Estournel", "Bordeaux", CAT_SUPER_SECOND),
        wine("Chateau Ducru-Beaucaillou", "Bordeaux", CAT_SUPER_SECOND),
        wine("Chateau Palmer", "Bordeaux", CAT_SUPER_SECOND),
        wine("Chateau Pichon Longueville Comtesse de Lalande", "Bordeaux", CAT_SUPER_SECOND),
        wine("Chateau Lynch-Bages", "Bordeaux", CAT_SUPER_SECOND),
        wine("Chateau Pontet-Canet", "Bordeaux", CAT_SUPER_SECOND),
        // More right bank
        wine("Chateau Ausone", "Bordeaux", CAT_RIGHT_BANK),
        wine("Le Pin", "Bordeaux", CAT_RIGHT_BANK),
        wine("Chateau Pavie", "Bordeaux", CAT_RIGHT_BANK),
        // More Burgundy
        wine("Domaine Comte Georges de Vogue", "Burgundy", CAT_GRAND_CRU),
        wine("Domaine Georges Roumier", "Burgundy", CAT_GRAND_CRU),
        wine("Domaine Coche-Dury", "Burgundy", CAT_GRAND_CRU),
        wine("Domaine Leflaive", "Burgundy", CAT_GRAND_CRU),
        // More Italy
        wine("Tignanello", "Italy", CAT_ITALIAN_ICON),
        wine("Solaia", "Italy", CAT_ITALIAN_ICON),
        wine("Gaja Barbaresco", "Italy", CAT_ITALIAN_ICON),
        wine("Giacomo Conterno Barolo Monfortino", "Italy", CAT_ITALIAN_ICON),
        // More new world
        wine("Penfolds Bin 389", "Australia", CAT_NEW_WORLD_ICON),
        wine("Penfolds Bin 407", "Australia", CAT_NEW_WORLD_ICON),
        wine("Harlan Estate", "USA", CAT_NEW_WORLD_ICON),
        wine("Almaviva", "Chile", CAT_NEW_WORLD_ICON),
        wine("Vega Sicilia Unico", "Spain", CAT_NEW_WORLD_ICON),
        // More Champagne
        wine("Krug Grande Cuvee", "Champagne", CAT_CHAMPAGNE),
        wine("Salon Le Mesnil", "Champagne", CAT_CHAMPAGNE),
        wine("Bollinger La Grande Annee", "Champagne", CAT_CHAMPAGNE),
        // More Rhone
        wine("Guigal La Landonne", "Rhone", CAT_RHONE),
        wine("Guigal La Turque", "Rhone", CAT_RHONE),
        wine("Chateau Rayas", "Rhone", CAT_RHONE),
        wine("Chapoutier Ermitage Le Pavillon", "Rhone", CAT_RHONE),
    ];

    /// Priority + extended, in declaration order.
    pub static ref ALL_WINES: Vec<CatalogItem> = {
        let mut all = PRIORITY_WINES.clone();
        all.extend(EXTENDED_WINES.iter().cloned());
        all
    };
}

/// Case-insensitive lookup across the full catalog.
pub fn find_wine(name: &str) -> Option<&'static CatalogItem> {
    let needle = name.trim().to_lowercase();
    ALL_WINES.iter().find(|w| w.name.to_lowercase() == needle)
}

/// Per-bottle shipping in USD. Case rates assume consolidated case freight;
/// single-bottle rates are noticeably worse.
pub fn shipping_cost(region: &str, per_case: bool) -> f64 {
    let (case_rate, single_rate) = match region {
        "Bordeaux" | "Burgundy" | "Rhone" | "Italy" | "Champagne" | "Spain" => (7.0, 12.0),
        "USA" | "Australia" => (20.0, 25.0),
        "Chile" => (18.0, 23.0),
        _ => (15.0, 20.0),
    };
    if per_case {
        case_rate
    } else {
        single_rate
    }
}

/// Landed cost per bottle: buy price + case-rate shipping + insurance.
pub fn total_cost(buy_price: f64, region: &str) -> f64 {
    buy_price + shipping_cost(region, true) + buy_price * INSURANCE_RATE
}

/// Profit rate (%) of `sell_price` over the landed cost. Zero when the landed
/// cost is non-positive.
pub fn profit_rate(buy_price: f64, sell_price: f64, region: &str) -> f64 {
    let cost = total_cost(buy_price, region);
    if cost <= 0.0 {
        return 0.0;
    }
    (sell_price - cost) / cost * 100.0
}
