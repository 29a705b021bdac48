pub mod engines; // Waterfall fetch engines with browser-identity rotation
pub mod parse; // Offer-page extraction (CSS cards → JSON-LD → regex)
pub mod wine_searcher; // Marketplace client: search, lowest price, HK reference

// Re-export the pieces the scanner and API wire together
pub use engines::{FetchEngine, SmartFetcher};
pub use wine_searcher::WineSearcherClient;
