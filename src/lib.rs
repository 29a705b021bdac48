//! Cellarbot Backend Library
//!
//! Exposes the full scan pipeline for use by the binary and tests:
//! fetch listings, normalize to USD, score the spread against the Hong Kong
//! reference, persist and notify.

pub mod analyzer;
pub mod api;
pub mod cache;
pub mod catalog;
pub mod models;
pub mod notifier;
pub mod rates;
pub mod scanner;
pub mod scrapers;
pub mod storage;
