//! Adaptive scan cache.
//!
//! Wines that keep coming back empty earn progressively longer skip windows
//! (24h → 48h → 72h) so routine scans stop burning fetch quota on them. A
//! wine whose last evaluation produced an opportunity is always re-evaluated.
//! Memory only; every boot starts cold.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub last_evaluated: DateTime<Utc>,
    pub had_opportunity: bool,
    pub consecutive_misses: u32,
}

#[derive(Debug, Default)]
pub struct SkipCache {
    entries: HashMap<String, CacheEntry>,
}

impl SkipCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// True when this wine's miss streak is still inside its skip window.
    /// Read-only: checking never counts as an evaluation.
    pub fn should_skip(&self, wine_name: &str) -> bool {
        self.should_skip_at(wine_name, Utc::now())
    }

    /// Record the outcome of an actual evaluation. A find resets the miss
    /// streak; a miss extends it.
    pub fn record(&mut self, wine_name: &str, had_opportunity: bool) {
        self.record_at(wine_name, had_opportunity, Utc::now());
    }

    pub fn entry(&self, wine_name: &str) -> Option<&CacheEntry> {
        self.entries.get(wine_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn should_skip_at(&self, wine_name: &str, now: DateTime<Utc>) -> bool {
        match self.entries.get(wine_name) {
            Some(entry) if !entry.had_opportunity => {
                now - entry.last_evaluated < skip_window(entry.consecutive_misses)
            }
            _ => false,
        }
    }

    fn record_at(&mut self, wine_name: &str, had_opportunity: bool, now: DateTime<Utc>) {
        let entry = self
            .entries
            .entry(wine_name.to_string())
            .or_insert(CacheEntry {
                last_evaluated: now,
                had_opportunity,
                consecutive_misses: 0,
            });
        entry.last_evaluated = now;
        entry.had_opportunity = had_opportunity;
        if had_opportunity {
            entry.consecutive_misses = 0;
        } else {
            entry.consecutive_misses += 1;
        }
    }
}

/// Miss-streak escalation: first miss 24h, second 48h, third and beyond 72h.
fn skip_window(consecutive_misses: u32) -> Duration {
    match consecutive_misses {
        0 | 1 => Duration::hours(24),
        2 => Duration::hours(48),
        _ => Duration::hours(72),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_wine_is_never_skipped() {
        let cache = SkipCache::new();
        assert!(!cache.should_skip("Petrus"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_opportunity_wine_is_never_skipped() {
        let mut cache = SkipCache::new();
        let t0 = Utc::now();
        cache.record_at("Petrus", true, t0);

        assert!(!cache.should_skip_at("Petrus", t0));
        assert!(!cache.should_skip_at("Petrus", t0 + Duration::minutes(1)));
        assert_eq!(cache.entry("Petrus").map(|e| e.consecutive_misses), Some(0));
    }

    #[test]
    fn test_single_miss_gets_24h_window() {
        let mut cache = SkipCache::new();
        let t0 = Utc::now();
        cache.record_at("Masseto", false, t0);

        assert!(cache.should_skip_at("Masseto", t0 + Duration::hours(23)));
        assert!(!cache.should_skip_at("Masseto", t0 + Duration::hours(25)));
    }

    #[test]
    fn test_two_misses_get_48h_window() {
        let mut cache = SkipCache::new();
        let t0 = Utc::now();
        cache.record_at("Masseto", false, t0);
        cache.record_at("Masseto", false, t0 + Duration::hours(25));

        let last = t0 + Duration::hours(25);
        assert!(cache.should_skip_at("Masseto", last + Duration::hours(47)));
        assert!(!cache.should_skip_at("Masseto", last + Duration::hours(49)));
    }

    #[test]
    fn test_three_misses_get_72h_window_then_reevaluate() {
        let mut cache = SkipCache::new();
        let mut t = Utc::now();
        for _ in 0..3 {
            cache.record_at("Solaia", false, t);
            t = t + Duration::hours(100);
        }
        let last = t - Duration::hours(100);

        assert_eq!(cache.entry("Solaia").map(|e| e.consecutive_misses), Some(3));
        assert!(cache.should_skip_at("Solaia", last + Duration::hours(71)));
        // Window lapsed: eligible again
        assert!(!cache.should_skip_at("Solaia", last + Duration::hours(73)));
    }

    #[test]
    fn test_find_resets_the_streak() {
        let mut cache = SkipCache::new();
        let t0 = Utc::now();
        cache.record_at("Opus One", false, t0);
        cache.record_at("Opus One", false, t0);
        cache.record_at("Opus One", false, t0);
        cache.record_at("Opus One", true, t0);

        assert!(!cache.should_skip_at("Opus One", t0));
        assert_eq!(cache.entry("Opus One").map(|e| e.consecutive_misses), Some(0));

        // Next miss starts a fresh 24h window, not 72h
        cache.record_at("Opus One", false, t0);
        assert_eq!(cache.entry("Opus One").map(|e| e.consecutive_misses), Some(1));
        assert!(cache.should_skip_at("Opus One", t0 + Duration::hours(23)));
        assert!(!cache.should_skip_at("Opus One", t0 + Duration::hours(25)));
    }
}
