//! Scan orchestrator.
//!
//! Drives the priority catalog through fetch -> analyze -> persist -> notify.
//! One scan at a time: concurrent triggers (scheduler vs. manual) race for an
//! atomic flag and the loser is rejected immediately, never queued. Progress
//! is shared state written only here; pollers get snapshot copies.

use crate::analyzer;
use crate::cache::SkipCache;
use crate::catalog::{CatalogItem, PRIORITY_WINES};
use crate::models::{
    NormalizedQuote, Opportunity, ScanLog, ScanProgress, ScanStatus, DATA_SOURCE,
};
use crate::notifier::TelegramNotifier;
use crate::scrapers::WineSearcherClient;
use crate::storage::DealStore;
use anyhow::Result;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of one scan trigger.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Another run holds the single-flight flag; nothing was done.
    AlreadyRunning,
    Finished(ScanSummary),
}

/// Aggregate result of one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub status: ScanStatus,
    pub wines_scanned: i64,
    pub wines_skipped: i64,
    pub opportunities_found: i64,
    pub errors: Vec<String>,
    pub duration_seconds: f64,
    pub opportunities: Vec<Opportunity>,
}

/// Result of an on-demand single-wine lookup.
#[derive(Debug, Clone, Serialize)]
pub struct SingleScanResult {
    pub wine_name: String,
    pub found: bool,
    pub global_lowest: Option<NormalizedQuote>,
    pub reference_price_usd: Option<f64>,
    pub opportunity: Option<Opportunity>,
}

// Releases the single-flight flag on every exit path, including panics.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The deal scanner. Owns the skip cache and the progress state.
pub struct DealScanner {
    searcher: Arc<WineSearcherClient>,
    store: Arc<DealStore>,
    notifier: Arc<TelegramNotifier>,
    running: AtomicBool,
    progress: RwLock<ScanProgress>,
    cache: Mutex<SkipCache>,
}

impl DealScanner {
    pub fn new(
        searcher: Arc<WineSearcherClient>,
        store: Arc<DealStore>,
        notifier: Arc<TelegramNotifier>,
    ) -> Self {
        Self {
            searcher,
            store,
            notifier,
            running: AtomicBool::new(false),
            progress: RwLock::new(ScanProgress::default()),
            cache: Mutex::new(SkipCache::new()),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the current progress counters.
    pub fn progress(&self) -> ScanProgress {
        self.progress.read().clone()
    }

    fn try_acquire(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunGuard(&self.running))
    }

    /// Run one full scan over the priority catalog.
    ///
    /// Returns `AlreadyRunning` without touching any state when another scan
    /// holds the flag.
    pub async fn run_full_scan(&self, profit_threshold: f64, notify: bool) -> ScanOutcome {
        let Some(_guard) = self.try_acquire() else {
            warn!("⏳ Scan already in progress, skipping this trigger");
            return ScanOutcome::AlreadyRunning;
        };

        let summary = self
            .scan_items(&PRIORITY_WINES, profit_threshold, notify)
            .await;
        ScanOutcome::Finished(summary)
    }

    /// The scan loop proper. Caller is responsible for the single-flight flag.
    async fn scan_items(
        &self,
        items: &[CatalogItem],
        profit_threshold: f64,
        notify: bool,
    ) -> ScanSummary {
        let started_at = Utc::now().to_rfc3339();
        let started = Instant::now();

        let mut order: Vec<CatalogItem> = items.to_vec();
        {
            // ThreadRng is not Send; finish the shuffle before the first await
            let mut rng = rand::thread_rng();
            order.shuffle(&mut rng);
        }

        let total = order.len();
        {
            let mut progress = self.progress.write();
            *progress = ScanProgress {
                status: ScanStatus::Running,
                total,
                ..ScanProgress::default()
            };
        }

        info!("🔍 Starting full scan of {} priority wines...", total);

        let mut wines_scanned = 0i64;
        let mut wines_skipped = 0i64;
        let mut found: Vec<Opportunity> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        for item in &order {
            if self.cache.lock().should_skip(&item.name) {
                wines_skipped += 1;
                self.progress.write().skipped = wines_skipped as usize;
                debug!("⏭️  Skipping {} (recent miss streak)", item.name);
                continue;
            }

            self.progress.write().current_wine = item.name.clone();

            let outcome: Result<Option<Opportunity>> = async {
                let snapshot = self.searcher.snapshot(&item.name).await;

                wines_scanned += 1;
                self.progress.write().scanned = wines_scanned as usize;

                let Some(lowest) = snapshot.global_lowest.as_ref() else {
                    debug!("No offers found for {}", item.name);
                    return Ok(None);
                };

                self.store
                    .insert_price_history(
                        &item.name,
                        "",
                        lowest.price_usd,
                        "USD",
                        DATA_SOURCE,
                        &lowest.quote.merchant,
                        &lowest.quote.country,
                    )
                    .await?;

                let Some(opp) = analyzer::analyze(&snapshot, item, profit_threshold) else {
                    return Ok(None);
                };

                let id = self.store.upsert_opportunity(&opp).await?;
                let mut opp = opp;
                opp.id = Some(id);

                if notify {
                    self.notifier.notify_opportunity(&opp).await;
                }

                Ok(Some(opp))
            }
            .await;

            match outcome {
                Ok(Some(opp)) => {
                    self.cache.lock().record(&item.name, true);
                    found.push(opp);
                    self.progress.write().found = found.len();
                }
                Ok(None) => {
                    self.cache.lock().record(&item.name, false);
                }
                Err(e) => {
                    // Cache left untouched: a storage error says nothing
                    // about the wine itself
                    let msg = format!("{}: {:#}", item.name, e);
                    warn!("⚠️ Scan error: {}", msg);
                    errors.push(msg);
                    self.progress.write().errors = errors.len();
                }
            }
        }

        let duration = started.elapsed().as_secs_f64();

        let log = ScanLog {
            id: None,
            scan_type: "full".to_string(),
            wines_scanned,
            wines_skipped,
            opportunities_found: found.len() as i64,
            errors: if errors.is_empty() {
                None
            } else {
                Some(errors.join("; "))
            },
            started_at,
            finished_at: None,
            duration_seconds: duration,
        };
        if let Err(e) = self.store.insert_scan_log(&log).await {
            warn!("Failed to persist scan log: {:#}", e);
        }

        let status = if errors.is_empty() {
            ScanStatus::Completed
        } else {
            ScanStatus::CompletedWithErrors
        };

        {
            let mut progress = self.progress.write();
            progress.status = status;
            progress.current_wine = String::new();
        }

        info!(
            "✅ Scan complete: {} scanned, {} skipped, {} opportunities, {} errors, {:.1}s",
            wines_scanned,
            wines_skipped,
            found.len(),
            errors.len(),
            duration
        );

        ScanSummary {
            status,
            wines_scanned,
            wines_skipped,
            opportunities_found: found.len() as i64,
            errors,
            duration_seconds: (duration * 10.0).round() / 10.0,
            opportunities: found,
        }
    }

    /// On-demand lookup for one wine. Bypasses the skip cache, the
    /// single-flight flag, scan logging and persistence.
    pub async fn scan_one(&self, item: &CatalogItem, profit_threshold: f64) -> SingleScanResult {
        let snapshot = self.searcher.snapshot(&item.name).await;

        if !snapshot.found() {
            return SingleScanResult {
                wine_name: item.name.clone(),
                found: false,
                global_lowest: None,
                reference_price_usd: None,
                opportunity: None,
            };
        }

        let opportunity = analyzer::analyze(&snapshot, item, profit_threshold);

        SingleScanResult {
            wine_name: item.name.clone(),
            found: true,
            global_lowest: snapshot.global_lowest,
            reference_price_usd: snapshot.reference_price_usd,
            opportunity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CAT_FIRST_GROWTH;
    use crate::rates::RateBook;
    use crate::scrapers::SmartFetcher;

    /// Scanner whose fetcher has no engines: every lookup comes back empty
    /// without touching the network.
    fn offline_scanner() -> DealScanner {
        let rates = Arc::new(RateBook::new());
        let searcher = Arc::new(WineSearcherClient::with_fetcher(
            SmartFetcher::new(Vec::new()),
            rates,
        ));
        let store = Arc::new(DealStore::new(":memory:").expect("store"));
        let notifier = Arc::new(TelegramNotifier::from_env());
        DealScanner::new(searcher, store, notifier)
    }

    #[tokio::test]
    async fn test_second_trigger_rejected_while_running() {
        let scanner = offline_scanner();

        let guard = scanner.try_acquire().expect("first acquire");
        assert!(scanner.is_scanning());

        let outcome = scanner.run_full_scan(15.0, false).await;
        assert!(matches!(outcome, ScanOutcome::AlreadyRunning));

        // The rejected trigger must not have touched any state
        let progress = scanner.progress();
        assert_eq!(progress.status, ScanStatus::Idle);
        assert_eq!(progress.scanned, 0);
        assert_eq!(progress.total, 0);

        drop(guard);
        assert!(!scanner.is_scanning());
    }

    #[tokio::test]
    async fn test_guard_releases_on_drop() {
        let scanner = offline_scanner();
        {
            let _guard = scanner.try_acquire().expect("acquire");
            assert!(scanner.is_scanning());
            assert!(scanner.try_acquire().is_none());
        }
        assert!(!scanner.is_scanning());
        assert!(scanner.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_progress_reads_are_snapshots() {
        let scanner = offline_scanner();
        let before = scanner.progress();
        scanner.progress.write().scanned = 7;
        assert_eq!(before.scanned, 0);
        assert_eq!(scanner.progress().scanned, 7);
    }

    // Exercises the whole loop with an empty-engine fetcher: first pass scans
    // everything and records misses, second pass skips everything via the
    // cache. Slowish (per-wine pacing delays) but network-free.
    #[tokio::test]
    async fn test_scan_loop_records_misses_then_skips() {
        let scanner = offline_scanner();
        let items = vec![
            CatalogItem::new("Chateau Test Lafite", "Bordeaux", CAT_FIRST_GROWTH),
            CatalogItem::new("Chateau Test Latour", "Bordeaux", CAT_FIRST_GROWTH),
        ];

        let first = scanner.scan_items(&items, 15.0, false).await;
        assert_eq!(first.status, ScanStatus::Completed);
        assert_eq!(first.wines_scanned, 2);
        assert_eq!(first.wines_skipped, 0);
        assert_eq!(first.opportunities_found, 0);
        assert!(first.errors.is_empty());
        assert!(first.opportunities.is_empty());

        // Both wines now carry a fresh miss; an immediate rescan skips them
        let second = scanner.scan_items(&items, 15.0, false).await;
        assert_eq!(second.wines_scanned, 0);
        assert_eq!(second.wines_skipped, 2);

        let progress = scanner.progress();
        assert_eq!(progress.status, ScanStatus::Completed);
        assert_eq!(progress.skipped, 2);
        assert!(progress.current_wine.is_empty());

        // Both runs were logged
        let logs = scanner.store.scan_logs(10).expect("logs");
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.scan_type == "full"));
    }
}
