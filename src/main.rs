//! Cellarbot - Fine Wine Arbitrage Scanner
//! Watches European merchant listings for wines priced well below their
//! Hong Kong reference, persists the spread, and pings Telegram.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::time::interval;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cellarbot_backend::{
    api::create_router,
    models::Config,
    notifier::TelegramNotifier,
    rates::RateBook,
    scanner::{DealScanner, ScanOutcome},
    scrapers::WineSearcherClient,
    storage::DealStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    info!("🍷 Cellarbot Backend Starting");

    let config = Config::from_env()?;

    let store = Arc::new(DealStore::new(&config.db_path)?);
    info!("📊 Database initialized at: {}", config.db_path);

    // Drop leftovers from older scans that slipped through with broken prices
    if let Err(e) = store.purge_implausible() {
        warn!("Startup purge failed: {}", e);
    }

    // Warm the FX table before the first scan; failures keep the pinned rates
    let rates = Arc::new(RateBook::new());
    {
        let rates = rates.clone();
        tokio::spawn(async move { rates.ensure_fresh().await });
    }

    let notifier = Arc::new(TelegramNotifier::from_env());
    let searcher = Arc::new(WineSearcherClient::new(
        config.scraper_api_key.clone(),
        rates.clone(),
    ));
    let scanner = Arc::new(DealScanner::new(searcher, store.clone(), notifier));

    tokio::spawn(scheduled_scan(
        scanner.clone(),
        config.scan_interval_minutes,
        config.profit_threshold,
    ));

    let app = create_router(store, scanner, config.profit_threshold).layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("🚀 API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Periodic full-catalog scan. tokio's interval fires the first tick
/// immediately, so a fresh deploy scans right away.
async fn scheduled_scan(scanner: Arc<DealScanner>, interval_minutes: u64, profit_threshold: f64) {
    let minutes = interval_minutes.max(1);
    info!("⏰ Scheduled scan every {} minutes", minutes);

    let mut ticker = interval(Duration::from_secs(minutes * 60));
    loop {
        ticker.tick().await;

        info!("⏰ Scheduled scan starting");
        match scanner.run_full_scan(profit_threshold, true).await {
            ScanOutcome::AlreadyRunning => {
                warn!("⏳ Scheduled scan skipped: previous scan still running");
            }
            ScanOutcome::Finished(summary) => {
                info!(
                    "✅ Scheduled scan done: {} scanned, {} skipped, {} opportunities in {:.1}s",
                    summary.wines_scanned,
                    summary.wines_skipped,
                    summary.opportunities_found,
                    summary.duration_seconds
                );
            }
        }
    }
}

/// Initialize tracing with env-filterable output
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cellarbot_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate-dir .env (common when launched from elsewhere)
    // CARGO_MANIFEST_DIR points at the backend crate at compile time.
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let candidates = [manifest_dir.join(".env"), manifest_dir.join("../.env")];

    for p in candidates {
        if p.exists() {
            let _ = dotenv::from_path(&p);
        }
    }
}
