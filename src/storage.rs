//! SQLite-backed deal storage
//! Holds opportunities, scan logs, price history and the watchlist.
//!
//! Key points:
//! - WAL mode for concurrent reads during writes
//! - Prepared statement caching for the hot list queries
//! - Single connection behind our own lock
//! - Upserts keyed on (wine_name, active) so a re-scanned wine refreshes
//!   its existing row instead of inserting a duplicate

use crate::models::{Opportunity, PricePoint, ScanLog, WatchEntry};
use anyhow::{Context, Result};
use parking_lot::Mutex; // Faster than std::sync::Mutex
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Schema applied on every startup (idempotent).
const SCHEMA_SQL: &str = r#"
-- Enable WAL mode for better concurrent access
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -64000;  -- 64MB cache
PRAGMA temp_store = MEMORY;
PRAGMA mmap_size = 268435456;  -- 256MB memory-mapped I/O

CREATE TABLE IF NOT EXISTS opportunities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    wine_name TEXT NOT NULL,
    vintage TEXT,
    region TEXT,
    category TEXT,
    buy_price REAL NOT NULL,
    buy_currency TEXT DEFAULT 'USD',
    buy_merchant TEXT,
    buy_country TEXT,
    buy_url TEXT,
    sell_price_hk REAL,
    total_cost REAL,
    shipping_cost REAL,
    profit_rate REAL,
    score INTEGER,
    data_source TEXT DEFAULT 'wine-searcher',
    status TEXT DEFAULT 'active',
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS scan_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_type TEXT,
    wines_scanned INTEGER DEFAULT 0,
    wines_skipped INTEGER DEFAULT 0,
    opportunities_found INTEGER DEFAULT 0,
    errors TEXT,
    started_at TEXT,
    finished_at TEXT DEFAULT CURRENT_TIMESTAMP,
    duration_seconds REAL
);

CREATE TABLE IF NOT EXISTS watchlist (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    wine_name TEXT NOT NULL,
    region TEXT,
    target_price REAL,
    notes TEXT,
    active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS price_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    wine_name TEXT NOT NULL,
    vintage TEXT,
    price REAL NOT NULL,
    currency TEXT DEFAULT 'USD',
    source TEXT,
    merchant TEXT,
    country TEXT,
    recorded_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_opp_profit ON opportunities(profit_rate DESC);
CREATE INDEX IF NOT EXISTS idx_opp_status ON opportunities(status);
CREATE INDEX IF NOT EXISTS idx_opp_created ON opportunities(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_price_wine ON price_history(wine_name);
"#;

/// Deal record store
pub struct DealStore {
    conn: Arc<Mutex<Connection>>,
}

impl DealStore {
    /// Open (or create) the database and apply the schema.
    pub fn new(db_path: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX; // We handle our own locking

        let conn = Connection::open_with_flags(db_path, flags)
            .with_context(|| format!("Failed to open database at {}", db_path))?;

        // Apply performance pragmas and schema
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize database schema")?;

        // Verify WAL mode is active (":memory:" databases report "memory")
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap_or_default();

        if !matches!(journal_mode.to_lowercase().as_str(), "wal" | "memory") {
            warn!("WAL mode not active, journal_mode = {}", journal_mode);
        }

        info!("📊 Deal database initialized at: {}", db_path);

        let active: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM opportunities WHERE status = 'active'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        info!("📈 Active opportunities in database: {}", active);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ===== Opportunities =====

    /// Insert an opportunity, or refresh the existing active row for the same
    /// wine name. Returns the row id either way.
    ///
    /// The update path deliberately leaves vintage/region/category untouched;
    /// those describe the wine, not the offer.
    pub async fn upsert_opportunity(&self, opp: &Opportunity) -> Result<i64> {
        let conn = self.conn.lock();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM opportunities WHERE wine_name = ?1 AND status = 'active'",
                params![&opp.wine_name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            conn.execute(
                "UPDATE opportunities SET
                    buy_price=?1, buy_currency=?2, buy_merchant=?3, buy_country=?4,
                    buy_url=?5, sell_price_hk=?6, total_cost=?7, shipping_cost=?8,
                    profit_rate=?9, score=?10, data_source=?11,
                    created_at=CURRENT_TIMESTAMP
                 WHERE id=?12",
                params![
                    opp.buy_price,
                    &opp.buy_currency,
                    &opp.buy_merchant,
                    &opp.buy_country,
                    &opp.buy_url,
                    opp.sell_price_hk,
                    opp.total_cost,
                    opp.shipping_cost,
                    opp.profit_rate,
                    opp.score as i64,
                    &opp.data_source,
                    id,
                ],
            )?;
            debug!("♻️  Refreshed active opportunity #{} ({})", id, opp.wine_name);
            Ok(id)
        } else {
            conn.execute(
                "INSERT INTO opportunities
                 (wine_name, vintage, region, category, buy_price, buy_currency,
                  buy_merchant, buy_country, buy_url, sell_price_hk, total_cost,
                  shipping_cost, profit_rate, score, data_source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    &opp.wine_name,
                    &opp.vintage,
                    &opp.region,
                    &opp.category,
                    opp.buy_price,
                    &opp.buy_currency,
                    &opp.buy_merchant,
                    &opp.buy_country,
                    &opp.buy_url,
                    opp.sell_price_hk,
                    opp.total_cost,
                    opp.shipping_cost,
                    opp.profit_rate,
                    opp.score as i64,
                    &opp.data_source,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        }
    }

    /// List opportunities ordered by profit rate (best first).
    #[inline]
    pub fn list_opportunities(
        &self,
        status: &str,
        min_profit: f64,
        limit: usize,
    ) -> Result<Vec<Opportunity>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare_cached(
            "SELECT id, wine_name, vintage, region, category, buy_price, buy_currency,
                    buy_merchant, buy_country, buy_url, sell_price_hk, total_cost,
                    shipping_cost, profit_rate, score, data_source, status, created_at
             FROM opportunities
             WHERE status = ?1 AND profit_rate >= ?2
             ORDER BY profit_rate DESC
             LIMIT ?3",
        )?;

        let opportunities = stmt
            .query_map(params![status, min_profit, limit], Self::row_to_opportunity)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(opportunities)
    }

    /// Fetch a single opportunity by row id.
    #[inline]
    pub fn get_opportunity(&self, id: i64) -> Result<Option<Opportunity>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare_cached(
            "SELECT id, wine_name, vintage, region, category, buy_price, buy_currency,
                    buy_merchant, buy_country, buy_url, sell_price_hk, total_cost,
                    shipping_cost, profit_rate, score, data_source, status, created_at
             FROM opportunities
             WHERE id = ?1",
        )?;

        let mut rows = stmt.query([id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        Ok(Some(Self::row_to_opportunity(row)?))
    }

    /// Delete rows no plausible deal could have produced (bad parses that
    /// slipped through before the analyzer gates were tightened). Run once at
    /// startup.
    pub fn purge_implausible(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM opportunities
             WHERE profit_rate > 500 OR buy_price <= 0 OR sell_price_hk <= 0",
            [],
        )?;
        if deleted > 0 {
            info!("🧹 Purged {} implausible opportunity rows", deleted);
        }
        Ok(deleted)
    }

    // ===== Scan logs =====

    /// Append one scan-run record. `finished_at` is filled by the database.
    pub async fn insert_scan_log(&self, log: &ScanLog) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO scan_logs
             (scan_type, wines_scanned, wines_skipped, opportunities_found,
              errors, started_at, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &log.scan_type,
                log.wines_scanned,
                log.wines_skipped,
                log.opportunities_found,
                &log.errors,
                &log.started_at,
                log.duration_seconds,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent scan runs, newest first.
    #[inline]
    pub fn scan_logs(&self, limit: usize) -> Result<Vec<ScanLog>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare_cached(
            "SELECT id, scan_type, wines_scanned, wines_skipped, opportunities_found,
                    errors, started_at, finished_at, duration_seconds
             FROM scan_logs
             ORDER BY finished_at DESC
             LIMIT ?1",
        )?;

        let logs = stmt
            .query_map([limit], Self::row_to_scan_log)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(logs)
    }

    // ===== Price history =====

    /// Record one buy-side price observation.
    pub async fn insert_price_history(
        &self,
        wine_name: &str,
        vintage: &str,
        price: f64,
        currency: &str,
        source: &str,
        merchant: &str,
        country: &str,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO price_history
             (wine_name, vintage, price, currency, source, merchant, country)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![wine_name, vintage, price, currency, source, merchant, country],
        )?;
        Ok(())
    }

    /// Price observations for wines whose name contains `wine_name`, newest
    /// first.
    #[inline]
    pub fn price_history(&self, wine_name: &str, limit: usize) -> Result<Vec<PricePoint>> {
        let pattern = format!("%{}%", wine_name);
        let conn = self.conn.lock();

        let mut stmt = conn.prepare_cached(
            "SELECT id, wine_name, vintage, price, currency, source, merchant,
                    country, recorded_at
             FROM price_history
             WHERE wine_name LIKE ?1
             ORDER BY recorded_at DESC
             LIMIT ?2",
        )?;

        let points = stmt
            .query_map(params![pattern, limit], Self::row_to_price_point)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(points)
    }

    // ===== Watchlist =====

    pub async fn add_watch(
        &self,
        wine_name: &str,
        region: Option<&str>,
        target_price: Option<f64>,
        notes: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO watchlist (wine_name, region, target_price, notes)
             VALUES (?1, ?2, ?3, ?4)",
            params![wine_name, region, target_price, notes],
        )?;
        Ok(conn.last_insert_rowid())
    }

    #[inline]
    pub fn watchlist(&self) -> Result<Vec<WatchEntry>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare_cached(
            "SELECT id, wine_name, region, target_price, notes, active, created_at
             FROM watchlist
             WHERE active = 1
             ORDER BY created_at DESC",
        )?;

        let entries = stmt
            .query_map([], Self::row_to_watch_entry)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(entries)
    }

    /// Soft delete: the row stays for history, the list query filters it out.
    pub async fn remove_watch(&self, id: i64) -> Result<usize> {
        let conn = self.conn.lock();
        let changed = conn.execute("UPDATE watchlist SET active = 0 WHERE id = ?1", params![id])?;
        Ok(changed)
    }

    // ===== Stats =====

    /// Dashboard aggregates in one pass.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();

        let today_opportunities: i64 = conn.query_row(
            "SELECT COUNT(*) FROM opportunities
             WHERE date(created_at) = date('now') AND status = 'active'",
            [],
            |row| row.get(0),
        )?;

        let total_opportunities: i64 = conn.query_row(
            "SELECT COUNT(*) FROM opportunities WHERE status = 'active'",
            [],
            |row| row.get(0),
        )?;

        let max_profit: Option<f64> = conn.query_row(
            "SELECT MAX(profit_rate) FROM opportunities WHERE status = 'active'",
            [],
            |row| row.get(0),
        )?;

        let last_scan: Option<String> = conn
            .query_row(
                "SELECT finished_at FROM scan_logs ORDER BY finished_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let total_scans: i64 =
            conn.query_row("SELECT COUNT(*) FROM scan_logs", [], |row| row.get(0))?;

        Ok(StoreStats {
            today_opportunities,
            total_opportunities,
            max_profit_rate: max_profit.map(|p| (p * 10.0).round() / 10.0).unwrap_or(0.0),
            last_scan,
            total_scans,
        })
    }

    // ===== Row mappers =====

    #[inline]
    fn row_to_opportunity(row: &rusqlite::Row) -> rusqlite::Result<Opportunity> {
        Ok(Opportunity {
            id: row.get(0)?,
            wine_name: row.get(1)?,
            vintage: row.get(2)?,
            region: row.get(3)?,
            category: row.get(4)?,
            buy_price: row.get(5)?,
            buy_currency: row.get(6)?,
            buy_merchant: row.get(7)?,
            buy_country: row.get(8)?,
            buy_url: row.get(9)?,
            sell_price_hk: row.get(10)?,
            total_cost: row.get(11)?,
            shipping_cost: row.get(12)?,
            profit_rate: row.get(13)?,
            score: row.get::<_, i64>(14)?.clamp(0, 10) as u8,
            data_source: row.get(15)?,
            status: row.get(16)?,
            created_at: row.get(17)?,
        })
    }

    #[inline]
    fn row_to_scan_log(row: &rusqlite::Row) -> rusqlite::Result<ScanLog> {
        Ok(ScanLog {
            id: row.get(0)?,
            scan_type: row.get(1)?,
            wines_scanned: row.get(2)?,
            wines_skipped: row.get(3)?,
            opportunities_found: row.get(4)?,
            errors: row.get(5)?,
            started_at: row.get(6)?,
            finished_at: row.get(7)?,
            duration_seconds: row.get(8)?,
        })
    }

    #[inline]
    fn row_to_price_point(row: &rusqlite::Row) -> rusqlite::Result<PricePoint> {
        Ok(PricePoint {
            id: row.get(0)?,
            wine_name: row.get(1)?,
            vintage: row.get(2)?,
            price: row.get(3)?,
            currency: row.get(4)?,
            source: row.get(5)?,
            merchant: row.get(6)?,
            country: row.get(7)?,
            recorded_at: row.get(8)?,
        })
    }

    #[inline]
    fn row_to_watch_entry(row: &rusqlite::Row) -> rusqlite::Result<WatchEntry> {
        Ok(WatchEntry {
            id: row.get(0)?,
            wine_name: row.get(1)?,
            region: row.get(2)?,
            target_price: row.get(3)?,
            notes: row.get(4)?,
            active: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

/// Aggregates for the stats endpoint
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub today_opportunities: i64,
    pub total_opportunities: i64,
    pub max_profit_rate: f64,
    pub last_scan: Option<String>,
    pub total_scans: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DATA_SOURCE;

    fn test_opportunity(wine_name: &str, profit_rate: f64) -> Opportunity {
        Opportunity {
            id: None,
            wine_name: wine_name.to_string(),
            vintage: None,
            region: "Bordeaux".to_string(),
            category: "Bordeaux First Growth".to_string(),
            buy_price: 500.0,
            buy_currency: "USD".to_string(),
            buy_merchant: "Millesima".to_string(),
            buy_country: "France".to_string(),
            buy_url: "https://www.wine-searcher.com/find/test/1/a".to_string(),
            sell_price_hk: 900.0,
            total_cost: 519.5,
            shipping_cost: 7.0,
            profit_rate,
            score: 8,
            data_source: DATA_SOURCE.to_string(),
            status: "active".to_string(),
            created_at: None,
        }
    }

    fn test_log(scan_type: &str) -> ScanLog {
        ScanLog {
            id: None,
            scan_type: scan_type.to_string(),
            wines_scanned: 18,
            wines_skipped: 2,
            opportunities_found: 3,
            errors: None,
            started_at: "2026-01-10T08:00:00Z".to_string(),
            finished_at: None,
            duration_seconds: 192.4,
        }
    }

    #[tokio::test]
    async fn test_store_create() {
        let store = DealStore::new(":memory:").expect("Failed to create database");
        let stats = store.stats().expect("Failed to read stats");
        assert_eq!(stats.total_opportunities, 0);
        assert_eq!(stats.total_scans, 0);
        assert!(stats.last_scan.is_none());
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates_in_place() {
        let store = DealStore::new(":memory:").expect("Failed to create database");

        let first = test_opportunity("Chateau Margaux", 42.0);
        let id1 = store.upsert_opportunity(&first).await.expect("insert");

        let mut second = test_opportunity("Chateau Margaux", 55.0);
        second.buy_price = 450.0;
        let id2 = store.upsert_opportunity(&second).await.expect("update");

        assert_eq!(id1, id2);

        let rows = store
            .list_opportunities("active", 0.0, 50)
            .expect("Failed to list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].buy_price, 450.0);
        assert_eq!(rows[0].profit_rate, 55.0);
    }

    #[tokio::test]
    async fn test_list_filters_by_profit_and_orders_desc() {
        let store = DealStore::new(":memory:").expect("Failed to create database");

        for (name, profit) in [("Petrus", 18.0), ("Sassicaia", 61.0), ("Opus One", 33.0)] {
            store
                .upsert_opportunity(&test_opportunity(name, profit))
                .await
                .expect("insert");
        }

        let all = store.list_opportunities("active", 0.0, 50).expect("list");
        let names: Vec<_> = all.iter().map(|o| o.wine_name.as_str()).collect();
        assert_eq!(names, vec!["Sassicaia", "Opus One", "Petrus"]);

        let filtered = store.list_opportunities("active", 30.0, 50).expect("list");
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|o| o.profit_rate >= 30.0));
    }

    #[tokio::test]
    async fn test_get_opportunity_by_id() {
        let store = DealStore::new(":memory:").expect("Failed to create database");

        let id = store
            .upsert_opportunity(&test_opportunity("Dom Perignon", 25.0))
            .await
            .expect("insert");

        let found = store.get_opportunity(id).expect("get").expect("present");
        assert_eq!(found.wine_name, "Dom Perignon");
        assert_eq!(found.score, 8);
        assert!(found.created_at.is_some());

        assert!(store.get_opportunity(id + 999).expect("get").is_none());
    }

    #[tokio::test]
    async fn test_scan_log_roundtrip() {
        let store = DealStore::new(":memory:").expect("Failed to create database");

        store
            .insert_scan_log(&test_log("full"))
            .await
            .expect("insert log");

        let logs = store.scan_logs(10).expect("list logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].scan_type, "full");
        assert_eq!(logs[0].wines_scanned, 18);
        assert_eq!(logs[0].wines_skipped, 2);
        assert!(logs[0].finished_at.is_some());

        store
            .insert_scan_log(&test_log("manual"))
            .await
            .expect("insert log");
        assert_eq!(store.scan_logs(10).expect("list logs").len(), 2);
        assert_eq!(store.scan_logs(1).expect("list logs").len(), 1);
    }

    #[tokio::test]
    async fn test_price_history_substring_match() {
        let store = DealStore::new(":memory:").expect("Failed to create database");

        store
            .insert_price_history(
                "Chateau Margaux",
                "2015",
                512.0,
                "USD",
                DATA_SOURCE,
                "Millesima",
                "France",
            )
            .await
            .expect("insert");
        store
            .insert_price_history("Chateau Latour", "", 640.0, "USD", DATA_SOURCE, "K&L", "USA")
            .await
            .expect("insert");

        let margaux = store.price_history("Margaux", 100).expect("query");
        assert_eq!(margaux.len(), 1);
        assert_eq!(margaux[0].price, 512.0);
        assert_eq!(margaux[0].currency, "USD");

        let chateau = store.price_history("Chateau", 100).expect("query");
        assert_eq!(chateau.len(), 2);

        assert!(store.price_history("Petrus", 100).expect("query").is_empty());
    }

    #[tokio::test]
    async fn test_watchlist_soft_delete() {
        let store = DealStore::new(":memory:").expect("Failed to create database");

        let id1 = store
            .add_watch("Screaming Eagle", Some("USA"), Some(2500.0), None)
            .await
            .expect("add");
        store
            .add_watch("Penfolds Grange", None, None, Some("wait for en primeur"))
            .await
            .expect("add");

        assert_eq!(store.watchlist().expect("list").len(), 2);

        let changed = store.remove_watch(id1).await.expect("remove");
        assert_eq!(changed, 1);

        let remaining = store.watchlist().expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].wine_name, "Penfolds Grange");

        // Removing a missing id is a no-op, not an error
        assert_eq!(store.remove_watch(9999).await.expect("remove"), 0);
    }

    #[tokio::test]
    async fn test_stats_aggregates() {
        let store = DealStore::new(":memory:").expect("Failed to create database");

        store
            .upsert_opportunity(&test_opportunity("Petrus", 48.27))
            .await
            .expect("insert");
        store
            .upsert_opportunity(&test_opportunity("Krug", 21.0))
            .await
            .expect("insert");
        store
            .insert_scan_log(&test_log("full"))
            .await
            .expect("insert log");

        let stats = store.stats().expect("stats");
        assert_eq!(stats.total_opportunities, 2);
        assert_eq!(stats.today_opportunities, 2);
        assert_eq!(stats.max_profit_rate, 48.3);
        assert_eq!(stats.total_scans, 1);
        assert!(stats.last_scan.is_some());
    }

    #[tokio::test]
    async fn test_purge_implausible_rows() {
        let store = DealStore::new(":memory:").expect("Failed to create database");

        store
            .upsert_opportunity(&test_opportunity("Petrus", 48.0))
            .await
            .expect("insert");

        // A corrupt parse that slipped in with an absurd margin
        let mut bogus = test_opportunity("Mouton Rothschild", 1180.0);
        bogus.buy_price = 3.0;
        store.upsert_opportunity(&bogus).await.expect("insert");

        let deleted = store.purge_implausible().expect("purge");
        assert_eq!(deleted, 1);

        let rows = store.list_opportunities("active", 0.0, 50).expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].wine_name, "Petrus");
    }
}
