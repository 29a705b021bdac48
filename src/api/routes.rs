use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::{self, CatalogItem, PRIORITY_WINES};
use crate::models::{Opportunity, PricePoint, ScanLog, ScanStatus, WatchEntry};
use crate::scanner::{DealScanner, SingleScanResult};
use crate::storage::{DealStore, StoreStats};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DealStore>,
    pub scanner: Arc<DealScanner>,
    pub profit_threshold: f64,
}

/// Create the API router
pub fn create_router(
    store: Arc<DealStore>,
    scanner: Arc<DealScanner>,
    profit_threshold: f64,
) -> Router {
    let state = AppState {
        store,
        scanner,
        profit_threshold,
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/api/stats", get(get_stats))
        .route("/api/opportunities", get(list_opportunities))
        .route("/api/opportunities/:id", get(get_opportunity))
        .route("/api/search", post(search_wine))
        .route("/api/scan", post(trigger_scan))
        .route("/api/scan/status", get(scan_status))
        .route("/api/logs", get(get_logs))
        .route("/api/price-history/:wine_name", get(get_price_history))
        .route("/api/wines", get(get_wines))
        .route("/api/watchlist", get(get_watchlist).post(add_watchlist))
        .route("/api/watchlist/:id", delete(remove_watchlist))
        .with_state(state)
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Dashboard overview: store aggregates plus live scanner state
async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let store = state.store.stats()?;
    Ok(Json(StatsResponse {
        store,
        scanning: state.scanner.is_scanning(),
        priority_wines_count: PRIORITY_WINES.len(),
    }))
}

/// List opportunities, best profit first
async fn list_opportunities(
    State(state): State<AppState>,
    Query(params): Query<OpportunityQuery>,
) -> Result<Json<OpportunitiesResponse>, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let min_profit = params.min_profit.unwrap_or(0.0).max(0.0);
    let status = params.status.unwrap_or_else(|| "active".to_string());

    let opportunities = state.store.list_opportunities(&status, min_profit, limit)?;
    Ok(Json(OpportunitiesResponse {
        total: opportunities.len(),
        opportunities,
    }))
}

/// Single opportunity lookup
async fn get_opportunity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Opportunity>, ApiError> {
    state
        .store
        .get_opportunity(id)?
        .map(Json)
        .ok_or(ApiError::NotFound(format!("Opportunity {} not found", id)))
}

/// Manual single-wine lookup. Runs outside the scheduled scan: no skip
/// cache, no single-flight flag, nothing persisted.
async fn search_wine(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Json<SearchResponse> {
    let wine_name = req.wine_name.trim().to_string();

    // Known catalog wines fill in region/category when the caller omits them
    let known = catalog::find_wine(&wine_name);
    let region = req
        .region
        .or_else(|| known.map(|w| w.region.clone()))
        .unwrap_or_else(|| "default".to_string());
    let category = req
        .category
        .or_else(|| known.map(|w| w.category.clone()))
        .unwrap_or_default();
    let threshold = req.profit_threshold.unwrap_or(state.profit_threshold);

    let result = if wine_name.is_empty() {
        SingleScanResult {
            wine_name: wine_name.clone(),
            found: false,
            global_lowest: None,
            reference_price_usd: None,
            opportunity: None,
        }
    } else {
        let item = CatalogItem::new(&wine_name, &region, &category);
        state.scanner.scan_one(&item, threshold).await
    };

    // Flattened response so the caller gets render-ready numbers
    let buy_price = result
        .global_lowest
        .as_ref()
        .map(|gl| gl.price_usd)
        .unwrap_or(0.0);
    let hk_price = result.reference_price_usd.unwrap_or(0.0);

    let total_cost = if buy_price > 0.0 {
        catalog::total_cost(buy_price, &region)
    } else {
        0.0
    };
    let profit_rate = if total_cost > 0.0 && hk_price > 0.0 {
        ((hk_price - total_cost) / total_cost * 100.0 * 100.0).round() / 100.0
    } else {
        0.0
    };

    let (source_region, source_merchant, buy_url) = match result.global_lowest.as_ref() {
        Some(gl) => (
            gl.quote.country.clone(),
            gl.quote.merchant.clone(),
            gl.quote.url.clone(),
        ),
        None => (String::new(), String::new(), String::new()),
    };

    Json(SearchResponse {
        wine_name: result.wine_name,
        found: result.found,
        global_lowest: buy_price,
        hk_average: hk_price,
        total_cost,
        profit_rate,
        source_region,
        source_merchant,
        shipping_cost: catalog::shipping_cost(&region, true),
        buy_url,
    })
}

/// Kick off a full scan in the background
async fn trigger_scan(
    State(state): State<AppState>,
) -> Result<Json<ScanStartedResponse>, ApiError> {
    if state.scanner.is_scanning() {
        return Err(ApiError::ScanInProgress);
    }

    let scanner = state.scanner.clone();
    let threshold = state.profit_threshold;
    tokio::spawn(async move {
        scanner.run_full_scan(threshold, true).await;
    });

    Ok(Json(ScanStartedResponse {
        status: "started".to_string(),
        message: "Scan started in the background".to_string(),
        total: PRIORITY_WINES.len(),
    }))
}

/// Live scan progress
async fn scan_status(State(state): State<AppState>) -> Json<ScanStatusResponse> {
    let progress = state.scanner.progress();
    Json(ScanStatusResponse {
        scanning: state.scanner.is_scanning(),
        status: progress.status,
        total: progress.total,
        scanned: progress.scanned,
        skipped: progress.skipped,
        found: progress.found,
        errors: progress.errors,
        current_wine: progress.current_wine,
    })
}

/// Recent scan runs with a display-ready duration per row
async fn get_logs(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let logs: Vec<LogRow> = state
        .store
        .scan_logs(limit)?
        .into_iter()
        .map(|log| LogRow {
            duration: format_duration(log.duration_seconds),
            log,
        })
        .collect();

    Ok(Json(LogsResponse {
        total: logs.len(),
        logs,
    }))
}

/// Price observations for one wine (substring match)
async fn get_price_history(
    State(state): State<AppState>,
    Path(wine_name): Path<String>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = params.limit.unwrap_or(100).clamp(1, 500);
    let history = state.store.price_history(&wine_name, limit)?;
    Ok(Json(HistoryResponse {
        wine_name,
        total: history.len(),
        history,
    }))
}

/// The priority catalog, grouped by category
async fn get_wines() -> Json<WinesResponse> {
    Json(WinesResponse {
        total: PRIORITY_WINES.len(),
        categories: group_by_category(&PRIORITY_WINES),
    })
}

// ===== Watchlist =====

async fn get_watchlist(State(state): State<AppState>) -> Result<Json<WatchlistResponse>, ApiError> {
    let watchlist = state.store.watchlist()?;
    Ok(Json(WatchlistResponse {
        total: watchlist.len(),
        watchlist,
    }))
}

async fn add_watchlist(
    State(state): State<AppState>,
    Json(req): Json<WatchRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = state
        .store
        .add_watch(
            &req.wine_name,
            req.region.as_deref(),
            req.target_price,
            req.notes.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "id": id, "status": "added" })))
}

async fn remove_watchlist(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.remove_watch(id).await?;
    Ok(Json(json!({ "status": "removed" })))
}

// ===== Helpers =====

fn group_by_category(wines: &[CatalogItem]) -> BTreeMap<String, Vec<CatalogItem>> {
    let mut categories: BTreeMap<String, Vec<CatalogItem>> = BTreeMap::new();
    for wine in wines {
        categories
            .entry(wine.category.clone())
            .or_default()
            .push(wine.clone());
    }
    categories
}

fn format_duration(seconds: f64) -> String {
    if seconds <= 0.0 {
        return "—".to_string();
    }
    let mins = (seconds / 60.0) as i64;
    let rem = (seconds % 60.0) as i64;
    if mins > 0 {
        format!("{}m {}s", mins, rem)
    } else {
        format!("{}s", rem)
    }
}

// ===== Request/Response Types =====

#[derive(Deserialize)]
struct SearchRequest {
    wine_name: String,
    region: Option<String>,
    category: Option<String>,
    profit_threshold: Option<f64>,
}

#[derive(Serialize)]
struct SearchResponse {
    wine_name: String,
    found: bool,
    global_lowest: f64,
    hk_average: f64,
    total_cost: f64,
    profit_rate: f64,
    source_region: String,
    source_merchant: String,
    shipping_cost: f64,
    buy_url: String,
}

#[derive(Deserialize)]
struct OpportunityQuery {
    limit: Option<usize>,
    min_profit: Option<f64>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct WatchRequest {
    wine_name: String,
    region: Option<String>,
    target_price: Option<f64>,
    notes: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    store: StoreStats,
    scanning: bool,
    priority_wines_count: usize,
}

#[derive(Serialize)]
struct OpportunitiesResponse {
    total: usize,
    opportunities: Vec<Opportunity>,
}

#[derive(Serialize)]
struct ScanStartedResponse {
    status: String,
    message: String,
    total: usize,
}

#[derive(Serialize)]
struct ScanStatusResponse {
    scanning: bool,
    status: ScanStatus,
    total: usize,
    scanned: usize,
    skipped: usize,
    found: usize,
    errors: usize,
    current_wine: String,
}

#[derive(Serialize)]
struct LogRow {
    #[serde(flatten)]
    log: ScanLog,
    duration: String,
}

#[derive(Serialize)]
struct LogsResponse {
    total: usize,
    logs: Vec<LogRow>,
}

#[derive(Serialize)]
struct HistoryResponse {
    wine_name: String,
    total: usize,
    history: Vec<PricePoint>,
}

#[derive(Serialize)]
struct WinesResponse {
    total: usize,
    categories: BTreeMap<String, Vec<CatalogItem>>,
}

#[derive(Serialize)]
struct WatchlistResponse {
    total: usize,
    watchlist: Vec<WatchEntry>,
}

// ===== Error Handling =====

#[derive(Debug)]
enum ApiError {
    Database(anyhow::Error),
    NotFound(String),
    ScanInProgress,
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::ScanInProgress => (
                StatusCode::TOO_MANY_REQUESTS,
                "Scan already in progress".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err = anyhow::anyhow!("Test error");
        let api_err: ApiError = err.into();

        match api_err {
            ApiError::Database(_) => (),
            _ => panic!("Expected Database error"),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "—");
        assert_eq!(format_duration(-3.0), "—");
        assert_eq!(format_duration(45.2), "45s");
        assert_eq!(format_duration(200.7), "3m 20s");
    }

    #[test]
    fn test_wines_group_by_category() {
        let grouped = group_by_category(&PRIORITY_WINES);

        let total: usize = grouped.values().map(|v| v.len()).sum();
        assert_eq!(total, PRIORITY_WINES.len());

        let first_growths = grouped
            .get(catalog::CAT_FIRST_GROWTH)
            .expect("first growths present");
        assert_eq!(first_growths.len(), 5);
    }
}
