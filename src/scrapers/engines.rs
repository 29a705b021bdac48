//! Waterfall HTTP fetch engines.
//!
//! The marketplace rate-limits anonymous clients hard, so retrieval runs
//! through an ordered list of engines: a rendering proxy API when a key is
//! configured, a browser-imitation client with cookie warm-up and identity
//! rotation, and a plain request as the last resort. The first engine that
//! returns a 200 body wins. An engine giving up is routine, not an error.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// One client identity: user-agent plus the client-hint headers that browser
/// actually sends (Safari and Firefox send none).
pub struct BrowserIdentity {
    pub user_agent: &'static str,
    pub sec_ch_ua: Option<&'static str>,
    pub platform: Option<&'static str>,
}

pub const BROWSER_IDENTITIES: &[BrowserIdentity] = &[
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        sec_ch_ua: Some(r#""Google Chrome";v="131", "Chromium";v="131", "Not_A Brand";v="24""#),
        platform: Some(r#""macOS""#),
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        sec_ch_ua: Some(r#""Google Chrome";v="131", "Chromium";v="131", "Not_A Brand";v="24""#),
        platform: Some(r#""Windows""#),
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        sec_ch_ua: Some(r#""Google Chrome";v="131", "Chromium";v="131", "Not_A Brand";v="24""#),
        platform: Some(r#""Linux""#),
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.2 Safari/605.1.15",
        sec_ch_ua: None,
        platform: None,
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
        sec_ch_ua: None,
        platform: None,
    },
];

pub fn random_identity() -> &'static BrowserIdentity {
    BROWSER_IDENTITIES
        .choose(&mut rand::thread_rng())
        .unwrap_or(&BROWSER_IDENTITIES[0])
}

/// Sleep a uniformly random number of seconds in [min_secs, max_secs].
/// Keeps fetch traffic looking human-paced.
pub async fn human_delay(min_secs: f64, max_secs: f64) {
    let millis = {
        let mut rng = rand::thread_rng();
        rng.gen_range((min_secs * 1000.0) as u64..=(max_secs * 1000.0) as u64)
    };
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

/// One retrieval strategy in the waterfall.
#[async_trait]
pub trait FetchEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Engines missing a credential report false and are skipped silently.
    fn is_configured(&self) -> bool {
        true
    }

    /// One engine-level try, internal retries included. `None` means this
    /// engine gives up and the waterfall moves on.
    async fn fetch(&self, url: &str) -> Option<String>;
}

// ===== Proxy API engine =====

const SCRAPER_API_ENDPOINT: &str = "https://api.scraperapi.com";

/// Fetches through ScraperAPI's rendering proxy. Only active when an API key
/// is configured.
pub struct ScraperApiEngine {
    api_key: String,
    client: Client,
}

impl ScraperApiEngine {
    pub fn new(api_key: impl Into<String>) -> Self {
        // The proxy fetches upstream on our behalf, so responses are slow.
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key: api_key.into(),
            client,
        }
    }
}

#[async_trait]
impl FetchEngine for ScraperApiEngine {
    fn name(&self) -> &'static str {
        "scraperapi"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        for attempt in 1..=2u32 {
            let result = self
                .client
                .get(SCRAPER_API_ENDPOINT)
                .query(&[
                    ("api_key", self.api_key.as_str()),
                    ("url", url),
                    ("render", "false"),
                ])
                .send()
                .await;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        match resp.text().await {
                            Ok(body) => return Some(body),
                            Err(e) => {
                                warn!("🕸️ scraperapi body read failed: {}", e);
                                return None;
                            }
                        }
                    }
                    if matches!(status.as_u16(), 500 | 502 | 503) {
                        warn!("🕸️ scraperapi {} on attempt {}/2, backing off", status, attempt);
                        human_delay(3.0, 6.0).await;
                        continue;
                    }
                    warn!("🕸️ scraperapi returned {}", status);
                    return None;
                }
                Err(e) => {
                    warn!("🕸️ scraperapi attempt {}/2 failed: {}", attempt, e);
                    human_delay(2.0, 4.0).await;
                }
            }
        }
        None
    }
}

// ===== Browser-imitation engine =====

/// Direct fetch dressed up as a human browsing session: fresh cookie jar per
/// attempt, warm-up request to the landing page, referer-carrying navigation,
/// and a rotated identity after a block.
pub struct BrowserEngine {
    warmup_url: String,
    max_retries: u32,
}

impl BrowserEngine {
    pub fn new(warmup_url: impl Into<String>, max_retries: u32) -> Self {
        Self {
            warmup_url: warmup_url.into(),
            max_retries: max_retries.max(1),
        }
    }

    // Fresh client per attempt: new cookie jar, new identity.
    fn build_client(identity: &BrowserIdentity) -> Option<Client> {
        Client::builder()
            .timeout(Duration::from_secs(30))
            .cookie_store(true)
            .gzip(true)
            .user_agent(identity.user_agent)
            .build()
            .ok()
    }
}

#[async_trait]
impl FetchEngine for BrowserEngine {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        for attempt in 1..=self.max_retries {
            let identity = random_identity();
            let Some(client) = Self::build_client(identity) else {
                warn!("🕸️ browser engine could not build a client");
                return None;
            };

            // Land on the home page first so the real request arrives with
            // session cookies.
            if let Err(e) = client
                .get(&self.warmup_url)
                .timeout(Duration::from_secs(20))
                .send()
                .await
            {
                debug!("🕸️ warm-up request failed, continuing anyway: {}", e);
            }
            human_delay(1.5, 4.0).await;

            let mut request = client
                .get(url)
                .header(
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
                )
                .header("Accept-Language", "en-US,en;q=0.9")
                .header("Referer", format!("{}/", self.warmup_url.trim_end_matches('/')))
                .header("Sec-Fetch-Dest", "document")
                .header("Sec-Fetch-Mode", "navigate")
                .header("Sec-Fetch-Site", "same-origin")
                .header("Sec-Fetch-User", "?1")
                .header("Upgrade-Insecure-Requests", "1")
                .header("Cache-Control", "max-age=0");
            if let Some(hints) = identity.sec_ch_ua {
                request = request
                    .header("Sec-Ch-Ua", hints)
                    .header("Sec-Ch-Ua-Mobile", "?0");
            }
            if let Some(platform) = identity.platform {
                request = request.header("Sec-Ch-Ua-Platform", platform);
            }

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        match resp.text().await {
                            Ok(body) => return Some(body),
                            Err(e) => {
                                warn!("🕸️ browser engine body read failed: {}", e);
                                return None;
                            }
                        }
                    }
                    if status.as_u16() == 403 {
                        warn!(
                            "🕸️ browser engine blocked (403) on attempt {}/{}, rotating identity",
                            attempt, self.max_retries
                        );
                        human_delay(5.0, 12.0).await;
                        continue;
                    }
                    warn!("🕸️ browser engine got {}", status);
                    return None;
                }
                Err(e) => {
                    warn!(
                        "🕸️ browser engine attempt {}/{} failed: {}",
                        attempt, self.max_retries, e
                    );
                    human_delay(3.0, 6.0).await;
                }
            }
        }
        None
    }
}

// ===== Plain engine =====

/// Single bare GET with a rotated user-agent. Works surprisingly often when
/// the fancier engines are throttled.
pub struct PlainEngine {
    client: Client,
}

impl PlainEngine {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }
}

impl Default for PlainEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchEngine for PlainEngine {
    fn name(&self) -> &'static str {
        "plain"
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        let result = self
            .client
            .get(url)
            .header("User-Agent", random_identity().user_agent)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => resp.text().await.ok(),
            Ok(resp) => {
                warn!("🕸️ plain engine got {}", resp.status());
                None
            }
            Err(e) => {
                warn!("🕸️ plain engine failed: {}", e);
                None
            }
        }
    }
}

// ===== Waterfall =====

/// Ordered engine list. Tries each configured engine in turn and returns the
/// first body obtained.
pub struct SmartFetcher {
    engines: Vec<Box<dyn FetchEngine>>,
}

impl SmartFetcher {
    pub fn new(engines: Vec<Box<dyn FetchEngine>>) -> Self {
        Self { engines }
    }

    /// Standard lineup: proxy API, browser imitation (two attempts, identity
    /// rotated after a block), plain request.
    pub fn with_default_engines(scraper_api_key: Option<String>, warmup_url: &str) -> Self {
        Self::new(vec![
            Box::new(ScraperApiEngine::new(scraper_api_key.unwrap_or_default())),
            Box::new(BrowserEngine::new(warmup_url, 2)),
            Box::new(PlainEngine::new()),
        ])
    }

    pub async fn fetch(&self, url: &str) -> Option<String> {
        for engine in &self.engines {
            if !engine.is_configured() {
                debug!("🕸️ {} engine not configured, skipping", engine.name());
                continue;
            }
            debug!("🕸️ trying {} engine for {}", engine.name(), url);
            if let Some(body) = engine.fetch(url).await {
                info!(
                    "🕸️ {} engine fetched {} ({} bytes)",
                    engine.name(),
                    url,
                    body.len()
                );
                return Some(body);
            }
        }
        error!("❌ All fetch engines failed for {}", url);
        None
    }

    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines.iter().map(|e| e.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_pool_shape() {
        assert_eq!(BROWSER_IDENTITIES.len(), 5);
        let chrome_count = BROWSER_IDENTITIES
            .iter()
            .filter(|i| i.sec_ch_ua.is_some())
            .count();
        assert_eq!(chrome_count, 3, "only Chrome identities carry client hints");
        for identity in BROWSER_IDENTITIES {
            assert!(identity.user_agent.starts_with("Mozilla/5.0"));
        }
    }

    #[test]
    fn test_scraperapi_configured_only_with_key() {
        assert!(!ScraperApiEngine::new("").is_configured());
        assert!(ScraperApiEngine::new("abc123").is_configured());
    }

    #[test]
    fn test_default_waterfall_order() {
        let fetcher =
            SmartFetcher::with_default_engines(None, "https://www.wine-searcher.com");
        assert_eq!(fetcher.engine_names(), vec!["scraperapi", "browser", "plain"]);
    }

    #[tokio::test]
    async fn test_human_delay_respects_bounds() {
        let start = std::time::Instant::now();
        human_delay(0.05, 0.1).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_secs(2));
    }
}
