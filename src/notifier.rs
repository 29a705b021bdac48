//! Telegram notification sink.
//!
//! Disabled (silent no-op) when `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID` are
//! not set. Delivery problems are logged and swallowed; a failed push must
//! never abort a scan.

use crate::catalog;
use crate::models::Opportunity;
use reqwest::Client;
use serde_json::json;
use std::env;
use std::time::Duration;
use tracing::{error, info, warn};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug)]
pub struct TelegramNotifier {
    client: Client,
    bot_token: Option<String>,
    chat_id: Option<String>,
    enabled: bool,
}

impl TelegramNotifier {
    /// Read the bot configuration from the environment.
    pub fn from_env() -> Self {
        let bot_token = env::var("TELEGRAM_BOT_TOKEN").ok().filter(|t| !t.is_empty());
        let chat_id = env::var("TELEGRAM_CHAT_ID").ok().filter(|c| !c.is_empty());

        let enabled = bot_token.is_some() && chat_id.is_some();

        if enabled {
            info!("📱 Telegram notifier initialized");
        } else {
            warn!("📱 Telegram notifier disabled - missing TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID");
        }

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            bot_token,
            chat_id,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Push one opportunity alert. Returns whether the message went out.
    pub async fn notify_opportunity(&self, opp: &Opportunity) -> bool {
        self.send(&format_opportunity_message(opp)).await
    }

    /// Send a raw Markdown message to the configured chat.
    pub async fn send(&self, text: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let (Some(bot_token), Some(chat_id)) = (self.bot_token.as_ref(), self.chat_id.as_ref())
        else {
            return false;
        };

        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API, bot_token);
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!("📱 Telegram notification sent");
                true
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!("📱 Telegram send failed: {} - {}", status, body);
                false
            }
            Err(e) => {
                error!("📱 Telegram send error: {}", e);
                false
            }
        }
    }
}

/// Render the Markdown alert for one opportunity. All figures are USD.
pub fn format_opportunity_message(opp: &Opportunity) -> String {
    let emoji = match opp.category.as_str() {
        catalog::CAT_FIRST_GROWTH => "🏰",
        catalog::CAT_SUPER_SECOND => "🏠",
        catalog::CAT_RIGHT_BANK => "🍇",
        catalog::CAT_GRAND_CRU => "🌟",
        catalog::CAT_ITALIAN_ICON => "🇮🇹",
        catalog::CAT_NEW_WORLD_ICON => "🌍",
        catalog::CAT_CHAMPAGNE => "🍾",
        catalog::CAT_RHONE => "🏔️",
        _ => "🍷",
    };

    let profit_emoji = if opp.profit_rate >= 30.0 { "🔥" } else { "💰" };

    let vintage_line = match &opp.vintage {
        Some(v) if !v.is_empty() => format!("Vintage: {}\n", v),
        _ => String::new(),
    };

    let mut msg = format!(
        "{} *{}*\n\
         {}\
         ━━━━━━━━━━━━━━━━━━━━\n\
         {} *Profit rate: {:.1}%*\n\
         📊 Score: {}/10\n\
         \n\
         💵 Buy price: ${:.0}\n\
         🏪 Merchant: {}\n\
         🌐 Source country: {}\n\
         \n\
         🇭🇰 HK reference: ${:.0}\n\
         📦 Landed cost: ${:.0}\n\
         🚢 Shipping: ${:.0}/bottle\n\
         \n\
         📂 Category: {}\n\
         ━━━━━━━━━━━━━━━━━━━━\n",
        emoji,
        opp.wine_name,
        vintage_line,
        profit_emoji,
        opp.profit_rate,
        opp.score,
        opp.buy_price,
        opp.buy_merchant,
        opp.buy_country,
        opp.sell_price_hk,
        opp.total_cost,
        opp.shipping_cost,
        opp.category,
    );

    if !opp.buy_url.is_empty() {
        msg.push_str(&format!("🔗 [View listing]({})\n", opp.buy_url));
    }

    msg.trim().to_string()
}
