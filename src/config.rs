use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use dotenvy::dotenv;
use thiserror::Error;
use url::Url;

/// Which marketing platform adapter handles contact syncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketingPlatformKind {
    Brevo,
    ActiveCampaign,
}

impl FromStr for MarketingPlatformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "brevo" => Ok(Self::Brevo),
            "activecampaign" | "active-campaign" => Ok(Self::ActiveCampaign),
            other => Err(format!("unknown marketing platform: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind host (e.g., 0.0.0.0)
    pub app_host: String,
    /// HTTP bind port (e.g., 8080)
    pub app_port: u16,

    /// Adapter selection for contact syncs. Defaults to Brevo.
    pub marketing_platform: MarketingPlatformKind,

    /// Brevo API base (overridable for local testing).
    pub brevo_base_url: Url,
    pub brevo_api_key: Option<String>,

    /// ActiveCampaign account base URL (e.g., https://acme.api-us1.com).
    pub activecampaign_base_url: Option<Url>,
    pub activecampaign_api_token: Option<String>,
    /// Attribute name → ActiveCampaign custom field id, e.g.
    /// `AC_FIELD_IDS=QUIZ_TYPE=1,QUIZ_RESULT=2`. Attributes without a
    /// mapping are dropped by the adapter.
    pub activecampaign_field_ids: BTreeMap<String, String>,

    /// List receiving newsletter and quiz contacts.
    pub newsletter_list_id: String,
    /// List receiving application-form contacts.
    pub application_list_id: String,

    /// Apps Script webhook that appends a row per submission.
    pub sheets_webhook_url: Option<Url>,

    pub telegram_base_url: Url,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,

    pub tidycal_base_url: Url,
    pub tidycal_api_key: Option<String>,

    pub supabase_url: Option<Url>,
    pub supabase_service_role_key: Option<String>,

    /// File holding the booking-check watermark.
    pub booking_watermark_path: PathBuf,
    /// Recency window for the first booking check, before a watermark exists.
    pub booking_window_minutes: i64,

    /// Sender and recipient of application notification mail.
    pub notify_from_name: String,
    pub notify_from_email: Option<String>,
    pub notify_to_name: String,
    pub notify_to_email: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL for {name}: {value}")]
    InvalidUrl { name: &'static str, value: String },
    #[error("Invalid number for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("General error: {0}")]
    Other(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env if present
        let _ = dotenv();

        let app_host = env_or_default("APP_HOST", "0.0.0.0");
        let app_port = parse_or_default::<u16>("APP_PORT", 8080)?;

        let marketing_platform = match env::var("MARKETING_PLATFORM") {
            Ok(v) => v.parse().map_err(ConfigError::Other)?,
            Err(_) => MarketingPlatformKind::Brevo,
        };

        let brevo_base_url = parse_url_or_default("BREVO_BASE_URL", "https://api.brevo.com")?;
        let brevo_api_key = env::var("BREVO_API_KEY").ok();

        let activecampaign_base_url = parse_url_optional("AC_BASE_URL")?;
        let activecampaign_api_token = env::var("AC_API_TOKEN").ok();
        let activecampaign_field_ids = parse_pairs(&env::var("AC_FIELD_IDS").unwrap_or_default());

        let newsletter_list_id = env_or_default("NEWSLETTER_LIST_ID", "2");
        let application_list_id = env_or_default("APPLICATION_LIST_ID", "8");

        let sheets_webhook_url = parse_url_optional("GOOGLE_SHEETS_WEBHOOK")?;

        let telegram_base_url =
            parse_url_or_default("TELEGRAM_BASE_URL", "https://api.telegram.org")?;
        let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN").ok();
        let telegram_chat_id = env::var("TELEGRAM_CHAT_ID").ok();

        let tidycal_base_url = parse_url_or_default("TIDYCAL_BASE_URL", "https://tidycal.com")?;
        let tidycal_api_key = env::var("TIDYCAL_API_KEY").ok();

        let supabase_url = parse_url_optional("SUPABASE_URL")?;
        let supabase_service_role_key = env::var("SUPABASE_SERVICE_ROLE_KEY").ok();

        let booking_watermark_path = PathBuf::from(env_or_default(
            "BOOKING_WATERMARK_PATH",
            ".booking_watermark.json",
        ));
        let booking_window_minutes = parse_or_default::<i64>("BOOKING_WINDOW_MINUTES", 10)?;

        let notify_from_name = env_or_default("NOTIFY_FROM_NAME", "Website application");
        let notify_from_email = env::var("NOTIFY_FROM_EMAIL").ok();
        let notify_to_name = env_or_default("NOTIFY_TO_NAME", "Site owner");
        let notify_to_email = env::var("NOTIFY_TO_EMAIL").ok();

        Ok(Self {
            app_host,
            app_port,
            marketing_platform,
            brevo_base_url,
            brevo_api_key,
            activecampaign_base_url,
            activecampaign_api_token,
            activecampaign_field_ids,
            newsletter_list_id,
            application_list_id,
            sheets_webhook_url,
            telegram_base_url,
            telegram_bot_token,
            telegram_chat_id,
            tidycal_base_url,
            tidycal_api_key,
            supabase_url,
            supabase_service_role_key,
            booking_watermark_path,
            booking_window_minutes,
            notify_from_name,
            notify_from_email,
            notify_to_name,
            notify_to_email,
        })
    }
}

/* --------------------------- helpers --------------------------- */

fn env_or_default(key: &'static str, default: &'static str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or_default<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(v) => v.parse::<T>().map_err(|_| ConfigError::InvalidNumber {
            name: key,
            value: v,
        }),
        Err(_) => Ok(default),
    }
}

fn parse_url_or_default(key: &'static str, default: &'static str) -> Result<Url, ConfigError> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|_| ConfigError::InvalidUrl {
        name: key,
        value: raw,
    })
}

fn parse_url_optional(key: &'static str) -> Result<Option<Url>, ConfigError> {
    match env::var(key) {
        Ok(raw) => Url::parse(&raw)
            .map(Some)
            .map_err(|_| ConfigError::InvalidUrl {
                name: key,
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

/// Parse a `KEY=value,KEY=value` list. Entries without `=` are skipped.
fn parse_pairs(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            let key = key.trim();
            let value = value.trim();
            (!key.is_empty() && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
impl Config {
    /// Minimal config for route/handler tests; individual tests override the
    /// providers they exercise.
    pub(crate) fn for_tests() -> Self {
        Self {
            app_host: "127.0.0.1".into(),
            app_port: 0,
            marketing_platform: MarketingPlatformKind::Brevo,
            brevo_base_url: Url::parse("http://127.0.0.1:1").unwrap(),
            brevo_api_key: None,
            activecampaign_base_url: None,
            activecampaign_api_token: None,
            activecampaign_field_ids: BTreeMap::new(),
            newsletter_list_id: "2".into(),
            application_list_id: "8".into(),
            sheets_webhook_url: None,
            telegram_base_url: Url::parse("http://127.0.0.1:1").unwrap(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            tidycal_base_url: Url::parse("http://127.0.0.1:1").unwrap(),
            tidycal_api_key: None,
            supabase_url: None,
            supabase_service_role_key: None,
            booking_watermark_path: PathBuf::from(".booking_watermark.json"),
            booking_window_minutes: 10,
            notify_from_name: "Website application".into(),
            notify_from_email: None,
            notify_to_name: "Site owner".into(),
            notify_to_email: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pairs_splits_entries() {
        let pairs = parse_pairs("QUIZ_TYPE=1, QUIZ_RESULT=2");
        assert_eq!(pairs.get("QUIZ_TYPE").map(String::as_str), Some("1"));
        assert_eq!(pairs.get("QUIZ_RESULT").map(String::as_str), Some("2"));
    }

    #[test]
    fn parse_pairs_skips_malformed_entries() {
        let pairs = parse_pairs("QUIZ_TYPE,=3,OFFER=9");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs.get("OFFER").map(String::as_str), Some("9"));
    }

    #[test]
    fn platform_kind_parses_both_spellings() {
        assert_eq!(
            "activecampaign".parse::<MarketingPlatformKind>().unwrap(),
            MarketingPlatformKind::ActiveCampaign
        );
        assert_eq!(
            "Brevo".parse::<MarketingPlatformKind>().unwrap(),
            MarketingPlatformKind::Brevo
        );
        assert!("mailchimp".parse::<MarketingPlatformKind>().is_err());
    }
}
