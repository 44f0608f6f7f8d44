use anyhow::{Context, Result};

const DEFAULT_LLM_API_BASE: &str = "https://api.siliconflow.cn/v1";
const PAYPAL_SANDBOX_BASE: &str = "https://api-m.sandbox.paypal.com";
const PAYPAL_LIVE_BASE: &str = "https://api-m.paypal.com";

/// Application configuration loaded from environment variables.
/// Nothing is required for the core pipeline; payment providers are enabled
/// only when all of their keys are present.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub llm_api_base: String,
    /// Server-managed LLM key, offered to premium and pro sessions.
    pub managed_llm_api_key: Option<String>,
    pub llm_timeout_secs: u64,
    pub redis_url: Option<String>,
    pub session_ttl_secs: u64,
    pub free_analysis_limit: u32,
    pub max_upload_bytes: usize,
    pub app_url: String,
    pub stripe: Option<StripeConfig>,
    pub paypal: Option<PayPalConfig>,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub premium_price_id: String,
    pub pro_price_id: String,
    pub single_price_id: String,
}

#[derive(Debug, Clone)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub webhook_id: String,
    pub premium_plan_id: String,
    pub pro_plan_id: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm_api_base: std::env::var("LLM_API_BASE")
                .unwrap_or_else(|_| DEFAULT_LLM_API_BASE.to_string()),
            managed_llm_api_key: optional_env("LLM_API_KEY"),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)?,
            redis_url: optional_env("REDIS_URL"),
            session_ttl_secs: parse_env("SESSION_TTL_SECS", 86_400)?,
            free_analysis_limit: parse_env("FREE_ANALYSIS_LIMIT", 3)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            app_url: std::env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            stripe: stripe_from_env()?,
            paypal: paypal_from_env()?,
        })
    }
}

fn stripe_from_env() -> Result<Option<StripeConfig>> {
    if optional_env("STRIPE_SECRET_KEY").is_none() {
        return Ok(None);
    }
    Ok(Some(StripeConfig {
        secret_key: require_env("STRIPE_SECRET_KEY")?,
        webhook_secret: require_env("STRIPE_WEBHOOK_SECRET")?,
        premium_price_id: require_env("STRIPE_PREMIUM_PRICE_ID")?,
        pro_price_id: require_env("STRIPE_PRO_PRICE_ID")?,
        single_price_id: require_env("STRIPE_SINGLE_PRICE_ID")?,
    }))
}

fn paypal_from_env() -> Result<Option<PayPalConfig>> {
    if optional_env("PAYPAL_CLIENT_ID").is_none() {
        return Ok(None);
    }
    let base_url = match std::env::var("PAYPAL_MODE").as_deref() {
        Ok("live") => PAYPAL_LIVE_BASE,
        _ => PAYPAL_SANDBOX_BASE,
    };
    Ok(Some(PayPalConfig {
        client_id: require_env("PAYPAL_CLIENT_ID")?,
        client_secret: require_env("PAYPAL_CLIENT_SECRET")?,
        base_url: base_url.to_string(),
        webhook_id: require_env("PAYPAL_WEBHOOK_ID")?,
        premium_plan_id: require_env("PAYPAL_PREMIUM_PLAN_ID")?,
        pro_plan_id: require_env("PAYPAL_PRO_PLAN_ID")?,
    }))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Defaults used by handler tests: no managed key, no payment providers.
    pub fn for_tests(llm_api_base: &str) -> Self {
        Config {
            port: 0,
            rust_log: "debug".to_string(),
            llm_api_base: llm_api_base.to_string(),
            managed_llm_api_key: None,
            llm_timeout_secs: 5,
            redis_url: None,
            session_ttl_secs: 60,
            free_analysis_limit: 3,
            max_upload_bytes: 1024 * 1024,
            app_url: "http://localhost:8080".to_string(),
            stripe: None,
            paypal: None,
        }
    }
}
