//! Configuration assembly from environment variables
//!
//! All lookups go through an injectable function so tests can provide
//! variables without touching the process environment. [`AppConfig::from_env`]
//! is the thin production entry point.

use secrecy::SecretString;

use crate::config::schema::{
    AppConfig, ErpConfig, NotifyConfig, NotifyOutput, ShopConfig, SyncConfig,
};
use crate::domain::{Result, SyncError};

const DEFAULT_SHOP_API_VERSION: &str = "2024-07";
const DEFAULT_SHOP_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_ERP_TIMEOUT_MS: u64 = 10_000;

impl AppConfig {
    /// Assembles and validates the configuration from the process
    /// environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Assembles and validates the configuration from the given
    /// variable-lookup function.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] when a required variable is
    /// missing, a value fails to parse, or validation rejects the result.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let shop = ShopConfig {
            domain: required_string(&lookup, "SHOP_DOMAIN")?,
            access_token: SecretString::from(required_string(&lookup, "SHOP_ACCESS_TOKEN")?),
            api_version: string_with_default(&lookup, "SHOP_API_VERSION", DEFAULT_SHOP_API_VERSION),
            timeout_ms: u64_with_default(&lookup, "SHOP_TIMEOUT_MS", DEFAULT_SHOP_TIMEOUT_MS)?,
        };

        let erp = ErpConfig {
            base_url: required_string(&lookup, "ERP_BASE_URL")?,
            token: SecretString::from(required_string(&lookup, "ERP_TOKEN")?),
            timeout_ms: u64_with_default(&lookup, "ERP_TIMEOUT_MS", DEFAULT_ERP_TIMEOUT_MS)?,
        };

        let output = NotifyOutput::parse(&string_with_default(&lookup, "NOTIFY_OUTPUT", "stdout"))
            .map_err(SyncError::Configuration)?;
        let notify = NotifyConfig {
            output,
            telegram_token: optional_string(&lookup, "TELEGRAM_TOKEN").map(SecretString::from),
            telegram_chat_id: optional_string(&lookup, "TELEGRAM_CHAT_ID"),
        };

        let sync = SyncConfig {
            order_add_failure_fatal: bool_with_default(&lookup, "ORDER_ADD_FAILURE_FATAL", false)?,
        };

        let config = AppConfig {
            shop,
            erp,
            notify,
            sync,
        };
        config.validate().map_err(SyncError::Configuration)?;
        Ok(config)
    }
}

fn required_string<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SyncError::Configuration(format!(
            "missing required env var: {key}"
        ))),
    }
}

fn optional_string<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn string_with_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    optional_string(lookup, key).unwrap_or_else(|| default.to_string())
}

fn u64_with_default<F>(lookup: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match optional_string(lookup, key) {
        None => Ok(default),
        Some(value) => value.trim().parse::<u64>().map_err(|err| {
            SyncError::Configuration(format!("invalid integer for {key}: {err}"))
        }),
    }
}

fn bool_with_default<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match optional_string(lookup, key) {
        None => Ok(default),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(SyncError::Configuration(format!(
                "invalid boolean for {key}: '{other}'"
            ))),
        },
    }
}
