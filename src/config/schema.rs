//! Configuration schema types
//!
//! Typed configuration for the two remote collaborators, the notification
//! sink, and sync behavior toggles. Values are assembled from environment
//! variables by the loader; each section validates itself.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

/// Notification sink selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyOutput {
    /// Log-only notifications
    #[default]
    Stdout,
    /// Telegram bot messages only
    Telegram,
    /// Both stdout and Telegram
    Multi,
    /// Discard all notifications
    None,
}

impl NotifyOutput {
    /// Parses a sink name, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "" | "stdout" => Ok(NotifyOutput::Stdout),
            "telegram" => Ok(NotifyOutput::Telegram),
            "multi" => Ok(NotifyOutput::Multi),
            "none" => Ok(NotifyOutput::None),
            other => Err(format!(
                "Invalid NOTIFY_OUTPUT '{other}'. Must be one of: stdout, telegram, multi, none"
            )),
        }
    }

    /// True when this sink needs Telegram credentials.
    pub fn requires_telegram(&self) -> bool {
        matches!(self, NotifyOutput::Telegram | NotifyOutput::Multi)
    }
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Storefront (Shopify Admin API) settings
    pub shop: ShopConfig,

    /// ERP service settings
    pub erp: ErpConfig,

    /// Notification sink settings
    pub notify: NotifyConfig,

    /// Sync behavior toggles
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.shop.validate()?;
        self.erp.validate()?;
        self.notify.validate()?;
        Ok(())
    }
}

/// Storefront Admin API configuration
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// Shop domain, with or without an `https://` scheme
    pub domain: String,

    /// Admin API access token
    pub access_token: SecretString,

    /// Admin API version segment of the endpoint path
    pub api_version: String,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl ShopConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<(), String> {
        if self.domain.trim().is_empty() {
            return Err("SHOP_DOMAIN cannot be empty".to_string());
        }
        if self.access_token.expose_secret().trim().is_empty() {
            return Err("SHOP_ACCESS_TOKEN cannot be empty".to_string());
        }
        if self.api_version.trim().is_empty() {
            return Err("SHOP_API_VERSION cannot be empty".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("SHOP_TIMEOUT_MS must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// ERP HTTP service configuration
#[derive(Debug, Clone)]
pub struct ErpConfig {
    /// Base URL of the ERP bridge service
    pub base_url: String,

    /// Bearer value sent as the `Authorization` header
    pub token: SecretString,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl ErpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("ERP_BASE_URL cannot be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("ERP_BASE_URL must start with http:// or https://".to_string());
        }
        if self.token.expose_secret().trim().is_empty() {
            return Err("ERP_TOKEN cannot be empty".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("ERP_TIMEOUT_MS must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Notification sink configuration
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Which sink receives operator notifications
    pub output: NotifyOutput,

    /// Telegram bot token (required for telegram/multi)
    pub telegram_token: Option<SecretString>,

    /// Telegram chat id (required for telegram/multi)
    pub telegram_chat_id: Option<String>,
}

impl NotifyConfig {
    fn validate(&self) -> Result<(), String> {
        if self.output.requires_telegram() {
            let has_token = self
                .telegram_token
                .as_ref()
                .map(|t| !t.expose_secret().trim().is_empty())
                .unwrap_or(false);
            let has_chat = self
                .telegram_chat_id
                .as_ref()
                .map(|c| !c.trim().is_empty())
                .unwrap_or(false);
            if !has_token || !has_chat {
                return Err(
                    "TELEGRAM_TOKEN and TELEGRAM_CHAT_ID are required when NOTIFY_OUTPUT is 'telegram' or 'multi'"
                        .to_string(),
                );
            }
        }
        Ok(())
    }
}

/// Sync behavior toggles
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// When true, a failure to attach a product to a collection during the
    /// ordering flow fails the category instead of logging a warning.
    pub order_add_failure_fatal: bool,
}
