//! Wipe command implementation
//!
//! This module implements the `wipe` command, which deletes every synced
//! entity from the storefront. The reset is irreversible, so the command
//! prompts for confirmation and runs under a hard timeout.

use crate::adapters::StorefrontClient;
use crate::config::AppConfig;
use crate::core::wipe_storefront;
use crate::notify::build_notifier;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on a wipe run. A shop large enough to exceed this needs
/// operator attention, not a longer unattended delete loop.
const WIPE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Arguments for the wipe command
#[derive(Args, Debug)]
pub struct WipeArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl WipeArgs {
    /// Execute the wipe command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!("Starting storefront wipe");

        let config = match AppConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Configuration loading failed");
                eprintln!("Configuration error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        // Confirmation prompt (unless --yes)
        if !self.yes {
            println!("This permanently deletes from {}:", config.shop.domain);
            println!("  - all products");
            println!("  - all collections");
            println!("  - all metafield definitions");
            println!("  - all price lists, catalogs, and removable markets");
            println!();
            print!("Proceed with wipe? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Wipe cancelled.");
                return Ok(0);
            }
        }

        let storefront = match StorefrontClient::new(&config.shop) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build storefront client");
                eprintln!("Failed to initialize storefront client: {e}");
                return Ok(4); // Connection error exit code
            }
        };

        let notifier = match build_notifier(&config.notify) {
            Ok(notifier) => notifier,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build notifier");
                eprintln!("Failed to initialize notifier: {e}");
                return Ok(4);
            }
        };

        notifier
            .warning(&format!("Wiping storefront {}", config.shop.domain))
            .await;

        match tokio::time::timeout(WIPE_TIMEOUT, wipe_storefront(storefront)).await {
            Ok(Ok(summary)) => {
                println!("Wipe summary:");
                println!("  Products: {}", summary.products);
                println!("  Collections: {}", summary.collections);
                println!("  Metafield definitions: {}", summary.metafield_definitions);
                println!("  Price lists: {}", summary.price_lists);
                println!("  Catalogs: {}", summary.catalogs);
                println!("  Markets: {}", summary.markets);
                println!("  Total: {}", summary.total());

                notifier
                    .success(&format!(
                        "Storefront wipe finished, {} entities deleted",
                        summary.total()
                    ))
                    .await;
                Ok(0)
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Wipe failed");
                notifier
                    .error(&format!("Storefront wipe failed: {e}"))
                    .await;
                eprintln!("Wipe failed: {e}");
                Ok(5) // Fatal error exit code
            }
            Err(_) => {
                tracing::error!(
                    timeout_secs = WIPE_TIMEOUT.as_secs(),
                    "Wipe timed out"
                );
                notifier
                    .error("Storefront wipe timed out after 30 minutes")
                    .await;
                eprintln!("Wipe timed out after 30 minutes");
                Ok(5)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wipe_args_default_requires_confirmation() {
        let args = WipeArgs { yes: false };
        assert!(!args.yes);
    }

    #[test]
    fn test_wipe_timeout_is_thirty_minutes() {
        assert_eq!(WIPE_TIMEOUT, Duration::from_secs(1_800));
    }
}
