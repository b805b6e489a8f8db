//! Shared fixtures for the storefront capability tests.

use super::client::StorefrontClient;
use crate::config::ShopConfig;
use secrecy::SecretString;

pub(crate) const GRAPHQL_PATH: &str = "/admin/api/2024-07/graphql.json";

pub(crate) fn shop_config(domain: String) -> ShopConfig {
    ShopConfig {
        domain,
        access_token: SecretString::from("shop-token".to_string()),
        api_version: "2024-07".to_string(),
        timeout_ms: 5_000,
    }
}

pub(crate) fn client_for(server: &mockito::Server) -> StorefrontClient {
    StorefrontClient::new(&shop_config(server.url())).unwrap()
}
