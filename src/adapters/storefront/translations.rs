//! Hebrew localization
//!
//! The storefront stores one primary English value per translatable field;
//! Hebrew goes in as a registered translation anchored to the field's
//! current content digest. A missing digest means the field has no English
//! content to translate yet, so those writes are skipped.

use super::client::StorefrontClient;
use super::types::{check_user_errors, TranslatableContentEntry};
use crate::domain::{Result, UserError};
use serde::Deserialize;
use serde_json::json;

const HEBREW_LOCALE: &str = "he";
const SOURCE_LOCALE: &str = "en";

#[derive(Default, Deserialize)]
struct TranslatableResourceData {
    #[serde(default, rename = "translatableResource")]
    translatable_resource: Option<TranslatableResource>,
}

#[derive(Default, Deserialize)]
struct TranslatableResource {
    #[serde(default, rename = "translatableContent")]
    translatable_content: Vec<TranslatableContentEntry>,
}

#[derive(Deserialize)]
struct TranslationsRegisterData {
    #[serde(rename = "translationsRegister")]
    translations_register: TranslationsRegisterPayload,
}

#[derive(Deserialize)]
struct TranslationsRegisterPayload {
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

impl StorefrontClient {
    /// Register `value` as the Hebrew translation of one resource field.
    /// Digest lookup failures are logged and skipped; they must never sink
    /// the surrounding sync.
    pub async fn update_hebrew_translation(
        &self,
        resource_id: &str,
        field_key: &str,
        value: &str,
    ) -> Result<()> {
        let resource_id = resource_id.trim();
        let value = value.trim();
        if resource_id.is_empty() || value.is_empty() {
            return Ok(());
        }

        let digest = match self.translation_digest(resource_id, field_key).await {
            Ok(digest) => digest,
            Err(err) => {
                tracing::warn!(
                    resource_id,
                    field_key,
                    error = %err,
                    "Translation digest lookup failed, skipping translation"
                );
                return Ok(());
            }
        };
        let Some(digest) = digest else {
            return Ok(());
        };

        self.register_translation(resource_id, field_key, value, &digest)
            .await
    }

    /// Digest of the field's English content, the anchor a translation
    /// registers against.
    async fn translation_digest(
        &self,
        resource_id: &str,
        field_key: &str,
    ) -> Result<Option<String>> {
        let query = r#"
            query translatableResource($id: ID!) {
                translatableResource(resourceId: $id) {
                    resourceId
                    translatableContent {
                        key
                        value
                        digest
                        locale
                    }
                }
            }
        "#;
        let data: TranslatableResourceData = self
            .transport
            .execute(query, json!({ "id": resource_id }))
            .await?;

        Ok(data
            .translatable_resource
            .map(|resource| resource.translatable_content)
            .unwrap_or_default()
            .into_iter()
            .find(|entry| {
                entry.key == field_key && entry.locale.eq_ignore_ascii_case(SOURCE_LOCALE)
            })
            .map(|entry| entry.digest.trim().to_string())
            .filter(|digest| !digest.is_empty()))
    }

    async fn register_translation(
        &self,
        resource_id: &str,
        field_key: &str,
        value: &str,
        digest: &str,
    ) -> Result<()> {
        let query = r#"
            mutation translationsRegister($resourceId: ID!, $translations: [TranslationInput!]!) {
                translationsRegister(resourceId: $resourceId, translations: $translations) {
                    translations {
                        key
                        value
                    }
                    userErrors { field message }
                }
            }
        "#;
        let data: TranslationsRegisterData = self
            .transport
            .execute(
                query,
                json!({
                    "resourceId": resource_id,
                    "translations": [{
                        "key": field_key,
                        "value": value,
                        "locale": HEBREW_LOCALE,
                        "translatableContentDigest": digest,
                    }],
                }),
            )
            .await?;
        check_user_errors("translationsRegister", data.translations_register.user_errors)
    }
}

/// A Hebrew translation is worth writing only when both values are present
/// and actually differ.
pub(crate) fn should_update_translation(english: &str, hebrew: &str) -> bool {
    let english = english.trim();
    let hebrew = hebrew.trim();
    !english.is_empty() && !hebrew.is_empty() && !english.eq_ignore_ascii_case(hebrew)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{client_for, GRAPHQL_PATH};
    use super::*;
    use crate::domain::{StorefrontError, SyncError};
    use mockito::Matcher;
    use test_case::test_case;

    #[test_case("Glass Cup", "כוס זכוכית", true; "different values")]
    #[test_case("", "כוס", false; "english missing")]
    #[test_case("Cup", "   ", false; "hebrew missing")]
    #[test_case("Cup", "cup", false; "same ignoring case")]
    #[test_case("Cup", " Cup ", false; "same after trim")]
    fn test_should_update_translation(english: &str, hebrew: &str, expected: bool) {
        assert_eq!(should_update_translation(english, hebrew), expected);
    }

    #[tokio::test]
    async fn test_update_hebrew_translation_registers_against_digest() {
        let mut server = mockito::Server::new_async().await;
        let digest = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("translatableResource".to_string()))
            .with_body(
                json!({
                    "data": {
                        "translatableResource": {
                            "resourceId": "gid://shopify/Product/1",
                            "translatableContent": [
                                {"key": "title", "value": "Glass Cup", "digest": "dig-1", "locale": "en"},
                                {"key": "body_html", "value": "", "digest": "dig-2", "locale": "en"}
                            ]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let register = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::PartialJson(json!({
                "variables": {
                    "resourceId": "gid://shopify/Product/1",
                    "translations": [{
                        "key": "title",
                        "value": "כוס זכוכית",
                        "locale": "he",
                        "translatableContentDigest": "dig-1"
                    }]
                }
            })))
            .with_body(
                json!({
                    "data": {
                        "translationsRegister": {
                            "translations": [{"key": "title", "value": "כוס זכוכית"}],
                            "userErrors": []
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        client
            .update_hebrew_translation("gid://shopify/Product/1", "title", "כוס זכוכית")
            .await
            .unwrap();

        digest.assert_async().await;
        register.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_skips_when_digest_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("translatableResource".to_string()))
            .with_body(
                json!({
                    "data": {
                        "translatableResource": {
                            "resourceId": "gid://shopify/Product/1",
                            "translatableContent": [
                                {"key": "body_html", "value": "x", "digest": "dig-2", "locale": "en"}
                            ]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let register = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("translationsRegister".to_string()))
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        client
            .update_hebrew_translation("gid://shopify/Product/1", "title", "כוס")
            .await
            .unwrap();
        register.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_skips_blank_inputs_without_calls() {
        let mut server = mockito::Server::new_async().await;
        let any = server
            .mock("POST", GRAPHQL_PATH)
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        client.update_hebrew_translation("  ", "title", "כוס").await.unwrap();
        client
            .update_hebrew_translation("gid://shopify/Product/1", "title", "  ")
            .await
            .unwrap();
        any.assert_async().await;
    }

    #[tokio::test]
    async fn test_digest_lookup_failure_is_tolerated() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", GRAPHQL_PATH)
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let client = client_for(&server);
        client
            .update_hebrew_translation("gid://shopify/Product/1", "title", "כוס")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_user_errors_propagate() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("translatableResource".to_string()))
            .with_body(
                json!({
                    "data": {
                        "translatableResource": {
                            "resourceId": "gid://shopify/Product/1",
                            "translatableContent": [
                                {"key": "title", "value": "Cup", "digest": "dig-1", "locale": "en"}
                            ]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("translationsRegister".to_string()))
            .with_body(
                json!({
                    "data": {
                        "translationsRegister": {
                            "translations": [],
                            "userErrors": [{"field": ["translations"], "message": "digest is stale"}]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .update_hebrew_translation("gid://shopify/Product/1", "title", "כוס")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Storefront(StorefrontError::UserErrors(_))
        ));
    }
}
