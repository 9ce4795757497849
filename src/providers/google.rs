use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::Provider;
use crate::errors::ProviderError;
use crate::language_utils::LanguageCode;

/// Separator joining units into one request string
pub const UNIT_SEPARATOR: &str = " ||| ";

/// Token the reply is split on; services may eat the surrounding spaces
const SPLIT_TOKEN: &str = "|||";

/// Google Translate web endpoint client (bulk text, no key)
#[derive(Debug)]
pub struct GoogleTranslate {
    client: Client,
    endpoint: String,
}

impl GoogleTranslate {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Join units for a single request
    pub fn join_units(units: &[String]) -> String {
        units.join(UNIT_SEPARATOR)
    }

    /// Split a reply back into trimmed units
    pub fn split_reply(reply: &str) -> Vec<String> {
        reply.split(SPLIT_TOKEN).map(|unit| unit.trim().to_string()).collect()
    }

    /// Concatenate the translated segments of a `translate_a/single` reply
    fn extract_text(body: &Value) -> Result<String, ProviderError> {
        let segments = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("Missing translation segments".to_string()))?;

        Ok(segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(Value::as_str))
            .collect())
    }
}

#[async_trait]
impl Provider for GoogleTranslate {
    fn name(&self) -> &str {
        "Google Translate"
    }

    async fn translate_units(&self, units: &[String], target: &LanguageCode) -> Result<Vec<String>, ProviderError> {
        let text = Self::join_units(units);
        let target_code = target.to_two_letter().unwrap_or(target.as_str());
        let url = format!("{}/translate_a/single", self.endpoint);

        debug!("Google Translate request: {} units, {} chars", units.len(), text.len());

        let response = self
            .client
            .post(&url)
            .query(&[("client", "gtx"), ("sl", "auto"), ("tl", target_code), ("dt", "t")])
            .form(&[("q", text.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Google Translate error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let body: Value = response.json().await?;
        let translated = Self::extract_text(&body)?;
        Ok(Self::split_reply(&translated))
    }
}
