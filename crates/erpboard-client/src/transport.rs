//! HTTP transport backed by reqwest

use async_trait::async_trait;
use erpboard_config::ErpConfig;
use std::time::Duration;

use crate::{ClientError, ErpTransport};

/// Longest server message kept in an error
const MAX_ERROR_BODY: usize = 500;

/// HTTP client for the ERP REST API
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_key_param: String,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        api_key: &str,
        api_key_param: &str,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Setup {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_key_param: api_key_param.to_string(),
        })
    }

    pub fn from_config(config: &ErpConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.base_url,
            &config.api_key,
            &config.api_key_param,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ErpTransport for HttpTransport {
    async fn get(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut query = params.to_vec();
        if !self.api_key.is_empty() {
            query.push((self.api_key_param.clone(), self.api_key.clone()));
        }

        log::debug!(target: "erpboard::client", "GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(&query)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ClientError::Network {
                resource: path.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = server_message(&body);
            log::warn!(target: "erpboard::client", "HTTP {} for {}: {}", status, url, message);
            return Err(ClientError::Http {
                status: status.as_u16(),
                resource: path.to_string(),
                message,
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ClientError::Decode {
                resource: path.to_string(),
                message: e.to_string(),
            })
    }
}

/// Pull a readable message out of an error body: the `message` or
/// `error` field of a JSON object, otherwise the (truncated) raw text.
pub fn server_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error", "detail"] {
            if let Some(serde_json::Value::String(text)) = map.get(key) {
                return text.clone();
            }
        }
    }
    body.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_prefers_json_fields() {
        assert_eq!(server_message(r#"{"message":"invalid key"}"#), "invalid key");
        assert_eq!(server_message(r#"{"error":"gone"}"#), "gone");
        assert_eq!(server_message("plain failure"), "plain failure");
    }

    #[test]
    fn test_server_message_truncates() {
        let body = "x".repeat(2000);
        assert_eq!(server_message(&body).len(), MAX_ERROR_BODY);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport =
            HttpTransport::new("http://erp.local/api/", "k", "api_key", Duration::from_secs(5))
                .unwrap();
        assert_eq!(transport.base_url(), "http://erp.local/api");
    }
}
