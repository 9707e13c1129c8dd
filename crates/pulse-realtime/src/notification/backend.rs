//! HTTP token registration against the application backend.

use async_trait::async_trait;
use serde::Serialize;

use pulse_core::error::AppError;
use pulse_core::result::AppResult;
use pulse_core::traits::TokenBackend;
use pulse_core::types::NotificationToken;

/// Request body sent to the registration endpoint.
#[derive(Debug, Serialize)]
struct RegisterTokenRequest<'a> {
    token: &'a str,
}

/// Registers device tokens by POSTing them to a backend endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenBackend {
    /// HTTP client.
    client: reqwest::Client,
    /// Registration endpoint URL.
    endpoint: String,
}

impl HttpTokenBackend {
    /// Create a backend for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    /// Create a backend with a preconfigured client.
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TokenBackend for HttpTokenBackend {
    async fn register_token(&self, token: &NotificationToken) -> AppResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RegisterTokenRequest {
                token: token.as_str(),
            })
            .send()
            .await
            .map_err(|e| AppError::token_registration(format!("Token registration request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::token_registration(format!(
                "Backend rejected token registration with status {status}"
            )));
        }

        tracing::debug!("Token registration accepted by {}", self.endpoint);
        Ok(())
    }
}
