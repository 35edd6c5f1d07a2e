//! OAuth2 client-credentials token provider.

use crate::error::ClientError;
use liftcall_core::CredentialsConfig;
use serde::Deserialize;
use tracing::info;

/// Bearer token issued by the token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessToken {
    /// Token value
    pub access_token: String,
    /// Usually `Bearer`
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Exchanges client credentials for scoped bearer tokens
#[derive(Debug, Clone)]
pub struct TokenProvider {
    http: reqwest::Client,
    token_url: String,
}

impl TokenProvider {
    /// Provider for the token endpoint of `api_host`
    pub fn new(api_host: &str) -> Self {
        Self::with_token_url(format!("https://{api_host}/api/v2/oauth2/token"))
    }

    /// Provider for an explicit token URL
    pub fn with_token_url(token_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: token_url.into(),
        }
    }

    /// Token endpoint in use
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Request a token for `scopes`.
    pub async fn fetch(
        &self,
        credentials: &CredentialsConfig,
        scopes: &[String],
    ) -> Result<AccessToken, ClientError> {
        let scope = scopes.join(" ");
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", scope.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Credential(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: AccessToken = response.json().await?;
        if token.access_token.is_empty() {
            return Err(ClientError::Credential(
                "token endpoint returned an empty access token".to_string(),
            ));
        }
        info!(%scope, expires_in = ?token.expires_in, "AccessToken successfully fetched");
        Ok(token)
    }
}
