use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::gateway::types::GatewayError;
use crate::models::AuthTokens;
use crate::services::credentials::CredentialStore;

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// JSON-over-HTTP client for the versioned API root. Attaches the stored
/// bearer token and, on a 401, refreshes the token pair once and retries.
pub struct ApiClient {
    client: Client,
    api_base: String,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(api_base: impl Into<String>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let url = self.url(path);
        let response = self
            .execute(|client| client.get(&url).query(query))
            .await?;
        Self::decode(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self.execute(|client| client.post(&url).json(body)).await?;
        Self::decode(response).await
    }

    /// POST whose response body carries nothing the caller needs.
    pub async fn post_unit<B>(&self, path: &str, body: &B) -> Result<(), GatewayError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(path);
        let response = self.execute(|client| client.post(&url).json(body)).await?;
        Self::check(response).await.map(|_| ())
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self.execute(|client| client.patch(&url).json(body)).await?;
        Self::decode(response).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self.execute(|client| client.put(&url).json(body)).await?;
        Self::decode(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), GatewayError> {
        let url = self.url(path);
        let response = self.execute(|client| client.delete(&url)).await?;
        Self::check(response).await.map(|_| ())
    }

    /// Multipart POST. `form` is called again for the retry because a
    /// multipart body can only be sent once.
    pub async fn post_multipart<F, T>(&self, path: &str, form: F) -> Result<T, GatewayError>
    where
        F: Fn() -> reqwest::multipart::Form + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self
            .execute(|client| client.post(&url).multipart(form()))
            .await?;
        Self::decode(response).await
    }

    async fn execute<F>(&self, build: F) -> Result<Response, GatewayError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let tokens = self.stored_tokens().await;
        let response = self
            .send(&build, tokens.as_ref().map(|t| t.access_token.as_str()))
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(tokens) = tokens else {
            return Ok(response);
        };

        tracing::debug!("Access token rejected, refreshing");
        let refreshed = self.refresh(&tokens.refresh_token).await?;
        self.send(&build, Some(&refreshed.access_token)).await
    }

    async fn send<F>(&self, build: &F, access_token: Option<&str>) -> Result<Response, GatewayError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut request = build(&self.client);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))
    }

    async fn stored_tokens(&self) -> Option<AuthTokens> {
        match self.credentials.load().await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!("Failed to read stored credentials: {}", e);
                None
            }
        }
    }

    /// Exchange the refresh token for a new pair. Any failure ends the
    /// session: stored credentials are dropped and `SessionExpired` returned.
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, GatewayError> {
        let outcome = self
            .client
            .post(self.url("/auth/refresh"))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await;

        let tokens = match outcome {
            Ok(response) if response.status().is_success() => {
                response.json::<AuthTokens>().await.ok()
            }
            Ok(response) => {
                tracing::warn!("Token refresh rejected with HTTP {}", response.status());
                None
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                None
            }
        };

        let Some(tokens) = tokens else {
            if let Err(e) = self.credentials.clear().await {
                tracing::error!("Failed to clear credentials: {}", e);
            }
            return Err(GatewayError::SessionExpired);
        };

        if let Err(e) = self.credentials.store(&tokens).await {
            tracing::error!("Failed to store refreshed credentials: {}", e);
        }
        Ok(tokens)
    }

    async fn check(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = Self::parse_error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized(message),
            StatusCode::NOT_FOUND => GatewayError::NotFound(message),
            _ => GatewayError::RequestFailed {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    fn parse_error_message(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        match parsed.detail {
            serde_json::Value::String(detail) => Some(detail),
            other => Some(other.to_string()),
        }
    }
}
