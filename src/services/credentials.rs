use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use oo7::Keyring;

use crate::config::APP_ID;
use crate::models::AuthTokens;

const KEYRING_ATTR_APP: &str = "application";
const KEYRING_ATTR_REF: &str = "key-ref";
const TOKENS_REF: &str = "auth-tokens";

/// Persists the bearer/refresh token pair between runs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<AuthTokens>>;

    async fn store(&self, tokens: &AuthTokens) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Tokens kept in the desktop Secret Service.
#[derive(Debug, Clone)]
pub struct KeyringCredentials {
    keyring: Arc<Keyring>,
}

impl KeyringCredentials {
    pub async fn new() -> Result<Self> {
        let keyring = Keyring::new()
            .await
            .context("Failed to initialize keyring")?;
        Ok(Self {
            keyring: Arc::new(keyring),
        })
    }

    fn attributes() -> Vec<(&'static str, &'static str)> {
        vec![(KEYRING_ATTR_APP, APP_ID), (KEYRING_ATTR_REF, TOKENS_REF)]
    }
}

#[async_trait]
impl CredentialStore for KeyringCredentials {
    async fn load(&self) -> Result<Option<AuthTokens>> {
        let items = self
            .keyring
            .search_items(&Self::attributes())
            .await
            .context("Failed to search keyring")?;

        let Some(item) = items.first() else {
            return Ok(None);
        };
        let secret = item.secret().await.context("Failed to read secret")?;
        let tokens: AuthTokens = serde_json::from_slice(&secret.to_vec())
            .context("Stored tokens are not valid JSON")?;
        Ok(Some(tokens))
    }

    async fn store(&self, tokens: &AuthTokens) -> Result<()> {
        let secret = serde_json::to_string(tokens)?;
        self.keyring
            .create_item(
                "Insight session tokens",
                &Self::attributes(),
                secret.as_str(),
                true, // replace if exists
            )
            .await
            .context("Failed to store tokens in keyring")?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.keyring
            .delete(&Self::attributes())
            .await
            .context("Failed to delete tokens from keyring")?;
        Ok(())
    }
}

/// Tokens that live only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    tokens: Mutex<Option<AuthTokens>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: AuthTokens) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<AuthTokens>>> {
        self.tokens
            .lock()
            .map_err(|_| anyhow!("credential store lock poisoned"))
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentials {
    async fn load(&self) -> Result<Option<AuthTokens>> {
        Ok(self.slot()?.clone())
    }

    async fn store(&self, tokens: &AuthTokens) -> Result<()> {
        *self.slot()? = Some(tokens.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}
