use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;

use super::credentials::CredentialStore;
use super::database::Database;
use crate::gateway::{AuthGateway, GatewayError};
use crate::models::{AuthResponse, User};

const PROFILE_KEY: &str = "auth_profile";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Who is signed in. Tokens go to the credential store, the profile to
/// the local settings table so it survives a restart.
pub struct SessionStore {
    auth: Arc<dyn AuthGateway>,
    credentials: Arc<dyn CredentialStore>,
    db: Database,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        credentials: Arc<dyn CredentialStore>,
        db: Database,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            auth,
            credentials,
            db,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    /// Bring back the profile saved by an earlier run. A profile without
    /// stored tokens is stale and gets dropped.
    pub async fn restore(&self) -> Result<bool> {
        let Some(json) = self.db.get_setting(PROFILE_KEY).await? else {
            return Ok(false);
        };

        let user: User = match serde_json::from_str(&json) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Discarding unreadable saved profile: {}", e);
                self.db.delete_setting(PROFILE_KEY).await?;
                return Ok(false);
            }
        };

        if self.credentials.load().await?.is_none() {
            tracing::info!("Saved profile has no tokens, signing out");
            self.db.delete_setting(PROFILE_KEY).await?;
            return Ok(false);
        }

        tracing::info!(email = %user.email, "Restored session");
        self.state.send_modify(|s| {
            s.user = Some(user);
            s.is_authenticated = true;
        });
        Ok(true)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, GatewayError> {
        self.begin();
        let result = self.auth.login(email, password).await;
        self.finish_sign_in(result, "Login failed").await
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        company_name: Option<&str>,
    ) -> Result<User, GatewayError> {
        self.begin();
        let result = self.auth.register(email, password, company_name).await;
        self.finish_sign_in(result, "Registration failed").await
    }

    /// Local sign-out; the server keeps no session to end.
    pub async fn logout(&self) {
        self.forget().await;
        self.state.send_replace(SessionState::default());
        tracing::info!("Signed out");
    }

    /// Sign out after the server refused to refresh the session.
    pub async fn expire(&self) {
        self.forget().await;
        self.state.send_replace(SessionState {
            error: Some(GatewayError::SessionExpired.to_string()),
            ..SessionState::default()
        });
        tracing::warn!("Session expired");
    }

    /// Re-read the profile from the server. Any failure signs the user out
    /// of the local view.
    pub async fn refresh_user(&self) {
        match self.auth.current_user().await {
            Ok(user) => {
                self.persist_profile(&user).await;
                self.state.send_modify(|s| {
                    s.user = Some(user);
                    s.is_authenticated = true;
                });
            }
            Err(GatewayError::SessionExpired) => self.expire().await,
            Err(e) => {
                tracing::warn!("Failed to refresh profile: {}", e);
                self.state.send_modify(|s| {
                    s.user = None;
                    s.is_authenticated = false;
                });
            }
        }
    }

    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), GatewayError> {
        let result = self.auth.change_password(current, new).await;
        match &result {
            Ok(()) => tracing::info!("Password changed"),
            Err(e) => {
                let message = e.to_string();
                self.state.send_modify(|s| s.error = Some(message));
            }
        }
        result
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    async fn finish_sign_in(
        &self,
        result: Result<AuthResponse, GatewayError>,
        action: &str,
    ) -> Result<User, GatewayError> {
        match result {
            Ok(AuthResponse { user, tokens }) => {
                if let Err(e) = self.credentials.store(&tokens).await {
                    tracing::error!("Failed to store credentials: {}", e);
                }
                self.persist_profile(&user).await;
                tracing::info!(email = %user.email, admin = user.is_admin, "Signed in");
                self.state.send_replace(SessionState {
                    user: Some(user.clone()),
                    is_authenticated: true,
                    is_loading: false,
                    error: None,
                });
                Ok(user)
            }
            Err(e) => {
                tracing::warn!("{}: {}", action, e);
                let message = format!("{}: {}", action, e);
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.error = Some(message);
                });
                Err(e)
            }
        }
    }

    async fn persist_profile(&self, user: &User) {
        let saved = match serde_json::to_string(user) {
            Ok(json) => self.db.set_setting(PROFILE_KEY, &json).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = saved {
            tracing::error!("Failed to save profile: {}", e);
        }
    }

    async fn forget(&self) {
        if let Err(e) = self.credentials.clear().await {
            tracing::error!("Failed to clear credentials: {}", e);
        }
        if let Err(e) = self.db.delete_setting(PROFILE_KEY).await {
            tracing::error!("Failed to delete saved profile: {}", e);
        }
    }
}
