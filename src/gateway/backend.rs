use std::sync::Arc;

use super::fixture::FixtureGateway;
use super::http::HttpGateway;
use super::traits::{AdminGateway, AuthGateway, ChatGateway, ResearchGateway};
use crate::config::{ClientConfig, FixtureLatency};
use crate::services::credentials::CredentialStore;

/// One gateway implementation, handed out per API group.
#[derive(Clone)]
pub struct Backend {
    pub chat: Arc<dyn ChatGateway>,
    pub auth: Arc<dyn AuthGateway>,
    pub research: Arc<dyn ResearchGateway>,
    pub admin: Arc<dyn AdminGateway>,
    demo: bool,
}

impl Backend {
    /// Pick the real service or the demo fixtures according to `config`.
    pub fn connect(config: &ClientConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        if config.demo_mode {
            tracing::info!(
                latency = config.fixture_latency.as_str(),
                "Demo mode: serving fixture data"
            );
            Self::fixture(config.fixture_latency)
        } else {
            let api_base = config.api_base();
            tracing::info!(api = %api_base, "Connecting to Insight API");
            Self::http(api_base, credentials)
        }
    }

    pub fn fixture(latency: FixtureLatency) -> Self {
        Self::from_shared(Arc::new(FixtureGateway::new(latency)), true)
    }

    pub fn http(api_base: impl Into<String>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self::from_shared(Arc::new(HttpGateway::new(api_base, credentials)), false)
    }

    fn from_shared<G>(gateway: Arc<G>, demo: bool) -> Self
    where
        G: ChatGateway + AuthGateway + ResearchGateway + AdminGateway + 'static,
    {
        Self {
            chat: gateway.clone(),
            auth: gateway.clone(),
            research: gateway.clone(),
            admin: gateway,
            demo,
        }
    }

    pub fn is_demo(&self) -> bool {
        self.demo
    }
}
