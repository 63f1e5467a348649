use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::database::Database;

const SETTINGS_KEY: &str = "app_settings";

/// Page sizes and limits the terminal front end passes to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub conversation_page_size: u32,
    pub search_limit: u32,
    pub document_page_size: u32,
    pub news_limit: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            conversation_page_size: 20,
            search_limit: 10,
            document_page_size: 20,
            news_limit: 5,
        }
    }
}

pub struct SettingsService;

impl SettingsService {
    pub async fn load(db: &Database) -> AppSettings {
        match db.get_setting(SETTINGS_KEY).await {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable settings: {}", e);
                AppSettings::default()
            }),
            Ok(None) => AppSettings::default(),
            Err(e) => {
                tracing::warn!("Failed to load settings: {}", e);
                AppSettings::default()
            }
        }
    }

    pub async fn save(db: &Database, settings: &AppSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        db.set_setting(SETTINGS_KEY, &json).await
    }
}
