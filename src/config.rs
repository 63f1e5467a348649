use std::path::PathBuf;

use anyhow::{bail, Context, Result};

pub const APP_ID: &str = "com.insight.Insight";
pub const APP_NAME: &str = "Insight";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Versioned path prefix every REST endpoint lives under.
pub const API_PREFIX: &str = "/api/v1";

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// How long the fixture gateway pretends to think.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureLatency {
    Realistic,
    Instant,
}

impl FixtureLatency {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixtureLatency::Realistic => "realistic",
            FixtureLatency::Instant => "instant",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "realistic" => Some(FixtureLatency::Realistic),
            "instant" => Some(FixtureLatency::Instant),
            _ => None,
        }
    }
}

/// Where bearer and refresh tokens are kept between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialBackend {
    Keyring,
    Memory,
}

impl CredentialBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "keyring" => Some(CredentialBackend::Keyring),
            "memory" => Some(CredentialBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub demo_mode: bool,
    pub fixture_latency: FixtureLatency,
    pub credentials: CredentialBackend,
    pub data_dir: PathBuf,
}

impl ClientConfig {
    /// Read configuration from `INSIGHT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("INSIGHT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        url::Url::parse(&api_url)
            .with_context(|| format!("INSIGHT_API_URL is not a valid URL: {}", api_url))?;

        let demo_mode = match lookup("INSIGHT_DEMO_MODE") {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("INSIGHT_DEMO_MODE must be a boolean, got {:?}", raw))?,
            None => true,
        };

        let fixture_latency = match lookup("INSIGHT_FIXTURE_LATENCY") {
            Some(raw) => FixtureLatency::from_str(&raw).with_context(|| {
                format!("INSIGHT_FIXTURE_LATENCY must be realistic or instant, got {:?}", raw)
            })?,
            None => FixtureLatency::Realistic,
        };

        let credentials = match lookup("INSIGHT_CREDENTIALS") {
            Some(raw) => CredentialBackend::from_str(&raw).with_context(|| {
                format!("INSIGHT_CREDENTIALS must be keyring or memory, got {:?}", raw)
            })?,
            None => CredentialBackend::Keyring,
        };

        let data_dir = match lookup("INSIGHT_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir(&lookup)?,
        };

        Ok(Self {
            api_url,
            demo_mode,
            fixture_latency,
            credentials,
            data_dir,
        })
    }

    /// Full URL of the versioned API root, without a trailing slash.
    pub fn api_base(&self) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), API_PREFIX)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("insight.db")
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognized flag value {:?}", other),
    }
}

fn default_data_dir<F>(lookup: &F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match lookup("XDG_DATA_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let home = lookup("HOME").context("Neither XDG_DATA_HOME nor HOME is set")?;
            PathBuf::from(home).join(".local/share")
        }
    };
    Ok(base.join("insight"))
}
