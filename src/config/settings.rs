use crate::error::{AggregatorError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "AGGR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Name under which the destination credential is registered.
pub const DESTINATION_NAME: &str = "destination";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub to: DestinationConfig,
    #[serde(default)]
    pub from: BTreeMap<String, SourceConfig>,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Clone, Deserialize)]
pub struct DestinationConfig {
    pub token: String,
}

#[derive(Clone, Deserialize)]
pub struct SourceConfig {
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// JSON-lines correlation log; in-memory only when unset.
    pub path: Option<PathBuf>,
}

// Tokens never reach the logs.
impl fmt::Debug for DestinationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationConfig")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// A workspace name paired with its API token.
#[derive(Clone, PartialEq, Eq)]
pub struct WorkspaceCredential {
    pub name: String,
    pub token: String,
}

impl WorkspaceCredential {
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for WorkspaceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceCredential")
            .field("name", &self.name)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.to.token.trim().is_empty() {
            return Err(AggregatorError::Config("to.token is empty".to_string()));
        }
        for (name, source) in &self.from {
            if name.trim().is_empty() {
                return Err(AggregatorError::Config(
                    "source workspace with empty name".to_string(),
                ));
            }
            if source.token.trim().is_empty() {
                return Err(AggregatorError::Config(format!(
                    "from.{}.token is empty",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn destination_credential(&self) -> WorkspaceCredential {
        WorkspaceCredential::new(DESTINATION_NAME, self.to.token.clone())
    }

    /// Source credentials ordered by workspace name.
    pub fn source_credentials(&self) -> Vec<WorkspaceCredential> {
        self.from
            .iter()
            .map(|(name, source)| WorkspaceCredential::new(name.clone(), source.token.clone()))
            .collect()
    }
}

/// Load settings from the file named by `AGGR_CONFIG` (default `config.toml`).
pub fn load_settings() -> Result<Settings> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_settings_from(Path::new(&path))
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AggregatorError::Config(format!(
            "failed to load config from {}: {}",
            path.display(),
            e
        ))
    })?;

    let settings = Settings::from_toml_str(&raw)?;
    tracing::debug!(
        path = %path.display(),
        sources = settings.from.len(),
        "Loaded settings"
    );
    Ok(settings)
}
