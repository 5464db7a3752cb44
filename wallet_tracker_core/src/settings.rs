use crate::error::CoreError;
use crate::models::AccountSwitchPolicy;
use serde::{Deserialize, Serialize};

/// Environment variable names used by the original web app. Honoured as
/// fallbacks when the `WALLET_TRACKER_*` variables are not set.
pub const LEGACY_WRITE_KEY_VAR: &str = "NEXT_PUBLIC_FORMO_WRITE_KEY";
pub const LEGACY_CLIENT_ID_VAR: &str = "NEXT_PUBLIC_THIRDWEB_CLIENT_ID";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Analytics write key. Without it no sink is created.
    #[serde(default)]
    pub write_key: Option<String>,
    /// Wallet SDK client id. Without it the wallet collaborator is disabled.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Initial consent when no preference has been persisted yet
    #[serde(default = "default_tracking")]
    pub tracking: bool,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_logger_enabled")]
    pub logger_enabled: bool,
    #[serde(default = "default_logger_levels")]
    pub logger_levels: Vec<String>,
    #[serde(default = "default_chain_id")]
    pub default_chain_id: u64,
    #[serde(default = "default_supported_chains")]
    pub supported_chains: Vec<u64>,
    #[serde(default)]
    pub account_switch: AccountSwitchPolicy,
    #[serde(default = "default_recent_events_capacity")]
    pub recent_events_capacity: usize,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            write_key: None,
            client_id: None,
            tracking: default_tracking(),
            flush_interval_ms: default_flush_interval_ms(),
            logger_enabled: default_logger_enabled(),
            logger_levels: default_logger_levels(),
            default_chain_id: default_chain_id(),
            supported_chains: default_supported_chains(),
            account_switch: AccountSwitchPolicy::default(),
            recent_events_capacity: default_recent_events_capacity(),
            storage_dir: default_storage_dir(),
            storage_prefix: default_storage_prefix(),
        }
    }
}

impl Settings {
    /// Load from an optional TOML file overlaid with `WALLET_TRACKER_*`
    /// environment variables.
    #[cfg(feature = "native")]
    pub fn load(path: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("WALLET_TRACKER")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("logger_levels")
                    .with_list_parse_key("supported_chains"),
            );
        let cfg = builder.build()?;
        let mut settings: Settings = cfg.try_deserialize()?;
        settings.apply_legacy_env();
        Ok(settings)
    }

    #[cfg(feature = "native")]
    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    #[cfg(feature = "native")]
    pub fn save_to_file(&self, path: &str) -> Result<(), CoreError> {
        let toml_string = toml::to_string(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    #[cfg(feature = "native")]
    fn apply_legacy_env(&mut self) {
        if self.write_key.is_none() {
            self.write_key = non_empty_env(LEGACY_WRITE_KEY_VAR);
        }
        if self.client_id.is_none() {
            self.client_id = non_empty_env(LEGACY_CLIENT_ID_VAR);
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_toml(&self) -> Result<String, CoreError> {
        Ok(toml::to_string(self)?)
    }

    pub fn write_key(&self) -> Option<&str> {
        self.write_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn is_supported_chain(&self, chain_id: u64) -> bool {
        self.supported_chains.contains(&chain_id)
    }

    /// Most verbose level listed in `logger_levels`, or `None` when logging
    /// is disabled.
    pub fn max_log_level(&self) -> Option<log::LevelFilter> {
        if !self.logger_enabled {
            return None;
        }
        self.logger_levels
            .iter()
            .filter_map(|l| l.parse::<log::LevelFilter>().ok())
            .max()
    }

    /// Validate settings ranges and constraints
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.flush_interval_ms == 0 {
            return Err(CoreError::Validation("flush_interval_ms must be > 0".to_string()));
        }
        if self.recent_events_capacity == 0 {
            return Err(CoreError::Validation("recent_events_capacity must be > 0".to_string()));
        }
        if self.supported_chains.is_empty() {
            return Err(CoreError::Validation("supported_chains must not be empty".to_string()));
        }
        if let Some(level) = self
            .logger_levels
            .iter()
            .find(|l| !LOG_LEVELS.contains(&l.to_ascii_lowercase().as_str()))
        {
            return Err(CoreError::Validation(format!("unknown logger level: {}", level)));
        }
        Ok(())
    }
}

#[cfg(feature = "native")]
fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn default_tracking() -> bool { true }
fn default_flush_interval_ms() -> u64 { 5000 }
fn default_logger_enabled() -> bool { true }
fn default_logger_levels() -> Vec<String> {
    vec!["error".to_string(), "warn".to_string(), "info".to_string()]
}
fn default_chain_id() -> u64 { 1 }
fn default_supported_chains() -> Vec<u64> { vec![1, 137] }
fn default_recent_events_capacity() -> usize { 50 }
fn default_storage_dir() -> String { ".wallet_tracker".to_string() }
fn default_storage_prefix() -> String { "wallet_tracker_".to_string() }
