use std::{collections::HashMap, fs, path::Path, time::Duration};

use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_SETTINGS_FILE: &str = "storefront.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_base: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".into(),
            request_timeout_secs: 15,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Parsed base URL with any trailing slash removed from the path.
    pub fn api_base_url(&self) -> Result<Url, ClientError> {
        let trimmed = self.api_base.trim().trim_end_matches('/');
        let url = Url::parse(trimmed)
            .map_err(|err| ClientError::Config(format!("api_base '{trimmed}': {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "api_base '{trimmed}' must use http or https"
            )));
        }
        Ok(url)
    }

    fn apply_file(&mut self, raw: &str) {
        let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("ignoring unreadable settings file: {err}");
                return;
            }
        };

        if let Some(v) = file_cfg.get("api_base").and_then(toml::Value::as_str) {
            self.api_base = v.to_string();
        }
        if let Some(v) = file_cfg
            .get("request_timeout_secs")
            .and_then(toml::Value::as_integer)
        {
            if let Ok(secs) = u64::try_from(v) {
                self.request_timeout_secs = secs;
            }
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("API_BASE") {
            self.api_base = v;
        }
        if let Some(v) = lookup("APP__API_BASE") {
            self.api_base = v;
        }

        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.request_timeout_secs = parsed;
            }
        }
    }
}

/// Defaults, then `storefront.toml` in the working directory, then environment.
pub fn load_settings() -> Settings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> Settings {
    let raw = fs::read_to_string(path).ok();
    settings_from_sources(raw.as_deref(), |key| std::env::var(key).ok())
}

pub(crate) fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();
    if let Some(raw) = file {
        settings.apply_file(raw);
    }
    settings.apply_env(env);
    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
