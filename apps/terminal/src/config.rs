use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use client_core::ControllerOptions;
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "docchat.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub require_document: bool,
    pub notice_ttl_ms: u64,
    pub success_ttl_ms: u64,
    pub auto_select_latest: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            request_timeout_secs: 60,
            require_document: false,
            notice_ttl_ms: 2500,
            success_ttl_ms: 4000,
            auto_select_latest: false,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            require_document: self.require_document,
            notice_ttl: Duration::from_millis(self.notice_ttl_ms),
            success_ttl: Duration::from_millis(self.success_ttl_ms),
            auto_select_latest: self.auto_select_latest,
        }
    }
}

/// Defaults, then the settings file, then `DOCCHAT_*` / `APP__*` variables.
/// Command-line flags are applied by the caller.
pub fn load_settings(explicit_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = match explicit_path {
        Some(path) => read_settings_file(path)?,
        None => match default_config_paths().into_iter().find(|path| path.is_file()) {
            Some(path) => read_settings_file(&path)?,
            None => Settings::default(),
        },
    };
    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("docchat").join("config.toml"));
    }
    paths
}

fn read_settings_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file '{}'", path.display()))
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    // APP__ wins over DOCCHAT_ when both are set.
    let var = |key: &str| {
        lookup(&format!("APP__{key}")).or_else(|| lookup(&format!("DOCCHAT_{key}")))
    };

    if let Some(v) = var("SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = var("REQUIRE_DOCUMENT").and_then(|v| parse_bool(&v)) {
        settings.require_document = v;
    }
    if let Some(v) = var("NOTICE_TTL_MS").and_then(|v| v.parse().ok()) {
        settings.notice_ttl_ms = v;
    }
    if let Some(v) = var("SUCCESS_TTL_MS").and_then(|v| v.parse().ok()) {
        settings.success_ttl_ms = v;
    }
    if let Some(v) = var("AUTO_SELECT_LATEST").and_then(|v| parse_bool(&v)) {
        settings.auto_select_latest = v;
    }
    if let Some(v) = var("LOG_FILTER") {
        settings.log_filter = v;
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
