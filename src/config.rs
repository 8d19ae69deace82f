//! Runtime configuration, read from `siakad.toml` and the environment.

use crate::portal::Credentials;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Optional file merged beneath environment variables.
pub const CONFIG_FILE: &str = "siakad.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Extract(#[from] Box<figment::Error>),
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("BASE_URL is not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Clone, Deserialize)]
pub struct Config {
    /// Portal root, e.g. `https://siakad.example.ac.id`.
    #[serde(default)]
    pub base_url: String,
    #[serde(rename = "user_siakad", default)]
    pub username: String,
    #[serde(rename = "password_siakad", default)]
    pub password: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
    #[serde(default = "default_track_file")]
    pub track_file: PathBuf,
    #[serde(default = "default_json_dir")]
    pub json_dir: PathBuf,
    #[serde(default = "default_excel_dir")]
    pub excel_dir: PathBuf,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_ip_echo_url")]
    pub ip_echo_url: String,
    /// Study-mode code sent when selecting a track (`pk`).
    #[serde(default = "default_study_mode")]
    pub study_mode: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_file() -> PathBuf {
    PathBuf::from("cookie.txt")
}

fn default_track_file() -> PathBuf {
    PathBuf::from("jurusan.json")
}

fn default_json_dir() -> PathBuf {
    PathBuf::from("nilai_json")
}

fn default_excel_dir() -> PathBuf {
    PathBuf::from("nilai_excel")
}

fn default_workers() -> usize {
    crate::scraper::WORKER_COUNT
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_ip_echo_url() -> String {
    crate::portal::auth::DEFAULT_IP_ECHO_URL.to_string()
}

fn default_study_mode() -> String {
    crate::scraper::DEFAULT_MODE.to_string()
}

impl Config {
    /// Load from [`CONFIG_FILE`] (if present) and the environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Figment::new().merge(Toml::file(CONFIG_FILE)).merge(Env::raw()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract().map_err(Box::new)?;
        config.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if self.base_url.is_empty() {
            return Err(ConfigError::Missing("BASE_URL"));
        }
        url::Url::parse(&self.base_url)?;
        if self.username.trim().is_empty() {
            return Err(ConfigError::Missing("USER_SIAKAD"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Missing("PASSWORD_SIAKAD"));
        }
        self.workers = self.workers.max(1);
        Ok(self)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("session_file", &self.session_file)
            .field("track_file", &self.track_file)
            .field("json_dir", &self.json_dir)
            .field("excel_dir", &self.excel_dir)
            .field("workers", &self.workers)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("ip_echo_url", &self.ip_echo_url)
            .field("study_mode", &self.study_mode)
            .finish()
    }
}
