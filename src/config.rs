//! Application-level configuration loading, including the session timing knobs.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_RUSH_BACK_CONFIG_PATH";
/// Per-question clock applied when the configuration does not set one.
const DEFAULT_QUESTION_TIMER_SECS: u64 = 10;
/// Interval between two clock decrements.
const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    question_timer: u64,
    tick_period: Duration,
    question_file: Option<PathBuf>,
    admin_token: Option<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        question_timer = config.question_timer,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Per-question clock in whole seconds.
    pub fn question_timer(&self) -> u64 {
        self.question_timer
    }

    /// Wall-clock interval between two ticks.
    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Optional question bank file; the built-in bank is used without one.
    pub fn question_file(&self) -> Option<&Path> {
        self.question_file.as_deref()
    }

    /// Admin token from the configuration file, if set.
    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }

    /// Override the session timing knobs.
    pub fn with_timing(mut self, question_timer: u64, tick_period: Duration) -> Self {
        self.question_timer = question_timer;
        self.tick_period = tick_period;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            question_timer: DEFAULT_QUESTION_TIMER_SECS,
            tick_period: DEFAULT_TICK_PERIOD,
            question_file: None,
            admin_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    question_timer_secs: Option<u64>,
    #[serde(default)]
    tick_period_ms: Option<u64>,
    #[serde(default)]
    question_file: Option<PathBuf>,
    #[serde(default)]
    admin_token: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            question_timer: value
                .question_timer_secs
                .unwrap_or(defaults.question_timer),
            tick_period: value
                .tick_period_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_period),
            question_file: value.question_file,
            admin_token: value.admin_token,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
