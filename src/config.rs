use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::notifications::models::ChannelConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub database_url: String,
    pub monitor_frequency_min: u64,
    pub icmp_timeout_ms: u64,
    pub log_dir: String,
    pub channel: ChannelConfig,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialMonitorConfig {
    database_url: Option<String>,
    monitor_frequency_min: Option<u64>,
    icmp_timeout_ms: Option<u64>,
    log_dir: Option<String>,
    notifier: Option<String>,
    webhook_url: Option<String>,
    webhook_method: Option<String>,
    telegram_bot_token: Option<String>,
    telegram_chat_id: Option<String>,
}

/// Keys only the config file can carry.
#[derive(Deserialize, Default, Debug)]
struct FileConfig {
    #[serde(flatten)]
    settings: PartialMonitorConfig,
    webhook_headers: Option<HashMap<String, String>>,
}

/// Longest accepted interval: one run per day.
const MAX_MONITOR_FREQUENCY_MIN: u64 = 24 * 60;

fn default_monitor_frequency_min() -> u64 {
    1
}

fn default_icmp_timeout_ms() -> u64 {
    2000
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_webhook_method() -> String {
    "POST".to_string()
}

impl MonitorConfig {
    /// Loads `.env`, then the optional TOML file, then the environment.
    /// Environment values override file values; defaults fill the rest.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path) => read_file_layer(Path::new(path))?,
            None => FileConfig::default(),
        };
        let env_config: PartialMonitorConfig = envy::from_env()?;

        Self::from_layers(file_config, env_config)
    }

    fn from_layers(file: FileConfig, env: PartialMonitorConfig) -> Result<Self, ConfigError> {
        let FileConfig {
            settings: file,
            webhook_headers,
        } = file;

        let monitor_frequency_min = env
            .monitor_frequency_min
            .or(file.monitor_frequency_min)
            .unwrap_or_else(default_monitor_frequency_min);
        if !(1..=MAX_MONITOR_FREQUENCY_MIN).contains(&monitor_frequency_min) {
            return Err(ConfigError::Invalid(format!(
                "MONITOR_FREQUENCY_MIN must be between 1 and {}, got {}",
                MAX_MONITOR_FREQUENCY_MIN, monitor_frequency_min
            )));
        }

        let icmp_timeout_ms = env
            .icmp_timeout_ms
            .or(file.icmp_timeout_ms)
            .unwrap_or_else(default_icmp_timeout_ms);
        if icmp_timeout_ms == 0 {
            return Err(ConfigError::Invalid("ICMP_TIMEOUT_MS must be at least 1".to_string()));
        }

        let notifier = env
            .notifier
            .or(file.notifier)
            .unwrap_or_else(|| "log".to_string());
        let channel = match notifier.to_lowercase().as_str() {
            "log" => ChannelConfig::Log,
            "webhook" => ChannelConfig::Webhook {
                url: env
                    .webhook_url
                    .or(file.webhook_url)
                    .ok_or(ConfigError::Missing("WEBHOOK_URL"))?,
                method: env
                    .webhook_method
                    .or(file.webhook_method)
                    .unwrap_or_else(default_webhook_method),
                headers: webhook_headers,
                body_template: None,
            },
            "telegram" => ChannelConfig::Telegram {
                bot_token: env
                    .telegram_bot_token
                    .or(file.telegram_bot_token)
                    .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?,
                chat_id: env
                    .telegram_chat_id
                    .or(file.telegram_chat_id)
                    .ok_or(ConfigError::Missing("TELEGRAM_CHAT_ID"))?,
            },
            other => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown notifier '{other}', expected log, webhook or telegram"
                )));
            }
        };

        Ok(MonitorConfig {
            database_url: env
                .database_url
                .or(file.database_url)
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            monitor_frequency_min,
            icmp_timeout_ms,
            log_dir: env
                .log_dir
                .or(file.log_dir)
                .unwrap_or_else(default_log_dir),
            channel,
        })
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_frequency_min * 60)
    }

    pub fn icmp_timeout(&self) -> Duration {
        Duration::from_millis(self.icmp_timeout_ms)
    }
}

/// A missing file is treated as empty.
fn read_file_layer(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(vars: &[(&str, &str)]) -> PartialMonitorConfig {
        envy::from_iter(
            vars.iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        )
        .unwrap()
    }

    fn file(contents: &str) -> FileConfig {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(contents.as_bytes()).unwrap();
        read_file_layer(tmp.path()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::from_layers(
            FileConfig::default(),
            env(&[("DATABASE_URL", "sqlite::memory:")]),
        )
        .unwrap();

        assert_eq!(config.monitor_frequency_min, 1);
        assert_eq!(config.monitor_interval(), Duration::from_secs(60));
        assert_eq!(config.icmp_timeout(), Duration::from_millis(2000));
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.channel, ChannelConfig::Log);
    }

    #[test]
    fn test_database_url_is_required() {
        let err = MonitorConfig::from_layers(FileConfig::default(), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = file(
            r#"
database_url = "postgres://monitor@db/monitor"
monitor_frequency_min = 5
log_dir = "/var/log/device-monitor"
notifier = "webhook"
webhook_url = "https://hooks.example.com/a"

[webhook_headers]
Authorization = "Bearer token"
"#,
        );
        let config = MonitorConfig::from_layers(
            file,
            env(&[
                ("MONITOR_FREQUENCY_MIN", "2"),
                ("WEBHOOK_URL", "https://hooks.example.com/b"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database_url, "postgres://monitor@db/monitor");
        assert_eq!(config.monitor_frequency_min, 2);
        assert_eq!(config.log_dir, "/var/log/device-monitor");
        assert_eq!(
            config.channel,
            ChannelConfig::Webhook {
                url: "https://hooks.example.com/b".to_string(),
                method: "POST".to_string(),
                headers: Some(HashMap::from([(
                    "Authorization".to_string(),
                    "Bearer token".to_string()
                )])),
                body_template: None,
            }
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let zero = MonitorConfig::from_layers(
            FileConfig::default(),
            env(&[("DATABASE_URL", "sqlite::memory:"), ("MONITOR_FREQUENCY_MIN", "0")]),
        );
        assert!(matches!(zero, Err(ConfigError::Invalid(_))));

        let huge = (u64::MAX / 30).to_string();
        let overflowing = MonitorConfig::from_layers(
            FileConfig::default(),
            env(&[
                ("DATABASE_URL", "sqlite::memory:"),
                ("MONITOR_FREQUENCY_MIN", huge.as_str()),
            ]),
        );
        assert!(matches!(overflowing, Err(ConfigError::Invalid(_))));

        let daily = MonitorConfig::from_layers(
            FileConfig::default(),
            env(&[("DATABASE_URL", "sqlite::memory:"), ("MONITOR_FREQUENCY_MIN", "1440")]),
        )
        .unwrap();
        assert_eq!(daily.monitor_interval(), Duration::from_secs(86_400));

        let instant_timeout = MonitorConfig::from_layers(
            FileConfig::default(),
            env(&[("DATABASE_URL", "sqlite::memory:"), ("ICMP_TIMEOUT_MS", "0")]),
        );
        assert!(matches!(instant_timeout, Err(ConfigError::Invalid(_))));

        let unknown = MonitorConfig::from_layers(
            FileConfig::default(),
            env(&[("DATABASE_URL", "sqlite::memory:"), ("NOTIFIER", "smtp")]),
        );
        assert!(matches!(unknown, Err(ConfigError::Invalid(_))));

        let telegram = MonitorConfig::from_layers(
            FileConfig::default(),
            env(&[
                ("DATABASE_URL", "sqlite::memory:"),
                ("NOTIFIER", "telegram"),
                ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ]),
        );
        assert!(matches!(telegram, Err(ConfigError::Missing("TELEGRAM_CHAT_ID"))));

        assert!(envy::from_iter::<_, PartialMonitorConfig>(vec![(
            "MONITOR_FREQUENCY_MIN".to_string(),
            "often".to_string()
        )])
        .is_err());
    }

    #[test]
    fn test_missing_file_is_empty_and_bad_toml_errors() {
        let missing = read_file_layer(Path::new("/nonexistent/device-monitor.toml")).unwrap();
        assert!(missing.settings.database_url.is_none());

        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"monitor_frequency_min = [").unwrap();
        assert!(matches!(
            read_file_layer(tmp.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
