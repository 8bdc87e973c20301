use std::path::Path;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "issuecast.toml";
pub const DEFAULT_STATUS_LINE: &str = "New issue:";
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "{{ status_line }}\n{{ title }}\n{{ link }}\n";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub tracker: Option<TrackerSection>,
    pub telegram: Option<TelegramSection>,
    pub notify: Option<NotifySection>,
    pub state: Option<StateSection>,
    pub log: Option<LogSection>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TrackerSection {
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub project_id: Option<u32>,
    pub link_label: Option<String>,
    pub http_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TelegramSection {
    pub channel: Option<String>,
    pub token_env: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NotifySection {
    pub status: Option<u32>,
    pub status_line: Option<String>,
    pub template: Option<String>,
    pub send_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StateSection {
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    pub file: Option<String>,
    pub level: Option<String>,
    pub max_bytes: Option<u64>,
    pub backups: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub tracker_url: String,
    pub api_key_env: String,
    pub project_id: Option<u32>,
    pub link_label: String,
    pub http_timeout_secs: u64,
    pub channel: String,
    pub token_env: String,
    pub telegram_api_url: String,
    pub status: u32,
    pub status_line: String,
    pub message_template: String,
    pub send_interval_ms: u64,
    pub state_dir: String,
    pub log_file: String,
    pub log_level: String,
    pub log_max_bytes: u64,
    pub log_backups: u32,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = Path::new(cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));
        let file_config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            parse_config(&content)?
        } else {
            return Err(Error::ConfigNotFound(config_path.to_path_buf()));
        };

        merge(file_config, cli)
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ref tracker) = config.tracker {
        if let Some(ref url) = tracker.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(Error::ConfigValidation(format!(
                "tracker.base_url must be an http(s) URL, got: {url}"
            )));
        }
        if tracker.http_timeout_secs == Some(0) {
            return Err(Error::ConfigValidation(
                "tracker.http_timeout_secs must be > 0".to_string(),
            ));
        }
    }
    if let Some(ref notify) = config.notify {
        if notify.send_interval_ms == Some(0) {
            return Err(Error::ConfigValidation(
                "notify.send_interval_ms must be > 0".to_string(),
            ));
        }
    }
    if let Some(ref log) = config.log {
        if let Some(ref level) = log.level {
            match level.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => {}
                other => {
                    return Err(Error::ConfigValidation(format!(
                        "unknown log level: {other} (expected: trace, debug, info, warn, error)"
                    )));
                }
            }
        }
        if log.max_bytes == Some(0) {
            return Err(Error::ConfigValidation(
                "log.max_bytes must be > 0".to_string(),
            ));
        }
    }
    Ok(())
}

/// Merge file settings with CLI overrides. CLI wins.
pub fn merge(file: ConfigFile, cli: &Cli) -> Result<Config> {
    let tracker = file.tracker.unwrap_or_default();
    let telegram = file.telegram.unwrap_or_default();
    let notify = file.notify.unwrap_or_default();
    let state = file.state.unwrap_or_default();
    let log = file.log.unwrap_or_default();

    let tracker_url = tracker
        .base_url
        .map(|u| u.trim_end_matches('/').to_string())
        .ok_or_else(|| Error::ConfigValidation("tracker.base_url is required".to_string()))?;
    let channel = telegram
        .channel
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| Error::ConfigValidation("telegram.channel is required".to_string()))?;

    let send_interval_ms = cli
        .send_interval_ms
        .or(notify.send_interval_ms)
        .unwrap_or(1000);
    if send_interval_ms == 0 {
        return Err(Error::ConfigValidation(
            "send interval must be > 0".to_string(),
        ));
    }

    Ok(Config {
        tracker_url,
        api_key_env: tracker
            .api_key_env
            .unwrap_or_else(|| "REDMINE_API_KEY".to_string()),
        project_id: tracker.project_id,
        link_label: tracker.link_label.unwrap_or_else(|| "Issue".to_string()),
        http_timeout_secs: tracker.http_timeout_secs.unwrap_or(30),
        channel,
        token_env: telegram
            .token_env
            .unwrap_or_else(|| "TELEGRAM_BOT_TOKEN".to_string()),
        telegram_api_url: telegram
            .api_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| "https://api.telegram.org".to_string()),
        status: cli.status.or(notify.status).unwrap_or(1),
        status_line: notify
            .status_line
            .unwrap_or_else(|| DEFAULT_STATUS_LINE.to_string()),
        message_template: notify
            .template
            .unwrap_or_else(|| DEFAULT_MESSAGE_TEMPLATE.to_string()),
        send_interval_ms,
        state_dir: cli
            .state_dir
            .clone()
            .or(state.dir)
            .unwrap_or_else(|| ".issuecast".to_string()),
        log_file: cli
            .log_file
            .clone()
            .or(log.file)
            .unwrap_or_else(|| "issuecast.log".to_string()),
        log_level: log.level.unwrap_or_else(|| "debug".to_string()),
        log_max_bytes: log.max_bytes.unwrap_or(1024 * 1024),
        log_backups: log.backups.unwrap_or(10),
    })
}

/// Read a secret from the environment variable named in config.
pub fn resolve_secret(env_name: &str) -> Result<String> {
    match std::env::var(env_name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Credentials(format!(
            "environment variable ${env_name} is not set"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use serial_test::serial;

    const MINIMAL: &str = r#"
[tracker]
base_url = "https://redmine.example.com/"

[telegram]
channel = "@issues"
"#;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
[tracker]
base_url = "https://redmine.example.com"
api_key_env = "RM_KEY"
project_id = 1
link_label = "PSR"

[telegram]
channel = "@issues"

[notify]
status = 1
status_line = "New PSR:"
send_interval_ms = 1500

[state]
dir = "/var/lib/issuecast"

[log]
file = "/var/log/issuecast.log"
level = "info"
max_bytes = 2048
backups = 3
"#;
        let config = parse_config(toml).unwrap();
        let tracker = config.tracker.unwrap();
        assert_eq!(tracker.project_id, Some(1));
        assert_eq!(tracker.link_label.as_deref(), Some("PSR"));
        assert_eq!(config.notify.unwrap().send_interval_ms, Some(1500));
        assert_eq!(config.log.unwrap().backups, Some(3));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_invalid_base_url() {
        let toml = "[tracker]\nbase_url = \"redmine.example.com\"";
        let err = parse_config(toml).unwrap_err();
        assert!(err.to_string().contains("http(s) URL"));
    }

    #[test]
    fn test_parse_zero_send_interval() {
        let toml = "[notify]\nsend_interval_ms = 0";
        let err = parse_config(toml).unwrap_err();
        assert!(err.to_string().contains("send_interval_ms must be > 0"));
    }

    #[test]
    fn test_parse_invalid_log_level() {
        let toml = "[log]\nlevel = \"loud\"";
        let err = parse_config(toml).unwrap_err();
        assert!(err.to_string().contains("unknown log level"));
    }

    #[test]
    fn test_parse_unknown_field() {
        let toml = "[tracker]\nbogus = \"value\"";
        let err = parse_config(toml).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_defaults_applied() {
        let file = parse_config(MINIMAL).unwrap();
        let cli = Cli::parse_from(["issuecast"]);
        let config = merge(file, &cli).unwrap();
        assert_eq!(config.tracker_url, "https://redmine.example.com");
        assert_eq!(config.api_key_env, "REDMINE_API_KEY");
        assert_eq!(config.project_id, None);
        assert_eq!(config.token_env, "TELEGRAM_BOT_TOKEN");
        assert_eq!(config.telegram_api_url, "https://api.telegram.org");
        assert_eq!(config.status, 1);
        assert_eq!(config.status_line, DEFAULT_STATUS_LINE);
        assert_eq!(config.message_template, DEFAULT_MESSAGE_TEMPLATE);
        assert_eq!(config.send_interval_ms, 1000);
        assert_eq!(config.log_max_bytes, 1024 * 1024);
        assert_eq!(config.log_backups, 10);
    }

    #[test]
    fn test_cli_overrides_config() {
        let toml = format!("{MINIMAL}\n[notify]\nstatus = 2\nsend_interval_ms = 900\n");
        let file = parse_config(&toml).unwrap();
        let cli = Cli::parse_from([
            "issuecast",
            "--status",
            "5",
            "--state-dir",
            "/tmp/state",
        ]);
        let config = merge(file, &cli).unwrap();
        assert_eq!(config.status, 5); // CLI wins
        assert_eq!(config.state_dir, "/tmp/state"); // CLI wins
        assert_eq!(config.send_interval_ms, 900); // file value kept
    }

    #[test]
    fn test_status_zero_accepted_from_file_and_cli() {
        // Status ids belong to the tracker; both sources take them as given.
        let toml = format!("{MINIMAL}\n[notify]\nstatus = 0\n");
        let file = parse_config(&toml).unwrap();
        let config = merge(file, &Cli::parse_from(["issuecast"])).unwrap();
        assert_eq!(config.status, 0);

        let file = parse_config(MINIMAL).unwrap();
        let config = merge(file, &Cli::parse_from(["issuecast", "--status", "0"])).unwrap();
        assert_eq!(config.status, 0);
    }

    #[test]
    fn test_missing_tracker_url() {
        let file = parse_config("[telegram]\nchannel = \"@issues\"").unwrap();
        let cli = Cli::parse_from(["issuecast"]);
        let err = merge(file, &cli).unwrap_err();
        assert!(err.to_string().contains("tracker.base_url is required"));
    }

    #[test]
    fn test_missing_channel() {
        let file = parse_config("[tracker]\nbase_url = \"https://rm.local\"").unwrap();
        let cli = Cli::parse_from(["issuecast"]);
        let err = merge(file, &cli).unwrap_err();
        assert!(err.to_string().contains("telegram.channel is required"));
    }

    #[test]
    fn test_cli_zero_send_interval_rejected() {
        let file = parse_config(MINIMAL).unwrap();
        let cli = Cli::parse_from(["issuecast", "--send-interval-ms", "0"]);
        assert!(merge(file, &cli).is_err());
    }

    #[test]
    #[serial]
    fn test_resolve_secret_from_env() {
        unsafe { std::env::set_var("ISSUECAST_TEST_SECRET", "s3cret") };
        assert_eq!(resolve_secret("ISSUECAST_TEST_SECRET").unwrap(), "s3cret");
        unsafe { std::env::remove_var("ISSUECAST_TEST_SECRET") };
    }

    #[test]
    #[serial]
    fn test_resolve_secret_missing() {
        unsafe { std::env::remove_var("ISSUECAST_TEST_SECRET") };
        let err = resolve_secret("ISSUECAST_TEST_SECRET").unwrap_err();
        assert!(err.to_string().contains("$ISSUECAST_TEST_SECRET"));
    }
}
