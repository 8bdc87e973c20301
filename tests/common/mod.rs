#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Tracker address that refuses connections immediately.
pub const UNREACHABLE_TRACKER: &str = "http://127.0.0.1:9";

/// Write a config pointing at `tracker_url` with state and logs inside `dir`.
pub fn write_config(dir: &Path, tracker_url: &str) -> PathBuf {
    let path = dir.join("issuecast.toml");
    let content = format!(
        r#"
[tracker]
base_url = "{tracker_url}"
api_key_env = "ISSUECAST_IT_REDMINE_KEY"
http_timeout_secs = 5

[telegram]
channel = "@issues"
token_env = "ISSUECAST_IT_TELEGRAM_TOKEN"
api_url = "http://127.0.0.1:9"

[notify]
send_interval_ms = 10

[state]
dir = "{state}"

[log]
file = "{log}"
level = "debug"
"#,
        state = dir.join("state").display(),
        log = dir.join("logs").join("issuecast.log").display(),
    );
    std::fs::write(&path, content).unwrap();
    path
}
