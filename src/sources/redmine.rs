use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::message::escape_html;

use super::{FetchError, IssueRecord, IssueStatus, IssueTracker, StatusFilter};

const ISSUE_PAGE_LIMIT: u32 = 100;
const MAX_BODY_SNIPPET: usize = 200;

// ---------------------------------------------------------------------------
// Client abstraction (for testability)
// ---------------------------------------------------------------------------

pub trait RedmineClient {
    /// GET `path` (relative to the tracker base URL) and return the body.
    fn get(&self, path: &str) -> std::result::Result<String, FetchError>;
}

struct DefaultRedmineClient {
    base_url: String,
    api_key: String,
    agent: ureq::Agent,
}

impl DefaultRedmineClient {
    fn new(base_url: &str, api_key: String, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl RedmineClient for DefaultRedmineClient {
    fn get(&self, path: &str) -> std::result::Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "querying Redmine");

        match self
            .agent
            .get(&url)
            .set("Content-Type", "application/json")
            .set("X-Redmine-API-Key", &self.api_key)
            .call()
        {
            Ok(response) => response
                .into_string()
                .map_err(|e| FetchError::Connectivity(format!("failed to read body from {url}: {e}"))),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(FetchError::Status {
                    code,
                    body: snippet(&body),
                })
            }
            Err(ureq::Error::Transport(t)) => Err(FetchError::Connectivity(format!(
                "failed to establish a connection to {url}: {t}"
            ))),
        }
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_BODY_SNIPPET) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

// ---------------------------------------------------------------------------
// REST response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RmIssue {
    id: u64,
    subject: String,
}

#[derive(Debug, Deserialize)]
struct RmIssueList {
    issues: Vec<RmIssue>,
}

#[derive(Debug, Deserialize)]
struct RmStatus {
    id: u32,
    name: String,
    #[serde(default)]
    is_closed: bool,
}

#[derive(Debug, Deserialize)]
struct RmStatusList {
    issue_statuses: Vec<RmStatus>,
}

// ---------------------------------------------------------------------------
// RedmineSource
// ---------------------------------------------------------------------------

pub struct RedmineSource {
    base_url: String,
    project_id: Option<u32>,
    link_label: String,
    client: Box<dyn RedmineClient>,
}

impl RedmineSource {
    pub fn new(config: &Config, api_key: String) -> Self {
        Self {
            base_url: config.tracker_url.clone(),
            project_id: config.project_id,
            link_label: config.link_label.clone(),
            client: Box::new(DefaultRedmineClient::new(
                &config.tracker_url,
                api_key,
                Duration::from_secs(config.http_timeout_secs),
            )),
        }
    }

    pub fn with_client(
        base_url: &str,
        project_id: Option<u32>,
        link_label: &str,
        client: Box<dyn RedmineClient>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            link_label: link_label.to_string(),
            client,
        }
    }

    fn issues_path(&self, status: StatusFilter) -> String {
        let mut path = format!("/issues.json?status_id={status}");
        if let Some(project) = self.project_id {
            path.push_str(&format!("&project_id={project}"));
        }
        // Newest first, so the page keeps the most recent issues when more match.
        path.push_str(&format!("&sort=id:desc&limit={ISSUE_PAGE_LIMIT}"));
        path
    }

    fn build_record(&self, issue: RmIssue) -> IssueRecord {
        IssueRecord {
            link: format!(
                "<a href=\"{}/issues/{}\">{} #{}</a>",
                self.base_url,
                issue.id,
                escape_html(&self.link_label),
                issue.id
            ),
            id: issue.id,
            title: issue.subject,
        }
    }
}

impl IssueTracker for RedmineSource {
    fn fetch_issues(&self, status: StatusFilter) -> std::result::Result<Vec<IssueRecord>, FetchError> {
        let body = self.client.get(&self.issues_path(status))?;
        let list: RmIssueList = serde_json::from_str(&body).map_err(|e| {
            FetchError::MalformedResponse(format!("issue list: {e}: {}", snippet(&body)))
        })?;

        let mut records: Vec<IssueRecord> = list
            .issues
            .into_iter()
            .map(|issue| self.build_record(issue))
            .collect();
        records.sort_by_key(|r| r.id);

        debug!(%status, count = records.len(), "fetched Redmine issues");
        Ok(records)
    }

    fn fetch_statuses(&self) -> std::result::Result<Vec<IssueStatus>, FetchError> {
        let body = self.client.get("/issue_statuses.json")?;
        let list: RmStatusList = serde_json::from_str(&body).map_err(|e| {
            FetchError::MalformedResponse(format!("status list: {e}: {}", snippet(&body)))
        })?;

        Ok(list
            .issue_statuses
            .into_iter()
            .map(|s| IssueStatus {
                id: s.id,
                name: s.name,
                is_closed: s.is_closed,
            })
            .collect())
    }
}

/// Build a source from config, resolving the API key from the environment.
pub fn from_config(config: &Config) -> Result<RedmineSource> {
    let api_key = crate::config::resolve_secret(&config.api_key_env)?;
    Ok(RedmineSource::new(config, api_key))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
