pub mod redmine;

use std::fmt;

use serde::Serialize;

/// Tracker workflow status used to select issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StatusFilter(pub u32);

impl StatusFilter {
    /// The tracker's "new" status.
    pub const NEW: StatusFilter = StatusFilter(1);

    /// Store key of the watermark tracking this status.
    /// Each status keeps its own watermark so polling one never hides issues of another.
    pub fn watermark_key(&self) -> String {
        if *self == Self::NEW {
            "latest_new_issue".to_string()
        } else {
            format!("latest_status_{}_issue", self.0)
        }
    }
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self::NEW
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized tracker issue. `id` is the only ordering and dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRecord {
    pub id: u64,
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueStatus {
    pub id: u32,
    pub name: String,
    pub is_closed: bool,
}

/// Why a tracker query produced no result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("tracker unreachable: {0}")]
    Connectivity(String),

    #[error("tracker responded {code}: {body}")]
    Status { code: u16, body: String },

    #[error("malformed tracker response: {0}")]
    MalformedResponse(String),
}

pub trait IssueTracker {
    /// Fetch issues in the given status, sorted by id ascending.
    fn fetch_issues(&self, status: StatusFilter) -> Result<Vec<IssueRecord>, FetchError>;

    /// List the statuses the tracker knows about.
    fn fetch_statuses(&self) -> Result<Vec<IssueStatus>, FetchError>;
}
