use tracing::{error, info, warn};

use crate::error::Result;
use crate::messenger::Messenger;
use crate::notifier::Notifier;
use crate::pacing::{Clock, SystemClock};
use crate::sources::{FetchError, IssueTracker, StatusFilter};
use crate::state::{self, WatermarkStore};

/// Summary of one poll-and-announce cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub status: StatusFilter,
    pub watermark_before: u64,
    pub watermark_after: u64,
    pub fetched: usize,
    pub fresh: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Set when the tracker query failed; nothing was announced in that case.
    pub fetch_error: Option<FetchError>,
}

impl CycleReport {
    fn unchanged(status: StatusFilter, watermark: u64) -> Self {
        Self {
            status,
            watermark_before: watermark,
            watermark_after: watermark,
            fetched: 0,
            fresh: 0,
            delivered: 0,
            failed: 0,
            fetch_error: None,
        }
    }
}

pub struct Orchestrator<T, M, S, C: Clock = SystemClock> {
    tracker: T,
    notifier: Notifier<M, S, C>,
}

impl<T: IssueTracker, M: Messenger, S: WatermarkStore, C: Clock> Orchestrator<T, M, S, C> {
    pub fn new(tracker: T, notifier: Notifier<M, S, C>) -> Self {
        Self { tracker, notifier }
    }

    pub fn notifier(&self) -> &Notifier<M, S, C> {
        &self.notifier
    }

    /// Run a single cycle: fetch issues in `status`, announce the fresh ones,
    /// then ask the store to persist.
    ///
    /// Only a watermark that cannot be read is an error; fetch and delivery
    /// failures are logged and reflected in the report.
    pub fn run_once(&self, status: StatusFilter) -> Result<CycleReport> {
        let key = status.watermark_key();
        let store = self.notifier.store();
        let watermark = state::load_or_init(store, &key)?;
        info!(%status, key = %key, watermark, "latest reported issue");

        let mut report = CycleReport::unchanged(status, watermark);

        match self.tracker.fetch_issues(status) {
            Ok(records) => {
                info!(%status, count = records.len(), "issues fetched");
                let outcome = self.notifier.deliver(&records, &key, watermark);
                report.fetched = records.len();
                report.fresh = outcome.fresh.len();
                report.delivered = outcome.delivered.len();
                report.failed = outcome.failed.len();
                report.watermark_after = outcome.watermark;
            }
            Err(e) => {
                error!(%status, error = %e, "failed to fetch issues, nothing to report this cycle");
                report.fetch_error = Some(e);
            }
        }

        if let Err(e) = store.persist() {
            warn!(error = %e, "failed to persist watermark store");
        }

        info!(
            %status,
            delivered = report.delivered,
            failed = report.failed,
            watermark = report.watermark_after,
            "cycle complete"
        );
        Ok(report)
    }
}
