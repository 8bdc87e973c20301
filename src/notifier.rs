use tracing::{debug, error, info, warn};

use crate::message::MessageRenderer;
use crate::messenger::{Messenger, SendOptions};
use crate::pacing::{Clock, Pacer, SystemClock};
use crate::sources::IssueRecord;
use crate::state::WatermarkStore;

/// Result of one delivery pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryOutcome {
    /// Highest id announced so far (the input watermark if nothing was sent).
    pub watermark: u64,
    /// Ids that were newer than the input watermark, ascending.
    pub fresh: Vec<u64>,
    pub delivered: Vec<u64>,
    pub failed: Vec<u64>,
    /// Failed ids left below the advanced watermark; no later cycle retries them.
    pub skipped: Vec<u64>,
}

/// Announces fresh issues and advances the watermark after each delivery.
pub struct Notifier<M, S, C: Clock = SystemClock> {
    messenger: M,
    store: S,
    renderer: MessageRenderer,
    pacer: Pacer<C>,
    channel: String,
}

impl<M: Messenger, S: WatermarkStore, C: Clock> Notifier<M, S, C> {
    pub fn new(
        messenger: M,
        store: S,
        renderer: MessageRenderer,
        pacer: Pacer<C>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            messenger,
            store,
            renderer,
            pacer,
            channel: channel.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    pub fn pacer(&self) -> &Pacer<C> {
        &self.pacer
    }

    /// Announce every record newer than `watermark`, oldest first, and store
    /// the id of each delivered record under `key` as soon as it is sent.
    pub fn deliver(&self, records: &[IssueRecord], key: &str, watermark: u64) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome {
            watermark,
            ..Default::default()
        };

        let fresh = select_fresh(records, watermark);
        if fresh.is_empty() {
            debug!(watermark, total = records.len(), "no fresh issues");
            return outcome;
        }
        outcome.fresh = fresh.iter().map(|r| r.id).collect();
        info!(watermark, fresh = ?outcome.fresh, "announcing fresh issues");

        for record in fresh {
            let text = match self.renderer.render(record) {
                Ok(text) => text,
                Err(e) => {
                    warn!(issue = record.id, error = %e, "message about issue is not sent");
                    outcome.failed.push(record.id);
                    continue;
                }
            };

            self.pacer.wait_turn();
            match self
                .messenger
                .send(&self.channel, &text, SendOptions::default())
            {
                Ok(()) => {
                    outcome.delivered.push(record.id);
                    // Ascending order keeps this strictly increasing.
                    if record.id > outcome.watermark {
                        outcome.watermark = record.id;
                        if let Err(e) = self.store.set(key, record.id) {
                            error!(issue = record.id, error = %e, "failed to store watermark");
                        }
                    }
                    debug!(issue = record.id, "message about issue is sent");
                }
                Err(e) => {
                    warn!(issue = record.id, error = %e, "message about issue is not sent");
                    outcome.failed.push(record.id);
                }
            }
        }

        outcome.skipped = outcome
            .failed
            .iter()
            .copied()
            .filter(|&id| id < outcome.watermark)
            .collect();
        for &issue in &outcome.skipped {
            warn!(
                issue,
                watermark = outcome.watermark,
                "undelivered issue is now below the watermark and will not be retried"
            );
        }

        outcome
    }
}

/// Records with `id > watermark`, ascending by id, duplicates dropped.
/// The whole input is filtered; its order is not trusted.
pub fn select_fresh(records: &[IssueRecord], watermark: u64) -> Vec<&IssueRecord> {
    let mut fresh: Vec<&IssueRecord> = records.iter().filter(|r| r.id > watermark).collect();
    fresh.sort_by_key(|r| r.id);
    fresh.dedup_by_key(|r| r.id);
    fresh
}
