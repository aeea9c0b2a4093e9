use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::command::RechargeCommand;
use crate::ledger::Ledger;
use crate::notify::Notifier;
use crate::source::{MessageSource, SourceError};

/// What one tick did, for the run loop and for tests
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub fetched: usize,
    pub applied: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub unmatched: usize,
}

/// Periodic scan of the monitored mailbox: fetch candidates since the
/// checkpoint, parse, resolve senders to accounts, apply credits, confirm.
pub struct RechargeMonitor {
    ledger: Arc<Ledger>,
    source: Arc<dyn MessageSource>,
    notifier: Arc<dyn Notifier>,
    checkpoint: CheckpointStore,
    command: RechargeCommand,
    interval: Duration,
}

impl RechargeMonitor {
    pub fn new(
        ledger: Arc<Ledger>,
        source: Arc<dyn MessageSource>,
        notifier: Arc<dyn Notifier>,
        checkpoint: CheckpointStore,
        command: RechargeCommand,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            source,
            notifier,
            checkpoint,
            command,
            interval,
        }
    }

    pub fn last_checked(&self) -> DateTime<Utc> {
        self.checkpoint.last_checked()
    }

    /// One scan-parse-apply cycle. `now` is the tick start time and becomes
    /// the new checkpoint after a fully processed batch.
    ///
    /// A source failure aborts the whole tick and leaves the checkpoint
    /// untouched, so the next tick retries the identical window. Per-message
    /// failures only skip that message.
    pub async fn run_tick(&mut self, now: DateTime<Utc>) -> Result<TickReport, SourceError> {
        let cursor = self.checkpoint.last_checked();
        let messages = self.source.fetch_since(cursor).await?;

        let mut report = TickReport {
            fetched: messages.len(),
            ..Default::default()
        };

        for msg in &messages {
            if self.checkpoint.is_processed(&msg.id) {
                report.duplicates += 1;
                debug!(message = %msg.id, "already processed, skipping");
                continue;
            }

            let request = match self.command.parse(msg) {
                Ok(request) => request,
                Err(reject) => {
                    report.rejected += 1;
                    debug!(message = %msg.id, reason = %reject, "not a recharge command");
                    continue;
                }
            };

            let Some(account) = self.ledger.find_by_identity(&request.sender) else {
                report.unmatched += 1;
                warn!(sender = %request.sender, "no account for sender, skipping");
                continue;
            };

            let new_balance = match self.ledger.credit(account.id, request.amount) {
                Ok(balance) => balance,
                Err(e) => {
                    warn!(account = account.id, error = %e, "failed to apply credit");
                    continue;
                }
            };

            // The credit commits before the id is marked; a crash in between
            // re-applies it on replay.
            if let Err(e) = self.checkpoint.mark_processed(&msg.id, msg.received_at) {
                warn!(message = %msg.id, error = %e, "failed to record processed message");
            }

            info!(
                account = account.id,
                identity = %request.sender,
                amount = request.amount,
                balance = new_balance,
                "credits recharged"
            );

            if let Err(e) = self
                .notifier
                .confirmation(&request.sender, request.amount)
                .await
            {
                warn!(identity = %request.sender, error = %e, "confirmation notification failed");
            }

            report.applied += 1;
        }

        if let Err(e) = self.checkpoint.advance(now) {
            warn!(error = %e, "failed to persist checkpoint");
        }

        Ok(report)
    }

    /// Run forever on the configured interval. A trigger arriving while a
    /// tick is still in flight is dropped, never queued.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = self.interval.as_secs(), "recharge monitor started");

        loop {
            ticker.tick().await;
            match self.run_tick(Utc::now()).await {
                Ok(report) if report.applied > 0 => {
                    info!(
                        fetched = report.fetched,
                        applied = report.applied,
                        rejected = report.rejected,
                        "tick complete"
                    );
                }
                Ok(report) => {
                    debug!(fetched = report.fetched, "tick complete, nothing applied");
                }
                Err(e) => {
                    warn!(error = %e, "message source query failed, will retry next tick");
                }
            }
        }
    }
}
