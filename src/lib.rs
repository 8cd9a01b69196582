pub mod config;
pub mod error;
pub mod event;
pub mod gate;
pub mod handlers;
pub mod locks;
pub mod model;
pub mod repository;
pub mod resolver;
mod schema;
pub mod status;
pub mod store;
pub mod validate;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};

pub use config::ProjectorConfig;
pub use error::{HandleError, StoreError};
pub use event::{EventKind, EventRecord, RecordChange};
pub use gate::{GateOutcome, IngestionGate};
pub use handlers::{Outcome, Projector};
pub use repository::{EventLog, Marked, Repository};
pub use status::{JobApplicationStatus, TransitionPolicy};

use validate::ordering_key;

/// Counts for one polled batch of event records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Highest record position seen so far
    pub cursor: i64,
    pub fetched: usize,
    /// Records run through a handler
    pub handled: usize,
    /// Records the gate found processed or deleted
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: &GateOutcome) {
        match outcome {
            GateOutcome::Processed { .. } | GateOutcome::Unlogged(_) => self.handled += 1,
            GateOutcome::Absent | GateOutcome::AlreadyProcessed => self.skipped += 1,
            GateOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Fetches the unprocessed records after `cursor` and runs them through the
/// gate.
///
/// Records touching the same contract address run one after the other in log
/// order; each such chain is its own task. The cursor moves past failed
/// records too, so they are not picked up again until the next start.
pub async fn poll_once<S>(
    gate: &Arc<IngestionGate<S>>,
    cursor: i64,
    batch_size: usize,
) -> Result<BatchReport>
where
    S: Repository + EventLog + 'static,
{
    let batch = gate
        .projector()
        .store()
        .pending(cursor, batch_size)
        .await
        .context("failed to fetch pending event records")?;

    let mut report = BatchReport {
        cursor,
        fetched: batch.len(),
        ..BatchReport::default()
    };

    // batch is ordered by seq, so every chain is too
    let mut chains: HashMap<String, Vec<EventRecord>> = HashMap::new();
    for pending in batch {
        report.cursor = report.cursor.max(pending.seq);
        chains
            .entry(ordering_key(&pending.record))
            .or_default()
            .push(pending.record);
    }

    let mut tasks = JoinSet::new();
    for records in chains.into_values() {
        let gate = gate.clone();
        tasks.spawn(async move {
            let mut outcomes = Vec::with_capacity(records.len());
            for record in records {
                outcomes.push(gate.handle_change(RecordChange::created(record)).await);
            }
            outcomes
        });
    }

    while let Some(outcomes) = tasks.join_next().await {
        for outcome in outcomes.context("event task panicked")? {
            report.record(&outcome);
        }
    }

    Ok(report)
}

#[instrument(level = "info", skip_all, parent = None)]
pub async fn event_loop<S>(
    gate: Arc<IngestionGate<S>>,
    batch_size: usize,
    poll_interval: Duration,
) -> Result<()>
where
    S: Repository + EventLog + 'static,
{
    let mut cursor = 0;

    loop {
        let report = match poll_once(&gate, cursor, batch_size).await {
            Ok(report) => report,
            Err(err) => {
                error!(error = ?err, "failed to poll event records, retrying after the poll interval");
                sleep(poll_interval).await;
                continue;
            }
        };
        cursor = report.cursor;

        if report.fetched == 0 {
            // we are up to date, simply sleep for a bit
            debug!(cursor, "no pending event records");
            sleep(poll_interval).await;
            continue;
        }

        info!(
            cursor,
            handled = report.handled,
            skipped = report.skipped,
            failed = report.failed,
            "processed event records"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_utils::*;
    use crate::store::MemoryStore;

    // ------------------------------------------------------------------------
    // Test: Polling a mixed batch
    // Expected: Good records processed, failed ones left unprocessed and skipped
    // ------------------------------------------------------------------------
    #[tokio::test]
    async fn test_poll_once_moves_cursor_past_failures() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let gate = Arc::new(IngestionGate::new(store.clone(), ProjectorConfig::default()));

        store.insert_event(job_posting_created(
            "evt-1", "0xB", "0xA", "Engineer", "US", "NY", "true",
        ));
        store.insert_event(job_posting_closed("evt-2", "0xC", "0xA"));
        store.insert_event(EventRecord::new("evt-3", "SomethingElseEvent"));

        let report = poll_once(&gate, 0, 10).await?;
        assert_eq!(
            report,
            BatchReport {
                cursor: 3,
                fetched: 3,
                handled: 2,
                skipped: 0,
                failed: 1
            }
        );

        assert_eq!(store.event("evt-1").map(|r| r.is_processed()), Some(true));
        assert_eq!(store.event("evt-2").map(|r| r.is_processed()), Some(false));
        assert_eq!(store.event("evt-3").map(|r| r.is_processed()), Some(true));

        // nothing new after the cursor
        let report = poll_once(&gate, report.cursor, 10).await?;
        assert_eq!(report.fetched, 0);

        // a restart starts from the beginning and sees the failed record again
        let report = poll_once(&gate, 0, 10).await?;
        assert_eq!((report.fetched, report.handled, report.failed), (1, 0, 1));

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Test: Batch size smaller than the backlog
    // Expected: Records are taken oldest first, batch by batch
    // ------------------------------------------------------------------------
    #[tokio::test]
    async fn test_poll_once_respects_batch_size() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let gate = Arc::new(IngestionGate::new(store.clone(), ProjectorConfig::default()));

        for idx in 0..5 {
            store.insert_event(job_posting_created(
                &format!("evt-{idx}"),
                &format!("0x{idx}"),
                "0xA",
                "Engineer",
                "US",
                "NY",
                "false",
            ));
        }

        let first = poll_once(&gate, 0, 2).await?;
        assert_eq!((first.cursor, first.fetched), (2, 2));
        let second = poll_once(&gate, first.cursor, 2).await?;
        assert_eq!((second.cursor, second.fetched), (4, 2));
        let third = poll_once(&gate, second.cursor, 2).await?;
        assert_eq!((third.cursor, third.fetched), (5, 1));

        assert_eq!(store.postings().len(), 5);

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Test: Creation and two status changes of one application in one batch
    // Expected: Applied in log order every time, the last status wins
    // ------------------------------------------------------------------------
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_poll_once_keeps_log_order_per_contract() -> Result<()> {
        for _ in 0..50 {
            let store = Arc::new(MemoryStore::new());
            let gate = Arc::new(IngestionGate::new(store.clone(), ProjectorConfig::default()));

            for (idx, kind) in [
                EventKind::JobApplicationCreated,
                EventKind::JobApplicationOfferSent,
                EventKind::JobApplicationHired,
            ]
            .into_iter()
            .enumerate()
            {
                store.insert_event(job_application_event(
                    &format!("evt-{idx}"),
                    kind,
                    "0xC",
                    "0xD",
                    "0xB",
                ));
            }
            store.insert_event(job_posting_created(
                "evt-3", "0xB", "0xA", "Engineer", "US", "NY", "true",
            ));

            let report = poll_once(&gate, 0, 10).await?;
            assert_eq!(
                report,
                BatchReport {
                    cursor: 4,
                    fetched: 4,
                    handled: 4,
                    skipped: 0,
                    failed: 0
                }
            );

            let applications = store.applications();
            assert_eq!(applications.len(), 1);
            assert_eq!(applications[0].data.status, JobApplicationStatus::Hired);
            assert!(store.pending(0, 10).await?.is_empty());
        }

        Ok(())
    }
}
