use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::config::ProjectorConfig;
use crate::error::HandleError;
use crate::event::{EventRecord, RecordChange};
use crate::handlers::{Outcome, Projector};
use crate::locks::KeyedLocks;
use crate::repository::{EventLog, Marked, Repository};

/// Result of one pass through the gate.
#[derive(Debug)]
pub enum GateOutcome {
    /// The change deleted the record.
    Absent,
    AlreadyProcessed,
    /// Handled and marked processed. `marked` is false when another delivery
    /// flipped the flag first.
    Processed { outcome: Outcome, marked: bool },
    /// Handled, but the record is not in the event log so nothing was marked.
    Unlogged(Outcome),
    /// Handling failed, the record is left unprocessed.
    Failed(HandleError),
}

impl GateOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, GateOutcome::Failed(_))
    }
}

/// Entry point for every event record write.
///
/// Runs the record through the projector and marks it processed only when
/// that succeeded. Failures never escape: they are logged and reported in
/// the returned [`GateOutcome`].
pub struct IngestionGate<S: ?Sized> {
    projector: Projector<S>,
    // deliveries of the same record id run one after the other
    records: KeyedLocks,
}

impl<S: Repository + EventLog + ?Sized> IngestionGate<S> {
    pub fn new(store: Arc<S>, config: ProjectorConfig) -> Self {
        Self {
            projector: Projector::new(store, config),
            records: KeyedLocks::new(),
        }
    }

    pub fn projector(&self) -> &Projector<S> {
        &self.projector
    }

    #[instrument(
        level = "info",
        skip_all,
        parent = None,
        fields(
            id = change.after.as_ref().map(|record| record.id.as_str()),
            rewrite = change.before.is_some()
        )
    )]
    pub async fn handle_change(&self, change: RecordChange) -> GateOutcome {
        let Some(record) = change.after else {
            debug!("event record deleted, nothing to do");
            return GateOutcome::Absent;
        };

        if record.is_processed() {
            debug!("event record already processed");
            return GateOutcome::AlreadyProcessed;
        }

        let _guard = self.records.lock(&record.id).await;

        match self.process(record).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "failed to process event");
                GateOutcome::Failed(err)
            }
        }
    }

    async fn process(&self, record: EventRecord) -> Result<GateOutcome, HandleError> {
        let store = self.projector.store();

        // an earlier delivery may have finished while we waited for the lock
        if store.is_processed(&record.id).await? {
            debug!("event record processed by an earlier delivery");
            return Ok(GateOutcome::AlreadyProcessed);
        }

        info!(name = %record.name, fields = ?record.fields, "retrieved event content");

        let outcome = self.projector.handle_event(&record).await?;

        match store.mark_processed(&record).await? {
            Marked::Flipped => {
                info!(?outcome, "event processed");
                Ok(GateOutcome::Processed {
                    outcome,
                    marked: true,
                })
            }
            Marked::AlreadyProcessed => {
                debug!(?outcome, "event record was marked processed by another delivery");
                Ok(GateOutcome::Processed {
                    outcome,
                    marked: false,
                })
            }
            Marked::Missing => {
                warn!(?outcome, "event record missing from the event log, not marked");
                Ok(GateOutcome::Unlogged(outcome))
            }
        }
    }
}
