use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::ProjectorConfig;
use crate::error::HandleError;
use crate::event::{EventKind, EventRecord};
use crate::locks::KeyedLocks;
use crate::model::DocumentId;
use crate::repository::{Repository, Upserted};

mod job_posting_created;
use job_posting_created::handle_job_posting_created;

mod job_posting_closed;
use job_posting_closed::handle_job_posting_closed;

mod job_application_created;
use job_application_created::handle_job_application_created;

mod job_application_status_changed;
use job_application_status_changed::handle_job_application_status_changed;

/// What handling one event did to the projections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Created(DocumentId),
    Updated(DocumentId),
    /// Known event type that cannot be projected, nothing written.
    Skipped,
    /// Unknown event type, nothing written.
    Ignored,
}

impl From<Upserted> for Outcome {
    fn from(upserted: Upserted) -> Self {
        match upserted {
            Upserted::Created(id) => Outcome::Created(id),
            Upserted::Updated(id) => Outcome::Updated(id),
        }
    }
}

/// Folds event records into the job posting and job application projections.
pub struct Projector<S: ?Sized> {
    store: Arc<S>,
    config: ProjectorConfig,
    // one resolve-then-write chain per contract address at a time
    locks: KeyedLocks,
}

impl<S: Repository + ?Sized> Projector<S> {
    pub fn new(store: Arc<S>, config: ProjectorConfig) -> Self {
        Self {
            store,
            config,
            locks: KeyedLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Routes one event to its handler.
    ///
    /// Unknown event names are not an error.
    #[instrument(
        level = "info",
        skip_all,
        parent = None,
        fields(id = %record.id, name = %record.name)
    )]
    pub async fn handle_event(&self, record: &EventRecord) -> Result<Outcome, HandleError> {
        let Some(kind) = record.kind() else {
            debug!("ignoring unknown event type");
            return Ok(Outcome::Ignored);
        };

        info!(%kind, "processing event");

        match kind {
            EventKind::JobPostingCreated => handle_job_posting_created(self, record).await,
            EventKind::JobPostingClosed => handle_job_posting_closed(self, record).await,
            EventKind::JobApplicationCreated => handle_job_application_created(self, record).await,
            EventKind::JobApplicationOfferSent
            | EventKind::JobApplicationOfferAccepted
            | EventKind::JobApplicationOfferDeclined
            | EventKind::JobApplicationApplicationDeclined
            | EventKind::JobApplicationHired => {
                handle_job_application_status_changed(self, kind, record).await
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils;
