use async_trait::async_trait;

use crate::error::StoreError;
use crate::event::EventRecord;
use crate::model::{Document, DocumentId, JobApplication, JobPosting};

/// Result of a create-if-absent-else-update write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upserted {
    Created(DocumentId),
    Updated(DocumentId),
}

impl Upserted {
    pub fn id(self) -> DocumentId {
        match self {
            Upserted::Created(id) | Upserted::Updated(id) => id,
        }
    }
}

/// Access to the two projected document sets, keyed by contract address.
///
/// The default `upsert_*` bodies look up and then write, which is not atomic.
/// Stores that can do better override them.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_posting(
        &self,
        contract_address: &str,
    ) -> Result<Option<Document<JobPosting>>, StoreError>;

    async fn create_posting(&self, posting: &JobPosting) -> Result<DocumentId, StoreError>;

    async fn update_posting(&self, id: DocumentId, posting: &JobPosting)
        -> Result<(), StoreError>;

    async fn upsert_posting(&self, posting: &JobPosting) -> Result<Upserted, StoreError> {
        match self.find_posting(&posting.contract_address).await? {
            Some(existing) => {
                self.update_posting(existing.id, posting).await?;
                Ok(Upserted::Updated(existing.id))
            }
            None => Ok(Upserted::Created(self.create_posting(posting).await?)),
        }
    }

    async fn find_application(
        &self,
        contract_address: &str,
    ) -> Result<Option<Document<JobApplication>>, StoreError>;

    async fn create_application(
        &self,
        application: &JobApplication,
    ) -> Result<DocumentId, StoreError>;

    async fn update_application(
        &self,
        id: DocumentId,
        application: &JobApplication,
    ) -> Result<(), StoreError>;

    async fn upsert_application(
        &self,
        application: &JobApplication,
    ) -> Result<Upserted, StoreError> {
        match self.find_application(&application.contract_address).await? {
            Some(existing) => {
                self.update_application(existing.id, application).await?;
                Ok(Upserted::Updated(existing.id))
            }
            None => Ok(Upserted::Created(
                self.create_application(application).await?,
            )),
        }
    }
}

/// An unprocessed event record together with its position in the event log.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingRecord {
    pub seq: i64,
    pub record: EventRecord,
}

/// What a `mark_processed` call found in the event log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marked {
    /// This call flipped the flag.
    Flipped,
    /// Another delivery flipped it first.
    AlreadyProcessed,
    /// No record with that id in the event log, nothing written.
    Missing,
}

/// The collection the chain sync service writes event records into.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Persists the record's fields with `processed = true`.
    ///
    /// Only flips records that are still unprocessed.
    async fn mark_processed(&self, record: &EventRecord) -> Result<Marked, StoreError>;

    /// Durable `processed` flag of a record; unknown records read as unprocessed.
    async fn is_processed(&self, id: &str) -> Result<bool, StoreError>;

    /// Unprocessed records with a position after `after_seq`, oldest first.
    async fn pending(&self, after_seq: i64, limit: usize)
        -> Result<Vec<PendingRecord>, StoreError>;
}
