use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::event::EventRecord;
use crate::model::{Document, DocumentId, JobApplication, JobPosting};
use crate::repository::{EventLog, Marked, PendingRecord, Repository, Upserted};

/// Process-local store.
///
/// Document sets keep insertion order and `create_*` does not check the
/// contract address, so lookups behave like a plain document store: the
/// first matching document wins.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: DocumentId,
    postings: Vec<Document<JobPosting>>,
    applications: Vec<Document<JobApplication>>,
    events: Vec<PendingRecord>,
    entity_writes: usize,
}

impl Inner {
    fn next_id(&mut self) -> DocumentId {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_owned()));
        }
        Ok(self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn snapshot(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every following operation fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Appends an event record the way the chain sync service would.
    pub fn insert_event(&self, record: EventRecord) -> i64 {
        let mut inner = self.snapshot();
        let seq = inner.events.len() as i64 + 1;
        inner.events.push(PendingRecord { seq, record });
        seq
    }

    pub fn event(&self, id: &str) -> Option<EventRecord> {
        self.snapshot()
            .events
            .iter()
            .find(|pending| pending.record.id == id)
            .map(|pending| pending.record.clone())
    }

    pub fn postings(&self) -> Vec<Document<JobPosting>> {
        self.snapshot().postings.clone()
    }

    pub fn applications(&self) -> Vec<Document<JobApplication>> {
        self.snapshot().applications.clone()
    }

    /// Number of writes made to either document set.
    pub fn entity_writes(&self) -> usize {
        self.snapshot().entity_writes
    }
}

fn replace<T: Clone>(
    documents: &mut [Document<T>],
    collection: &'static str,
    id: DocumentId,
    data: &T,
) -> Result<(), StoreError> {
    let document = documents
        .iter_mut()
        .find(|document| document.id == id)
        .ok_or_else(|| StoreError::Corrupt {
            collection,
            id: id.to_string(),
            reason: "document vanished before update".to_owned(),
        })?;
    document.data = data.clone();
    Ok(())
}

#[async_trait]
impl Repository for MemoryStore {
    async fn find_posting(
        &self,
        contract_address: &str,
    ) -> Result<Option<Document<JobPosting>>, StoreError> {
        Ok(self
            .lock()?
            .postings
            .iter()
            .find(|document| document.data.contract_address == contract_address)
            .cloned())
    }

    async fn create_posting(&self, posting: &JobPosting) -> Result<DocumentId, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        inner.postings.push(Document {
            id,
            data: posting.clone(),
        });
        inner.entity_writes += 1;
        Ok(id)
    }

    async fn update_posting(
        &self,
        id: DocumentId,
        posting: &JobPosting,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        replace(&mut inner.postings, "JobPostings", id, posting)?;
        inner.entity_writes += 1;
        Ok(())
    }

    async fn upsert_posting(&self, posting: &JobPosting) -> Result<Upserted, StoreError> {
        let mut inner = self.lock()?;
        inner.entity_writes += 1;

        if let Some(existing) = inner
            .postings
            .iter_mut()
            .find(|document| document.data.contract_address == posting.contract_address)
        {
            existing.data = posting.clone();
            return Ok(Upserted::Updated(existing.id));
        }

        let id = inner.next_id();
        inner.postings.push(Document {
            id,
            data: posting.clone(),
        });
        Ok(Upserted::Created(id))
    }

    async fn find_application(
        &self,
        contract_address: &str,
    ) -> Result<Option<Document<JobApplication>>, StoreError> {
        Ok(self
            .lock()?
            .applications
            .iter()
            .find(|document| document.data.contract_address == contract_address)
            .cloned())
    }

    async fn create_application(
        &self,
        application: &JobApplication,
    ) -> Result<DocumentId, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        inner.applications.push(Document {
            id,
            data: application.clone(),
        });
        inner.entity_writes += 1;
        Ok(id)
    }

    async fn update_application(
        &self,
        id: DocumentId,
        application: &JobApplication,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        replace(&mut inner.applications, "JobApplications", id, application)?;
        inner.entity_writes += 1;
        Ok(())
    }

    async fn upsert_application(
        &self,
        application: &JobApplication,
    ) -> Result<Upserted, StoreError> {
        let mut inner = self.lock()?;
        inner.entity_writes += 1;

        if let Some(existing) = inner
            .applications
            .iter_mut()
            .find(|document| document.data.contract_address == application.contract_address)
        {
            existing.data = application.clone();
            return Ok(Upserted::Updated(existing.id));
        }

        let id = inner.next_id();
        inner.applications.push(Document {
            id,
            data: application.clone(),
        });
        Ok(Upserted::Created(id))
    }
}

#[async_trait]
impl EventLog for MemoryStore {
    async fn mark_processed(&self, record: &EventRecord) -> Result<Marked, StoreError> {
        let mut inner = self.lock()?;
        let Some(stored) = inner
            .events
            .iter_mut()
            .find(|pending| pending.record.id == record.id)
        else {
            return Ok(Marked::Missing);
        };

        if stored.record.is_processed() {
            return Ok(Marked::AlreadyProcessed);
        }

        stored.record = record.clone().into_processed();
        Ok(Marked::Flipped)
    }

    async fn is_processed(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()?
            .events
            .iter()
            .any(|pending| pending.record.id == id && pending.record.is_processed()))
    }

    async fn pending(
        &self,
        after_seq: i64,
        limit: usize,
    ) -> Result<Vec<PendingRecord>, StoreError> {
        Ok(self
            .lock()?
            .events
            .iter()
            .filter(|pending| pending.seq > after_seq && !pending.record.is_processed())
            .take(limit)
            .cloned()
            .collect())
    }
}
