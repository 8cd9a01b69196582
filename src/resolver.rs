use tracing::debug;

use crate::error::{HandleError, StoreError};
use crate::model::{Document, JobApplication, JobPosting};
use crate::repository::Repository;

const JOB_POSTING: &str = "JobPosting";
const JOB_APPLICATION: &str = "JobApplication";

/// Finds the projected document an event refers to by its contract address.
pub struct Resolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: Repository + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn posting(
        &self,
        contract_address: &str,
    ) -> Result<Option<Document<JobPosting>>, StoreError> {
        let found = self.store.find_posting(contract_address).await?;
        debug!(contract_address, found = found.is_some(), "resolved job posting");
        Ok(found)
    }

    /// Like [`Resolver::posting`] but a missing posting is an error.
    pub async fn existing_posting(
        &self,
        contract_address: &str,
    ) -> Result<Document<JobPosting>, HandleError> {
        self.posting(contract_address)
            .await?
            .ok_or_else(|| HandleError::NotFound {
                entity: JOB_POSTING,
                contract_address: contract_address.to_owned(),
            })
    }

    pub async fn application(
        &self,
        contract_address: &str,
    ) -> Result<Option<Document<JobApplication>>, StoreError> {
        let found = self.store.find_application(contract_address).await?;
        debug!(contract_address, found = found.is_some(), "resolved job application");
        Ok(found)
    }

    pub async fn existing_application(
        &self,
        contract_address: &str,
    ) -> Result<Document<JobApplication>, HandleError> {
        self.application(contract_address)
            .await?
            .ok_or_else(|| HandleError::NotFound {
                entity: JOB_APPLICATION,
                contract_address: contract_address.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::JobApplicationStatus;
    use crate::store::MemoryStore;
    use anyhow::Result;

    #[tokio::test]
    async fn test_resolves_by_exact_contract_address() -> Result<()> {
        let store = MemoryStore::new();
        let id = store.create_posting(&JobPosting::new("0xB", "0xA")).await?;
        let resolver = Resolver::new(&store);

        assert_eq!(resolver.posting("0xB").await?.map(|doc| doc.id), Some(id));
        assert_eq!(resolver.posting("0xb").await?, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_application_is_not_found() -> Result<()> {
        let store = MemoryStore::new();
        store
            .create_application(&JobApplication::new(
                "0xC",
                "0xD",
                None,
                JobApplicationStatus::OfferSent,
            ))
            .await?;
        let resolver = Resolver::new(&store);

        let found = resolver.existing_application("0xC").await?;
        assert_eq!(found.data.status, JobApplicationStatus::OfferSent);

        let err = resolver.existing_application("0xE").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "JobApplication not found (contractAddress: 0xE)"
        );

        Ok(())
    }
}
