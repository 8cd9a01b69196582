use tracing::{info, instrument};

use crate::error::HandleError;
use crate::event::{EventKind, EventRecord};
use crate::handlers::{Outcome, Projector};
use crate::model::JobApplication;
use crate::repository::Repository;
use crate::status::JobApplicationStatus;
use crate::validate::application_fields;

#[instrument(level = "info", skip_all)]
pub async fn handle_job_application_created<S: Repository + ?Sized>(
    projector: &Projector<S>,
    record: &EventRecord,
) -> Result<Outcome, HandleError> {
    let fields = application_fields(
        EventKind::JobApplicationCreated,
        record,
        projector.config.require_job_posting_address,
    )?;

    let _guard = projector.locks.lock(&fields.contract_address).await;

    let application = JobApplication::new(
        &fields.contract_address,
        &fields.applicant_address,
        fields.job_posting_address.as_deref(),
        JobApplicationStatus::InProgress,
    );

    let upserted = projector.store.upsert_application(&application).await?;

    info!(
        contract_address = %application.contract_address,
        applicant_address = %application.applicant_address,
        ?upserted,
        "job application projected"
    );

    Ok(upserted.into())
}

#[cfg(test)]
mod tests {
    use crate::event::{EventKind, EventRecord};
    use crate::handlers::test_utils::*;
    use crate::handlers::Outcome;
    use crate::model::{Document, JobApplication};
    use crate::status::JobApplicationStatus;
    use anyhow::Result;

    // ------------------------------------------------------------------------
    // Test: Creating an application for an unseen contract address
    // Expected: One application in progress with lower-cased copies
    // ------------------------------------------------------------------------
    #[tokio::test]
    async fn test_create_new_application() -> Result<()> {
        let (projector, store) = projector();

        let record = job_application_event(
            "evt-1",
            EventKind::JobApplicationCreated,
            "0xC",
            "0xD",
            "0xB",
        );
        let Outcome::Created(id) = projector.handle_event(&record).await? else {
            panic!("expected a new application");
        };

        assert_eq!(
            store.applications(),
            vec![Document {
                id,
                data: JobApplication {
                    contract_address: "0xC".to_owned(),
                    applicant_address: "0xD".to_owned(),
                    job_posting_address: Some("0xB".to_owned()),
                    status: JobApplicationStatus::InProgress,
                    contract_address_lower_case: "0xc".to_owned(),
                    applicant_address_lower_case: "0xd".to_owned(),
                    job_posting_address_lower_case: Some("0xb".to_owned()),
                },
            }]
        );
        assert!(store.postings().is_empty());

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Test: Creation event for an application that already moved on
    // Expected: Same document, status reset to in progress
    // ------------------------------------------------------------------------
    #[tokio::test]
    async fn test_recreation_resets_status() -> Result<()> {
        let (projector, store) = projector();

        let created = job_application_event(
            "evt-1",
            EventKind::JobApplicationCreated,
            "0xC",
            "0xD",
            "0xB",
        );
        let Outcome::Created(id) = projector.handle_event(&created).await? else {
            panic!("expected a new application");
        };
        projector
            .handle_event(&job_application_event(
                "evt-2",
                EventKind::JobApplicationOfferSent,
                "0xC",
                "0xD",
                "0xB",
            ))
            .await?;

        assert_eq!(projector.handle_event(&created).await?, Outcome::Updated(id));

        let applications = store.applications();
        assert_eq!(applications.len(), 1);
        assert_eq!(applications[0].data.status, JobApplicationStatus::InProgress);

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Test: Creation events missing a required field
    // Expected: Each fails, nothing written
    // ------------------------------------------------------------------------
    #[tokio::test]
    async fn test_creation_missing_fields_fails() -> Result<()> {
        let (projector, store) = projector();

        let cases = [
            (
                EventRecord::new("evt-1", "JobApplicationCreatedEvent")
                    .with_field("_contractAddress", "0xC")
                    .with_field("_jobPostingAddress", "0xB"),
                "JobApplicationCreatedEvent: missing applicant",
            ),
            (
                EventRecord::new("evt-2", "JobApplicationCreatedEvent")
                    .with_field("_applicant", "0xD")
                    .with_field("_jobPostingAddress", "0xB"),
                "JobApplicationCreatedEvent: missing contractAddress",
            ),
            (
                EventRecord::new("evt-3", "JobApplicationCreatedEvent")
                    .with_field("_applicant", "0xD")
                    .with_field("_contractAddress", "0xC"),
                "JobApplicationCreatedEvent: missing jobPostingAddress",
            ),
        ];

        for (record, expected) in cases {
            let res = projector.handle_event(&record).await;
            assert_eq!(format!("{}", res.unwrap_err()), expected);
        }

        assert!(store.applications().is_empty());
        assert_eq!(store.entity_writes(), 0);

        Ok(())
    }
}
