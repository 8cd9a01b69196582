use tracing::{info, instrument, warn};

use crate::error::HandleError;
use crate::event::{EventKind, EventRecord};
use crate::handlers::{Outcome, Projector};
use crate::model::JobPosting;
use crate::repository::Repository;
use crate::validate::posting_fields;

#[instrument(level = "info", skip_all)]
pub async fn handle_job_posting_created<S: Repository + ?Sized>(
    projector: &Projector<S>,
    record: &EventRecord,
) -> Result<Outcome, HandleError> {
    let fields = match posting_fields(EventKind::JobPostingCreated, record) {
        Ok(fields) => fields,
        Err(err) => {
            // nothing to key the posting on, a redelivery cannot fix that
            warn!(%err, "skipping job posting creation");
            return Ok(Outcome::Skipped);
        }
    };

    let _guard = projector.locks.lock(&fields.contract_address).await;

    let mut posting = JobPosting::new(&fields.contract_address, &fields.company_address);
    posting.job_title = fields.title;
    posting.country = fields.country;
    posting.city = fields.city;
    posting.is_remote = fields.is_remote;
    posting.is_active = true;

    let upserted = projector.store.upsert_posting(&posting).await?;

    info!(
        contract_address = %posting.contract_address,
        company_address = %posting.company_address,
        ?upserted,
        "job posting projected"
    );

    Ok(upserted.into())
}
