use tracing::{info, instrument};

use crate::error::HandleError;
use crate::event::{EventKind, EventRecord};
use crate::handlers::{Outcome, Projector};
use crate::repository::Repository;
use crate::resolver::Resolver;
use crate::validate::posting_fields;

#[instrument(level = "info", skip_all)]
pub async fn handle_job_posting_closed<S: Repository + ?Sized>(
    projector: &Projector<S>,
    record: &EventRecord,
) -> Result<Outcome, HandleError> {
    let fields = posting_fields(EventKind::JobPostingClosed, record)?;

    let _guard = projector.locks.lock(&fields.contract_address).await;

    // we want to update if the posting exists
    // we want to error out if it does not
    let existing = Resolver::new(&*projector.store)
        .existing_posting(&fields.contract_address)
        .await?;

    let mut posting = existing.data;
    posting.set_addresses(&fields.contract_address, &fields.company_address);
    posting.is_active = false;

    projector
        .store
        .update_posting(existing.id, &posting)
        .await?;

    info!(
        id = existing.id,
        contract_address = %posting.contract_address,
        "job posting closed"
    );

    Ok(Outcome::Updated(existing.id))
}
