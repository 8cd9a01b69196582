use tracing::{info, instrument};

use crate::error::HandleError;
use crate::event::{EventKind, EventRecord};
use crate::handlers::{Outcome, Projector};
use crate::repository::Repository;
use crate::resolver::Resolver;
use crate::status::JobApplicationStatus;
use crate::validate::application_fields;

/// Moves an existing application to the status `kind` maps to.
#[instrument(level = "info", skip_all, fields(kind = %kind))]
pub async fn handle_job_application_status_changed<S: Repository + ?Sized>(
    projector: &Projector<S>,
    kind: EventKind,
    record: &EventRecord,
) -> Result<Outcome, HandleError> {
    let Some(target) = JobApplicationStatus::target_of(kind) else {
        return Ok(Outcome::Ignored);
    };

    let fields = application_fields(kind, record, projector.config.require_job_posting_address)?;

    let _guard = projector.locks.lock(&fields.contract_address).await;

    let existing = Resolver::new(&*projector.store)
        .existing_application(&fields.contract_address)
        .await?;

    let current = existing.data.status;
    if !projector
        .config
        .transition_policy
        .permits(kind, current, target)
    {
        return Err(HandleError::IllegalTransition {
            event: kind,
            contract_address: fields.contract_address,
            from: current,
            to: target,
        });
    }

    let mut application = existing.data;
    application.set_addresses(
        &fields.contract_address,
        &fields.applicant_address,
        fields.job_posting_address.as_deref(),
    );
    application.status = target;

    projector
        .store
        .update_application(existing.id, &application)
        .await?;

    info!(
        id = existing.id,
        contract_address = %application.contract_address,
        %current,
        %target,
        "job application status changed"
    );

    Ok(Outcome::Updated(existing.id))
}
