// Builders for event records and a projector over the in-memory store.
// Handler tests go through Projector::handle_event so routing is covered too.

use std::sync::Arc;

use crate::config::ProjectorConfig;
use crate::event::{EventKind, EventRecord};
use crate::handlers::Projector;
use crate::status::TransitionPolicy;
use crate::store::MemoryStore;

pub fn projector() -> (Projector<MemoryStore>, Arc<MemoryStore>) {
    projector_with(ProjectorConfig::default())
}

pub fn strict_projector() -> (Projector<MemoryStore>, Arc<MemoryStore>) {
    projector_with(ProjectorConfig {
        transition_policy: TransitionPolicy::Strict,
        ..ProjectorConfig::default()
    })
}

pub fn projector_with(config: ProjectorConfig) -> (Projector<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Projector::new(store.clone(), config), store)
}

pub fn job_posting_created(
    id: &str,
    contract_address: &str,
    company_address: &str,
    title: &str,
    country: &str,
    city: &str,
    is_remote: &str,
) -> EventRecord {
    EventRecord::new(id, EventKind::JobPostingCreated.name())
        .with_field("_companyProfileAddress", company_address)
        .with_field("_contractAddress", contract_address)
        .with_field("_title", title)
        .with_field("_country", country)
        .with_field("_city", city)
        .with_field("_isRemote", is_remote)
}

pub fn job_posting_closed(id: &str, contract_address: &str, company_address: &str) -> EventRecord {
    EventRecord::new(id, EventKind::JobPostingClosed.name())
        .with_field("_companyProfileAddress", company_address)
        .with_field("_contractAddress", contract_address)
}

pub fn job_application_event(
    id: &str,
    kind: EventKind,
    contract_address: &str,
    applicant: &str,
    job_posting_address: &str,
) -> EventRecord {
    EventRecord::new(id, kind.name())
        .with_field("_applicant", applicant)
        .with_field("_contractAddress", contract_address)
        .with_field("_jobPostingAddress", job_posting_address)
}
