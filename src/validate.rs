//! Required field checks per event type.

use serde_json::Value;

use crate::error::HandleError;
use crate::event::{EventKind, EventRecord};

const COMPANY_PROFILE_ADDRESS: &str = "_companyProfileAddress";
const CONTRACT_ADDRESS: &str = "_contractAddress";
const TITLE: &str = "_title";
const COUNTRY: &str = "_country";
const CITY: &str = "_city";
const IS_REMOTE: &str = "_isRemote";
const APPLICANT: &str = "_applicant";
// older application contracts emitted the applicant as the sender
const APPLICANT_FALLBACK: &str = "_from";
const JOB_POSTING_ADDRESS: &str = "_jobPostingAddress";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostingFields {
    pub company_address: String,
    pub contract_address: String,
    pub title: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub is_remote: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplicationFields {
    pub applicant_address: String,
    pub contract_address: String,
    pub job_posting_address: Option<String>,
}

/// Key of the projected document a record touches.
///
/// Records without a contract address fall back to their own id.
pub fn ordering_key(record: &EventRecord) -> String {
    record
        .field(CONTRACT_ADDRESS)
        .unwrap_or_else(|| record.id.clone())
}

pub fn posting_fields(kind: EventKind, record: &EventRecord) -> Result<PostingFields, HandleError> {
    let company_address = record.field(COMPANY_PROFILE_ADDRESS);
    let contract_address = record.field(CONTRACT_ADDRESS);

    match (company_address, contract_address) {
        (Some(company_address), Some(contract_address)) => Ok(PostingFields {
            company_address,
            contract_address,
            title: record.field(TITLE),
            country: record.field(COUNTRY),
            city: record.field(CITY),
            // only the string "true" counts, a JSON boolean does not
            is_remote: record.fields.get(IS_REMOTE).and_then(Value::as_str) == Some("true"),
        }),
        (company_address, contract_address) => {
            let mut missing = Vec::new();
            if company_address.is_none() {
                missing.push("companyProfileAddress");
            }
            if contract_address.is_none() {
                missing.push("contractAddress");
            }
            Err(HandleError::MissingFields {
                event: kind,
                missing,
            })
        }
    }
}

pub fn application_fields(
    kind: EventKind,
    record: &EventRecord,
    require_job_posting_address: bool,
) -> Result<ApplicationFields, HandleError> {
    let applicant_address = record
        .field(APPLICANT)
        .or_else(|| record.field(APPLICANT_FALLBACK));
    let contract_address = record.field(CONTRACT_ADDRESS);
    let job_posting_address = record.field(JOB_POSTING_ADDRESS);

    let mut missing = Vec::new();
    if applicant_address.is_none() {
        missing.push("applicant");
    }
    if contract_address.is_none() {
        missing.push("contractAddress");
    }
    if require_job_posting_address && job_posting_address.is_none() {
        missing.push("jobPostingAddress");
    }

    match (applicant_address, contract_address) {
        (Some(applicant_address), Some(contract_address)) if missing.is_empty() => {
            Ok(ApplicationFields {
                applicant_address,
                contract_address,
                job_posting_address,
            })
        }
        _ => Err(HandleError::MissingFields {
            event: kind,
            missing,
        }),
    }
}
