use serde::{Deserialize, Serialize};

use crate::status::JobApplicationStatus;

pub type DocumentId = i64;

/// A projected entity together with the id the store assigned to it.
#[derive(Clone, Debug, PartialEq)]
pub struct Document<T> {
    pub id: DocumentId,
    pub data: T,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub contract_address: String,
    pub company_address: String,
    pub job_title: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub is_remote: bool,
    pub is_active: bool,
    pub contract_address_lower_case: String,
    pub company_address_lower_case: String,
}

impl JobPosting {
    pub fn new(contract_address: &str, company_address: &str) -> Self {
        Self {
            contract_address: contract_address.to_owned(),
            company_address: company_address.to_owned(),
            job_title: None,
            country: None,
            city: None,
            is_remote: false,
            is_active: true,
            contract_address_lower_case: contract_address.to_lowercase(),
            company_address_lower_case: company_address.to_lowercase(),
        }
    }

    /// Replaces both addresses, keeping their lower-cased copies in sync.
    pub fn set_addresses(&mut self, contract_address: &str, company_address: &str) {
        self.contract_address = contract_address.to_owned();
        self.company_address = company_address.to_owned();
        self.contract_address_lower_case = contract_address.to_lowercase();
        self.company_address_lower_case = company_address.to_lowercase();
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub contract_address: String,
    pub applicant_address: String,
    pub job_posting_address: Option<String>,
    pub status: JobApplicationStatus,
    pub contract_address_lower_case: String,
    pub applicant_address_lower_case: String,
    pub job_posting_address_lower_case: Option<String>,
}

impl JobApplication {
    pub fn new(
        contract_address: &str,
        applicant_address: &str,
        job_posting_address: Option<&str>,
        status: JobApplicationStatus,
    ) -> Self {
        let mut application = Self {
            contract_address: String::new(),
            applicant_address: String::new(),
            job_posting_address: None,
            status,
            contract_address_lower_case: String::new(),
            applicant_address_lower_case: String::new(),
            job_posting_address_lower_case: None,
        };
        application.set_addresses(contract_address, applicant_address, job_posting_address);
        application
    }

    pub fn set_addresses(
        &mut self,
        contract_address: &str,
        applicant_address: &str,
        job_posting_address: Option<&str>,
    ) {
        self.contract_address = contract_address.to_owned();
        self.applicant_address = applicant_address.to_owned();
        self.job_posting_address = job_posting_address.map(str::to_owned);
        self.contract_address_lower_case = contract_address.to_lowercase();
        self.applicant_address_lower_case = applicant_address.to_lowercase();
        self.job_posting_address_lower_case = job_posting_address.map(str::to_lowercase);
    }
}
