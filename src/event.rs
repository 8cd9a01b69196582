use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version of the event field layout the handlers read.
///
/// Version 3 is the layout where every job application event carries
/// `_jobPostingAddress` next to `_applicant` and `_contractAddress`.
pub const EVENT_SCHEMA_VERSION: u32 = 3;

/// One inbound event as written by the chain sync service.
///
/// `fields` keeps everything besides `name` and `processed` exactly as it was
/// received, so the record can be echoed back when it is marked processed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Document id of the record in the event collection
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<bool>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl EventRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            processed: None,
            fields: Map::new(),
        }
    }

    /// Builds a record from a raw JSON document, `name` and `processed` included.
    pub fn from_json(id: impl Into<String>, value: Value) -> serde_json::Result<Self> {
        let mut record: EventRecord = serde_json::from_value(value)?;
        record.id = id.into();
        Ok(record)
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    pub fn is_processed(&self) -> bool {
        self.processed.unwrap_or(false)
    }

    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_name(&self.name)
    }

    /// Reads a field through its string rendering.
    ///
    /// Empty strings, `null` and nested values count as absent.
    pub fn field(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// The record as it is persisted once handled: its own fields plus `processed = true`.
    pub fn into_processed(mut self) -> Self {
        self.processed = Some(true);
        self
    }
}

/// Before/after snapshot of one event record write, as handed over by the transport.
#[derive(Clone, Debug, Default)]
pub struct RecordChange {
    pub before: Option<EventRecord>,
    pub after: Option<EventRecord>,
}

impl RecordChange {
    /// A change that creates `record`.
    pub fn created(record: EventRecord) -> Self {
        Self {
            before: None,
            after: Some(record),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    JobPostingCreated,
    JobPostingClosed,
    JobApplicationCreated,
    JobApplicationOfferSent,
    JobApplicationOfferAccepted,
    JobApplicationOfferDeclined,
    JobApplicationApplicationDeclined,
    JobApplicationHired,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::JobPostingCreated,
        EventKind::JobPostingClosed,
        EventKind::JobApplicationCreated,
        EventKind::JobApplicationOfferSent,
        EventKind::JobApplicationOfferAccepted,
        EventKind::JobApplicationOfferDeclined,
        EventKind::JobApplicationApplicationDeclined,
        EventKind::JobApplicationHired,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::JobPostingCreated => "JobPostingCreatedEvent",
            EventKind::JobPostingClosed => "JobPostingClosedEvent",
            EventKind::JobApplicationCreated => "JobApplicationCreatedEvent",
            EventKind::JobApplicationOfferSent => "JobApplicationOfferSentEvent",
            EventKind::JobApplicationOfferAccepted => "JobApplicationOfferAcceptedEvent",
            EventKind::JobApplicationOfferDeclined => "JobApplicationOfferDeclinedEvent",
            EventKind::JobApplicationApplicationDeclined => {
                "JobApplicationApplicationDeclinedEvent"
            }
            EventKind::JobApplicationHired => "JobApplicationHiredEvent",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn test_record_from_json() -> Result<()> {
        let record = EventRecord::from_json(
            "evt-1",
            json!({
                "name": "JobPostingCreatedEvent",
                "_contractAddress": "0xB",
                "_isRemote": "true",
                "block_number": 42,
            }),
        )?;

        assert_eq!(record.id, "evt-1");
        assert_eq!(record.kind(), Some(EventKind::JobPostingCreated));
        assert!(!record.is_processed());
        assert_eq!(record.field("_contractAddress").as_deref(), Some("0xB"));
        assert_eq!(record.field("block_number").as_deref(), Some("42"));
        assert_eq!(record.field("_title"), None);

        Ok(())
    }

    #[test]
    fn test_empty_and_null_fields_are_absent() {
        let record = EventRecord::new("evt-1", "JobPostingClosedEvent")
            .with_field("_contractAddress", "")
            .with_field("_companyProfileAddress", Value::Null)
            .with_field("_isRemote", true);

        assert_eq!(record.field("_contractAddress"), None);
        assert_eq!(record.field("_companyProfileAddress"), None);
        assert_eq!(record.field("_isRemote").as_deref(), Some("true"));
    }

    #[test]
    fn test_unknown_names_have_no_kind() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("JobPostingUpdatedEvent"), None);
        assert_eq!(EventKind::from_name("jobpostingcreatedevent"), None);
        assert_eq!(EventKind::from_name(""), None);
    }

    #[test]
    fn test_processed_record_echoes_fields() {
        let record = EventRecord::new("evt-1", "JobApplicationHiredEvent")
            .with_field("_applicant", "0xA");
        let processed = record.clone().into_processed();

        assert!(processed.is_processed());
        assert_eq!(processed.fields, record.fields);
        assert_eq!(
            serde_json::to_value(&processed).unwrap(),
            json!({"name": "JobApplicationHiredEvent", "processed": true, "_applicant": "0xA"})
        );
    }
}
