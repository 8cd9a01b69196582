use thiserror::Error;

use crate::event::EventKind;
use crate::status::JobApplicationStatus;

/// Failure of a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("failed to check out a connection: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("corrupt {collection} document {id}: {reason}")]
    Corrupt {
        collection: &'static str,
        id: String,
        reason: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Why one event could not be projected.
///
/// Any of these leaves the event record unprocessed.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("{event}: missing {}", .missing.join(", "))]
    MissingFields {
        event: EventKind,
        missing: Vec<&'static str>,
    },
    #[error("{entity} not found (contractAddress: {contract_address})")]
    NotFound {
        entity: &'static str,
        contract_address: String,
    },
    #[error("{event}: illegal transition {from} -> {to} (contractAddress: {contract_address})")]
    IllegalTransition {
        event: EventKind,
        contract_address: String,
        from: JobApplicationStatus,
        to: JobApplicationStatus,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
