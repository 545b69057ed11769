use thiserror::Error;

/// Errors surfaced by the settlement client (§4.5/§7). Pre-validation
/// failures are terminal for the attempt; transport failures are
/// retryable because the guard's replay map makes re-submission safe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    /// The read-only pre-validation call against the guard rejected the
    /// settlement. Terminal: the session stays `closing` until the operator
    /// fixes whatever the guard's policy mirror disagrees about.
    #[error("pre-validation rejected: {0}")]
    PreValidationRejected(String),

    /// Submitting the settlement transaction, or waiting for its
    /// confirmation, failed in a way that may be safely retried.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// The confirmation arrived but did not carry a parseable
    /// `SessionSettled` event.
    #[error("settlement event missing or unparseable for tx {0}")]
    EventNotFound(String),
}

pub type Result<T> = core::result::Result<T, SettlementError>;
