use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The requested operation is illegal for the channel's current status
    /// (§4.3: "no transition is reversible; any illegal call fails with a
    /// state-error").
    #[error("illegal channel operation: {0}")]
    StateError(String),

    /// A signature failed to recover to the participant address it claims
    /// to be from. The channel remains at its prior turn (§4.3).
    #[error("signature mismatch: {0}")]
    SignatureMismatch(String),

    /// The counterparty transport (or test double) failed to produce a
    /// co-signature.
    #[error("counterparty transport failure: {0}")]
    TransportFailure(String),
}

pub type Result<T> = core::result::Result<T, LedgerError>;
