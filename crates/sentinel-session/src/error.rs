use thiserror::Error;

use sentinel_ledger::LedgerError;
use sentinel_quote::QuoteError;

/// Errors raised by the session manager (C4), per §4.4/§7 of `SPEC_FULL.md`.
///
/// A policy rejection is deliberately *not* a variant here: §4.4 step 3
/// treats rejection as a normal, auditable outcome of `propose_swap`, not a
/// failure — see [`crate::ProposeOutcome::Rejected`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session (or channel) was in the wrong state for the requested
    /// operation — "programmer error; fail loudly" per §7.
    #[error("session state error: {0}")]
    StateError(String),

    /// `balanceIn.amount < amountIn` — a runtime error distinct from a
    /// policy rejection, surfaced before any mutation (§4.4 step 4).
    #[error("insufficient balance of {asset}: have {available}, need {requested}")]
    InsufficientBalance { asset: String, available: String, requested: String },

    /// Both quote backends failed (§4.2: "fatal only if both backends
    /// fail").
    #[error("quote failed: {0}")]
    QuoteFailed(#[from] QuoteError),

    /// The channel ledger rejected or timed out an `update`/`close` call
    /// after the in-memory mutation had already been rolled back. Retryable
    /// per §7.
    #[error("channel transport failure: {0}")]
    ChannelTransportFailure(String),

    /// A checked `Decimal` operation overflowed while applying a swap
    /// delta.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
}

impl From<LedgerError> for SessionError {
    fn from(err: LedgerError) -> Self {
        SessionError::ChannelTransportFailure(err.to_string())
    }
}

pub type Result<T> = core::result::Result<T, SessionError>;
