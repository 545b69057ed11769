use thiserror::Error;

/// Errors raised by the on-chain guard/vault pair (C6). These mirror what a
/// Solidity `require` would revert with; there is no I/O failure mode here
/// since the "chain" is an in-process deterministic validator (see
/// `sentinel-chain`'s crate doc).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// `settledSessions[sessionId]` was already `true` (§4.6 replay guard).
    #[error("session {0} is already settled")]
    AlreadySettled(String),

    /// `usdcAmount` exceeded the guard's `maxSettlementUsdc`.
    #[error("usdc settlement amount {value} exceeds cap {limit}")]
    UsdcCapExceeded { value: String, limit: String },

    /// `ethAmount` exceeded the guard's `maxSettlementEth`.
    #[error("eth settlement amount {value} exceeds cap {limit}")]
    EthCapExceeded { value: String, limit: String },

    /// `token` was not in `allowedTokens` and `usdcAmount > 0`.
    #[error("token {0} is not in the allowed set")]
    TokenNotAllowed(String),

    /// Caller of an owner-gated entry point was neither the owner nor the
    /// account-abstraction entry point.
    #[error("caller {caller} is not authorized for {action}")]
    Unauthorized { caller: String, action: String },

    /// A user-operation signature did not recover to the vault's owner.
    #[error("signature did not recover to the owner address")]
    InvalidSignature,
}

pub type Result<T> = core::result::Result<T, ChainError>;
