use thiserror::Error;

/// Errors surfaced by a single [`crate::QuoteBackend`]. A proposal-level
/// error (§4.2), not a session error — the oracle falls over to the next
/// backend on any of these except when every backend has been tried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("no liquidity for pair {token_in}/{token_out}")]
    NoLiquidity { token_in: String, token_out: String },

    #[error("on-chain read failed: {0}")]
    OnChainReadFailed(String),

    #[error("amount arithmetic error: {0}")]
    Arithmetic(String),
}

pub type Result<T> = core::result::Result<T, QuoteError>;
