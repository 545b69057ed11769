use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("failed to resolve name '{0}'")]
    ResolutionFailed(String),

    #[error("failed to read text record '{key}' for '{name}'")]
    TextRecordFailed { name: String, key: String },

    /// Only raised when the caller opted into strict mode (§6: "Mismatch is
    /// a warning, not a hard fail unless configured strict").
    #[error("policy hash mismatch for '{name}': on-chain {on_chain} != local {local}")]
    PolicyHashMismatch { name: String, on_chain: String, local: String },
}

pub type Result<T> = core::result::Result<T, IdentityError>;
