use thiserror::Error;

/// Errors raised by the shared data model itself, as opposed to the
/// components built on top of it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// A checked arithmetic operation on a [`crate::decimal::Decimal`] would
    /// have overflowed `i128` or gone negative.
    #[error("amount arithmetic overflow: {0}")]
    AmountOverflow(String),

    /// Two amounts were combined despite being denominated at different
    /// decimal scales.
    #[error("scale mismatch: {lhs} vs {rhs}")]
    ScaleMismatch { lhs: u32, rhs: u32 },

    /// A ratio had a zero denominator.
    #[error("ratio with zero denominator")]
    ZeroDenominator,

    /// A status transition was attempted that the state machine does not
    /// permit (e.g. `settled -> active`).
    #[error("illegal state transition: {0}")]
    IllegalTransition(String),
}

pub type Result<T> = core::result::Result<T, TypesError>;
