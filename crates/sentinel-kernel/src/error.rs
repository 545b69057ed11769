use thiserror::Error;

/// Errors raised while loading or interpreting a [`crate::config::KernelConfig`],
/// or while bootstrapping a [`crate::kernel::Kernel`] from one.
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("config field '{field}' has an invalid value '{value}': {reason}")]
    InvalidField { field: &'static str, value: String, reason: String },

    #[error(transparent)]
    Types(#[from] sentinel_types::TypesError),
}

pub type Result<T> = core::result::Result<T, KernelError>;
