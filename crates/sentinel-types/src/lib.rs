//! Shared data model for the Sentinel trading session kernel.
//!
//! This crate has no I/O and no async dependency: it is the vocabulary every
//! other crate in the workspace (`sentinel-policy`, `sentinel-quote`,
//! `sentinel-ledger`, `sentinel-session`, `sentinel-settlement`,
//! `sentinel-chain`, `sentinel-identity`) speaks, plus the canonical
//! encoding routines that both the off-chain policy engine and the
//! in-process on-chain guard must compute identically.

pub mod asset;
pub mod canonical;
pub mod channel;
pub mod clock;
pub mod decimal;
pub mod error;
pub mod policy;
pub mod ratio;
pub mod session;
pub mod settlement;

pub use asset::Asset;
pub use canonical::CanonicalValue;
pub use clock::{Clock, FixedClock};
pub use channel::{ChannelSession, ChannelSignature, ChannelState, ChannelStatus};
pub use decimal::Decimal;
pub use error::{Result, TypesError};
pub use policy::{PolicyConfig, PolicyDecision, PolicyHash, PolicyRuleResult, SwapProposal};
pub use ratio::Ratio;
pub use session::{BalanceSheet, ExecutionType, SessionBalance, SessionState, SessionStatus, SwapResult};
pub use settlement::{SettlementBalance, SettlementRecord};
