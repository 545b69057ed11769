//! `sentinel-kernel`: the integration crate. Re-exports the public
//! types/traits of every other crate in the workspace, loads configuration,
//! and wires C1–C6 behind one facade (§3.9 / §6 of `SPEC_FULL.md`).
//!
//! Nothing in this crate talks to a real MCP transport or HTTP listener —
//! that surface is explicitly out of scope (§1). What's here is as far as
//! the core goes: a `Kernel` any transport can be bolted onto.

pub mod clock;
pub mod config;
pub mod error;
pub mod kernel;

pub use clock::WallClock;
pub use config::{ContractsSection, KernelConfig, PolicySection, SessionSection};
pub use error::{KernelError, Result};
pub use kernel::{BalanceView, Kernel, SimulateView, ToolResponse};

// Re-export the component traits/types a host embedding this kernel needs,
// so `sentinel-kernel` alone is enough to construct and drive one — the
// same "one crate re-exports the subsystem" shape as chainflip's `engine`
// crate re-exporting its `state_chain_observer`/`eth` submodules.
pub use sentinel_chain::{ChainEvent, ChainError, EventBus, GuardPolicyMirror, PolicyGuard, Vault};
pub use sentinel_identity::{resolve_and_check, IdentityCheck, IdentityError, NameResolver, POLICY_HASH_RECORD_KEY};
pub use sentinel_ledger::{ChannelLedger, CounterpartySigner, LedgerError, LocalDeterministicSigner};
pub use sentinel_policy::PolicyEngine;
pub use sentinel_quote::{ConstantProductAmm, OnChainQuoter, Quote, QuoteBackend, QuoteOracle};
pub use sentinel_session::{AuditEntry, AuditEventKind, ProposeOutcome, SessionError, SessionManager, SessionSummary};
pub use sentinel_settlement::{ChainClient, LocalChainClient, SettlementClient, SettlementError};
pub use sentinel_types::*;

/// Installs a JSON-formatted `tracing` subscriber reading its filter from
/// `RUST_LOG`, matching the teacher's `engine`-binary bootstrap
/// (`engine/src/main.rs`'s `tracing_subscriber::fmt()` setup). Safe to call
/// more than once; subsequent calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
