//! C6: the on-chain Policy Guard & Vault, reimplemented as a deterministic
//! in-process validator with the exact call surface the real contracts
//! would have (see `SPEC_FULL.md` §5 for why this workspace has no EVM
//! toolchain). `sentinel-settlement` talks to this crate through a
//! `ChainClient` trait, so a real `ethers::Provider`-backed implementation
//! is a drop-in replacement without touching any other crate.

pub mod error;
pub mod events;
pub mod guard;
pub mod vault;

pub use error::{ChainError, Result};
pub use events::{ChainEvent, EventBus};
pub use guard::{GuardPolicyMirror, PolicyGuard};
pub use vault::Vault;
