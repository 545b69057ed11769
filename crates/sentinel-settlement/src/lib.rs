//! C5: the settlement client. Encodes a finalized session for on-chain
//! submission, awaits confirmation, and parses the settlement event (§4.5).

pub mod chain_client;
pub mod client;
pub mod error;

pub use chain_client::{ChainClient, ChainConfirmation, LocalChainClient};
pub use client::SettlementClient;
pub use error::{Result, SettlementError};
