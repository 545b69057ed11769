use serde::{Deserialize, Serialize};

/// One settled balance line item, in on-chain integer minor units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementBalance {
    pub asset_symbol: String,
    pub minor_units: i128,
}

/// The receipt of a finalized, on-chain-recorded session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub session_id: String,
    pub wallet_address: String,
    pub balances: Vec<SettlementBalance>,
    pub tx_hash: String,
    pub block_number: u64,
    pub timestamp: u64,
}
