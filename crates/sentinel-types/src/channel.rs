use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;

use crate::asset::Asset;
use crate::canonical::CanonicalValue;
use crate::decimal::Decimal;

/// `prefund -> open -> running -> closing -> finalized` (§4.3). No
/// transition is reversible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum ChannelStatus {
    Prefund,
    Open,
    Running,
    Closing,
    Finalized,
}

impl ChannelStatus {
    pub fn can_transition_to(&self, next: ChannelStatus) -> bool {
        use ChannelStatus::*;
        matches!(
            (self, next),
            (Prefund, Open) | (Open, Running) | (Running, Closing) | (Closing, Finalized)
        )
    }
}

/// A raw 65-byte ECDSA signature (r || s || v) over a [`ChannelState`]
/// digest, in the form the secp256k1 signer/verifier in `sentinel-ledger`
/// produces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSignature(pub Vec<u8>);

/// A single numbered, co-signed snapshot of channel balances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    pub channel_id: String,
    pub turn_num: u64,
    pub balances: BTreeMap<Asset, Decimal>,
    pub state_hash: [u8; 32],
    pub signatures: Vec<ChannelSignature>,
    pub timestamp: u64,
}

impl ChannelState {
    /// The canonical encoding the digest is computed over, per §4.3:
    /// `H(canonical_encode({channelId, turnNum, balances}))` with balance
    /// keys sorted and amounts emitted as fixed-decimal strings.
    pub fn canonicalize(channel_id: &str, turn_num: u64, balances: &BTreeMap<Asset, Decimal>) -> CanonicalValue {
        CanonicalValue::object(vec![
            ("channelId", CanonicalValue::Text(channel_id.to_string())),
            ("turnNum", CanonicalValue::Integer(turn_num as i128)),
            (
                "balances",
                CanonicalValue::sorted_array(balances.iter().collect::<Vec<_>>(), |(asset, amount)| {
                    CanonicalValue::object(vec![
                        ("asset", CanonicalValue::Text(asset.symbol().to_string())),
                        ("amount", CanonicalValue::Text(amount.to_fixed_string())),
                    ])
                }),
            ),
        ])
    }

    pub fn digest(channel_id: &str, turn_num: u64, balances: &BTreeMap<Asset, Decimal>) -> [u8; 32] {
        Self::canonicalize(channel_id, turn_num, balances).digest()
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signatures.len() == 2
    }
}

/// Owned exclusively by the Channel Ledger (§3); the Session Manager only
/// holds a read reference to derive summaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSession {
    pub channel_id: String,
    pub status: ChannelStatus,
    pub participants: [String; 2],
    pub current_state: ChannelState,
    pub state_history: Vec<ChannelState>,
    pub opened_at: u64,
    pub closed_at: Option<u64>,
}

impl ChannelSession {
    /// `turnNum` of `currentState` equals `len(stateHistory) - 1` (§4.3/§8),
    /// checked after every accepted mutation.
    pub fn turn_matches_history(&self) -> bool {
        self.current_state.turn_num as usize + 1 == self.state_history.len()
    }
}
