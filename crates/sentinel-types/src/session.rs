use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;

use crate::asset::Asset;
use crate::decimal::Decimal;
use crate::error::Result;

/// `none -> active -> closing -> settled`, plus `error` as a terminal sink
/// for unrecoverable invariant violations (§4.4). Closed tagged union, never
/// extended at runtime, transitions are one-way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    None,
    Active,
    Closing,
    Settled,
    Error,
}

impl SessionStatus {
    /// Whether `self -> next` is one of the legal, one-way transitions of
    /// the session state machine.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (None, Active) | (Active, Closing) | (Closing, Settled) | (_, Error)
        )
    }
}

/// Per-asset balance record. `pnl` is a *derived* invariant (§3), computed
/// from `amount - initial_amount`, never stored independently so it cannot
/// drift from the fields that define it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBalance {
    pub amount: Decimal,
    pub initial_amount: Decimal,
}

impl SessionBalance {
    pub fn opening(amount: Decimal) -> Self {
        SessionBalance { amount, initial_amount: amount }
    }

    /// `amount - initialAmount`. Can be negative, so this is computed with
    /// raw minor units rather than the non-negative `checked_sub`.
    pub fn pnl(&self) -> Decimal {
        Decimal::from_minor_units(
            self.amount.minor_units() - self.initial_amount.minor_units(),
            self.amount.scale(),
        )
    }
}

/// Deterministic, order-stable mapping from [`Asset`] to balance record.
/// Iteration order is never semantically observable (per §9), but a
/// `BTreeMap` keeps test assertions and canonical encodings reproducible.
pub type BalanceSheet = BTreeMap<Asset, SessionBalance>;

/// Which side of the pipeline executed a swap: off-chain (the channel
/// ledger) or on-chain (post-settlement). The spec's `SwapResult` always
/// records `offchain` prior to settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionType {
    Offchain,
    Onchain,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResult {
    pub proposal_id: String,
    pub success: bool,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub executed_price: Decimal,
    pub execution_type: ExecutionType,
    pub timestamp: u64,
}

/// The authoritative off-chain view of a session, owned exclusively by the
/// Session Manager (§3/§5).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub status: SessionStatus,
    pub balances: BalanceSheet,
    pub history: Vec<SwapResult>,
    pub opened_at: u64,
    pub closed_at: Option<u64>,
    pub settlement_tx_hash: Option<String>,
}

impl SessionState {
    pub fn open(session_id: String, balances: BalanceSheet, opened_at: u64) -> Self {
        SessionState {
            session_id,
            status: SessionStatus::Active,
            balances,
            history: Vec::new(),
            opened_at,
            closed_at: None,
            settlement_tx_hash: None,
        }
    }

    /// Enforce the one-way state machine; see [`SessionStatus::can_transition_to`].
    pub fn transition(&mut self, next: SessionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(crate::error::TypesError::IllegalTransition(format!(
                "session {:?} -> {:?}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Checks the per-balance half of the §8 universal invariant: `pnl ==
    /// amount - initialAmount` for every asset. The other half (that the
    /// sum of history deltas equals that pnl) is checked by the session
    /// manager, which is the only component that knows which side of each
    /// swap result touched which asset.
    pub fn balances_consistent_with_pnl(&self) -> bool {
        self.balances
            .values()
            .all(|b| b.pnl().minor_units() == b.amount.minor_units() - b.initial_amount.minor_units())
    }
}
