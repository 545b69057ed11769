use std::collections::BTreeMap;

use ethers::types::{Address, Signature, U256};
use sentinel_types::{Asset, Decimal};

use crate::error::{ChainError, Result};
use crate::events::{ChainEvent, EventBus};
use crate::guard::PolicyGuard;

/// A minimal smart-contract wallet (§4.6): custodies funds, exposes an
/// owner-/entry-point-gated `execute`/`executeBatch` path, a
/// signature-validation entry point for the account-abstraction layer, a
/// strictly incrementing nonce, and the `settleSession` path that
/// atomically re-validates and records a settlement through its
/// [`PolicyGuard`].
///
/// The agent's key never appears in any role here — only `owner` or
/// `entry_point` may initiate execution (§4.6 invariant).
pub struct Vault {
    owner: Address,
    entry_point: Option<Address>,
    nonce: u64,
    guard: PolicyGuard,
    balances: BTreeMap<Asset, Decimal>,
    events: EventBus,
}

impl Vault {
    pub fn new(owner: Address, entry_point: Option<Address>, guard: PolicyGuard, events: EventBus) -> Self {
        Vault { owner, entry_point, nonce: 0, guard, balances: BTreeMap::new(), events }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn balance_of(&self, asset: Asset) -> Decimal {
        self.balances.get(&asset).copied().unwrap_or_else(|| Decimal::zero(asset.decimals()))
    }

    pub fn guard(&self) -> &PolicyGuard {
        &self.guard
    }

    pub fn guard_mut(&mut self) -> &mut PolicyGuard {
        &mut self.guard
    }

    fn authorize(&self, caller: Address, action: &str) -> Result<()> {
        if caller == self.owner || self.entry_point == Some(caller) {
            Ok(())
        } else {
            Err(ChainError::Unauthorized { caller: format!("{caller:?}"), action: action.to_string() })
        }
    }

    /// `receive()` — anyone may deposit custody funds into the vault, as a
    /// real EVM `receive` would accept a plain ETH transfer.
    pub fn receive(&mut self, asset: Asset, amount: Decimal) -> Result<()> {
        let current = self.balance_of(asset);
        let next = current.checked_add(&amount).map_err(|_| ChainError::InvalidSignature)?;
        self.balances.insert(asset, next);
        Ok(())
    }

    /// `execute(target, value, data)` — restricted to `owner` or the
    /// account-abstraction entry point. Increments the nonce for replay
    /// protection of user operations and emits `Executed`.
    pub fn execute(&mut self, caller: Address, target: Address, value: U256, data: Vec<u8>) -> Result<()> {
        self.authorize(caller, "execute")?;
        self.nonce += 1;
        self.events.publish(ChainEvent::Executed { target, value, data });
        Ok(())
    }

    /// `executeBatch` — the same authorization and nonce discipline as
    /// `execute`, applied to every call in order.
    pub fn execute_batch(&mut self, caller: Address, calls: Vec<(Address, U256, Vec<u8>)>) -> Result<()> {
        self.authorize(caller, "executeBatch")?;
        for (target, value, data) in calls {
            self.nonce += 1;
            self.events.publish(ChainEvent::Executed { target, value, data });
        }
        Ok(())
    }

    /// The signature-validation entry point used by the account-abstraction
    /// layer: recovers the signer from the personal-prefixed digest of a
    /// user-operation hash and succeeds iff the signer is the owner (§4.6).
    pub fn validate_user_op(&self, user_op_hash: [u8; 32], signature: &[u8]) -> Result<()> {
        let signature = Signature::try_from(signature).map_err(|_| ChainError::InvalidSignature)?;
        let recovered = signature.recover(user_op_hash.to_vec()).map_err(|_| ChainError::InvalidSignature)?;
        if recovered == self.owner {
            Ok(())
        } else {
            Err(ChainError::InvalidSignature)
        }
    }

    /// `settleSession(sessionId, ...)` — calls the guard's
    /// `validateSettlement`, then `markSettled`, then emits
    /// `SessionSettled(sessionId, operator, usdcDelta, ethDelta, timestamp)`
    /// (§4.6). Both guard calls happen in this one synchronous call, so the
    /// re-validate-then-record pair is atomic the way the spec requires.
    ///
    /// `usdc_final`/`eth_final` are the absolute balances being settled out
    /// of the vault (what the guard's caps bound); `usdc_delta`/`eth_delta`
    /// are the signed amounts the emitted event carries, matching spec §8
    /// scenario 7's `usdcDelta = (deposit - finalUsdc) * 10^6`.
    #[allow(clippy::too_many_arguments)]
    pub fn settle_session(
        &mut self,
        caller: Address,
        session_id: &str,
        token: Asset,
        usdc_final: Decimal,
        eth_final: Decimal,
        usdc_delta: i128,
        eth_delta: i128,
        now: u64,
    ) -> Result<()> {
        self.authorize(caller, "settleSession")?;
        self.guard.validate_settlement(session_id, token, usdc_final, eth_final)?;
        self.guard.mark_settled(session_id);

        self.events.publish(ChainEvent::SessionSettled {
            session_id: session_id.to_string(),
            operator: caller,
            usdc_delta,
            eth_delta,
            timestamp: now,
        });
        tracing::info!(session_id, usdc_delta, eth_delta, "session settled on-chain");
        Ok(())
    }
}
