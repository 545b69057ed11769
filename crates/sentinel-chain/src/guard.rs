use std::collections::BTreeSet;

use ethers::types::Address;
use sentinel_types::{Asset, Decimal, PolicyHash};

use crate::error::{ChainError, Result};
use crate::events::{ChainEvent, EventBus};

/// The on-chain guard's mirror of the policy configuration (§4.6). This is
/// deliberately a narrower shape than [`sentinel_types::PolicyConfig`]: the
/// guard only needs settlement caps, the allowed-token set, and the hash it
/// is meant to match, not the full off-chain rule parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardPolicyMirror {
    pub max_settlement_usdc: Decimal,
    pub max_settlement_eth: Decimal,
    pub allowed_tokens: BTreeSet<Asset>,
    pub policy_hash: PolicyHash,
}

/// The on-chain policy guard: final re-validation of per-session caps,
/// allowed assets, and replay, before a settlement is recorded (§4.6).
pub struct PolicyGuard {
    owner: Address,
    policy: GuardPolicyMirror,
    settled_sessions: BTreeSet<String>,
    events: EventBus,
}

impl PolicyGuard {
    pub fn new(owner: Address, policy: GuardPolicyMirror, events: EventBus) -> Self {
        PolicyGuard { owner, policy, settled_sessions: BTreeSet::new(), events }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn get_policy(&self) -> &GuardPolicyMirror {
        &self.policy
    }

    pub fn policy_hash(&self) -> PolicyHash {
        self.policy.policy_hash
    }

    pub fn is_token_allowed(&self, token: Asset) -> bool {
        self.policy.allowed_tokens.contains(&token)
    }

    pub fn settled_sessions(&self, session_id: &str) -> bool {
        self.settled_sessions.contains(session_id)
    }

    /// `validateSettlement(sessionId, token, usdcAmount, ethAmount) -> bool`
    /// (§4.6), expressed as a `Result` so the specific failing invariant is
    /// reported rather than a bare boolean.
    pub fn validate_settlement(
        &self,
        session_id: &str,
        token: Asset,
        usdc_amount: Decimal,
        eth_amount: Decimal,
    ) -> Result<()> {
        if self.settled_sessions(session_id) {
            return Err(ChainError::AlreadySettled(session_id.to_string()));
        }
        if usdc_amount.minor_units() > self.policy.max_settlement_usdc.minor_units() {
            return Err(ChainError::UsdcCapExceeded {
                value: usdc_amount.to_fixed_string(),
                limit: self.policy.max_settlement_usdc.to_fixed_string(),
            });
        }
        if eth_amount.minor_units() > self.policy.max_settlement_eth.minor_units() {
            return Err(ChainError::EthCapExceeded {
                value: eth_amount.to_fixed_string(),
                limit: self.policy.max_settlement_eth.to_fixed_string(),
            });
        }
        if !self.is_token_allowed(token) && !usdc_amount.is_zero() {
            return Err(ChainError::TokenNotAllowed(token.symbol().to_string()));
        }
        Ok(())
    }

    /// Flips the replay bit for `session_id`. Deliberately `pub(crate)`:
    /// spec §9's second Open Question is resolved here by tightening this
    /// to "only callable by the Vault" — the only public path to this
    /// method is [`crate::vault::Vault::settle_session`], which validates
    /// and marks atomically in the same call.
    pub(crate) fn mark_settled(&mut self, session_id: &str) {
        self.settled_sessions.insert(session_id.to_string());
    }

    /// `updatePolicy(newConfig)` — restricted to the guard's owner, emits
    /// an old-to-new hash transition event (§4.6).
    pub fn update_policy(&mut self, caller: Address, new_policy: GuardPolicyMirror, now: u64) -> Result<()> {
        if caller != self.owner {
            return Err(ChainError::Unauthorized {
                caller: format!("{caller:?}"),
                action: "updatePolicy".to_string(),
            });
        }
        let old_hash = self.policy.policy_hash;
        let new_hash = new_policy.policy_hash;
        self.policy = new_policy;
        self.events.publish(ChainEvent::PolicyUpdated { old_hash, new_hash, timestamp: now });
        tracing::info!(%old_hash, %new_hash, "policy updated");
        Ok(())
    }
}
