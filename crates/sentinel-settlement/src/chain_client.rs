use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::Address;
use sentinel_chain::{ChainError, PolicyGuard, Vault};
use sentinel_types::{Asset, Decimal};
use tokio::sync::Mutex;

use crate::error::{Result, SettlementError};

/// What the settlement client learns back from a confirmed settlement
/// transaction: the same fields a parsed `SessionSettled` event carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainConfirmation {
    pub block_number: u64,
    pub operator: Address,
    pub usdc_delta: i128,
    pub eth_delta: i128,
    pub timestamp: u64,
}

/// The seam between `sentinel-settlement` and "the chain". A real
/// implementation talks to an `ethers::Provider` over JSON-RPC; this
/// workspace's only implementation, [`LocalChainClient`], talks straight to
/// an in-process [`Vault`]/[`PolicyGuard`] pair (§5 of `SPEC_FULL.md`).
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// A read-only call against the guard, surfacing rejections before the
    /// caller spends gas on a doomed submission (§4.5a).
    async fn pre_validate(
        &self,
        session_id: &str,
        token: Asset,
        usdc_amount: Decimal,
        eth_amount: Decimal,
    ) -> Result<()>;

    /// Submits the settlement transaction and returns its transaction hash.
    /// `usdc_final`/`eth_final` are the absolute balances being withdrawn
    /// (what the guard's caps bound); `usdc_delta`/`eth_delta` are the
    /// signed amounts the emitted event carries (§8 scenario 7).
    #[allow(clippy::too_many_arguments)]
    async fn submit_settlement(
        &self,
        session_id: &str,
        operator: Address,
        token: Asset,
        usdc_final: Decimal,
        eth_final: Decimal,
        usdc_delta: i128,
        eth_delta: i128,
        now: u64,
    ) -> Result<String>;

    /// Awaits one confirmation and returns the parsed `SessionSettled`
    /// event fields for `tx_hash`.
    async fn await_confirmation(&self, tx_hash: &str) -> Result<ChainConfirmation>;
}

/// Talks directly to an in-process [`Vault`], standing in for a real
/// `ethers::Provider`-backed client. Submission and confirmation are
/// modeled as two distinct steps even though nothing here actually waits
/// on block time, so the retry/idempotence behavior the spec describes
/// (§4.5/§7) is exercised the same way it would be against a real chain.
pub struct LocalChainClient {
    vault: Arc<Mutex<Vault>>,
    caller: Address,
    block_number: AtomicU64,
    confirmations: Mutex<BTreeMap<String, ChainConfirmation>>,
}

impl LocalChainClient {
    pub fn new(vault: Arc<Mutex<Vault>>, caller: Address) -> Self {
        LocalChainClient { vault, caller, block_number: AtomicU64::new(1), confirmations: Mutex::new(BTreeMap::new()) }
    }

    fn tx_hash(session_id: &str, nonce: u64) -> String {
        use sha3::{Digest, Keccak256};
        let mut hasher = Keccak256::new();
        hasher.update(session_id.as_bytes());
        hasher.update(nonce.to_be_bytes());
        format!("0x{}", hex::encode(hasher.finalize()))
    }
}

#[async_trait]
impl ChainClient for LocalChainClient {
    async fn pre_validate(
        &self,
        session_id: &str,
        token: Asset,
        usdc_amount: Decimal,
        eth_amount: Decimal,
    ) -> Result<()> {
        let vault = self.vault.lock().await;
        vault
            .guard()
            .validate_settlement(session_id, token, usdc_amount, eth_amount)
            .map_err(|e| SettlementError::PreValidationRejected(e.to_string()))
    }

    async fn submit_settlement(
        &self,
        session_id: &str,
        operator: Address,
        token: Asset,
        usdc_final: Decimal,
        eth_final: Decimal,
        usdc_delta: i128,
        eth_delta: i128,
        now: u64,
    ) -> Result<String> {
        let mut vault = self.vault.lock().await;
        let nonce = vault.get_nonce();
        let tx_hash = Self::tx_hash(session_id, nonce);

        vault
            .settle_session(self.caller, session_id, token, usdc_final, eth_final, usdc_delta, eth_delta, now)
            .map_err(|e| match e {
                ChainError::AlreadySettled(_)
                | ChainError::UsdcCapExceeded { .. }
                | ChainError::EthCapExceeded { .. }
                | ChainError::TokenNotAllowed(_) => SettlementError::PreValidationRejected(e.to_string()),
                ChainError::Unauthorized { .. } | ChainError::InvalidSignature => {
                    SettlementError::TransportFailure(e.to_string())
                }
            })?;

        let block_number = self.block_number.fetch_add(1, Ordering::SeqCst);
        self.confirmations.lock().await.insert(
            tx_hash.clone(),
            ChainConfirmation { block_number, operator, usdc_delta, eth_delta, timestamp: now },
        );
        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: &str) -> Result<ChainConfirmation> {
        self.confirmations
            .lock()
            .await
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| SettlementError::EventNotFound(tx_hash.to_string()))
    }
}
