//! C3: the channel ledger. Holds the authoritative off-chain balance sheet
//! as a sequence of monotonically numbered, co-signed states (§4.3).

pub mod error;
pub mod signer;

pub use error::{LedgerError, Result};
pub use signer::{recover, CounterpartySigner, LocalDeterministicSigner};

use std::collections::BTreeMap;

use ethers::types::Address;
use sentinel_types::{Asset, ChannelSession, ChannelSignature, ChannelState, ChannelStatus, Decimal};

/// A single-session channel ledger. Owns exactly one [`ChannelSession`] at a
/// time; every mutating call is `&mut self` so callers serialize access the
/// same way the spec's §5 single-owner-per-session model requires.
pub struct ChannelLedger<S: CounterpartySigner> {
    operator_wallet: ethers::signers::LocalWallet,
    counterparty: S,
    channel: Option<ChannelSession>,
}

impl<S: CounterpartySigner> ChannelLedger<S> {
    pub fn new(operator_wallet: ethers::signers::LocalWallet, counterparty: S) -> Self {
        ChannelLedger { operator_wallet, counterparty, channel: None }
    }

    fn operator_address(&self) -> Address {
        use ethers::signers::Signer;
        self.operator_wallet.address()
    }

    /// Sign `digest` with both participants and verify each signature
    /// recovers to the address it claims to be from, per §4.3: "it verifies
    /// that both signatures recover to the expected participant addresses
    /// before accepting a state".
    async fn co_sign(&self, digest: [u8; 32]) -> Result<Vec<ChannelSignature>> {
        use ethers::signers::Signer;

        let operator_sig = self
            .operator_wallet
            .sign_message(digest.to_vec())
            .await
            .map_err(|e| LedgerError::TransportFailure(e.to_string()))?
            .to_vec();
        if recover(&operator_sig, digest)? != self.operator_address() {
            return Err(LedgerError::SignatureMismatch("operator signature did not recover".to_string()));
        }

        let counterparty_sig = self.counterparty.co_sign(digest).await?;
        if recover(&counterparty_sig, digest)? != self.counterparty.address() {
            return Err(LedgerError::SignatureMismatch(
                "counterparty signature did not recover".to_string(),
            ));
        }

        Ok(vec![ChannelSignature(operator_sig), ChannelSignature(counterparty_sig)])
    }

    async fn build_state(
        &self,
        channel_id: &str,
        turn_num: u64,
        balances: BTreeMap<Asset, Decimal>,
        now: u64,
    ) -> Result<ChannelState> {
        let state_hash = ChannelState::digest(channel_id, turn_num, &balances);
        let signatures = self.co_sign(state_hash).await?;
        Ok(ChannelState {
            channel_id: channel_id.to_string(),
            turn_num,
            balances,
            state_hash,
            signatures,
            timestamp: now,
        })
    }

    /// Creates a turn-0 state, signs it, and transitions
    /// `prefund -> open -> running` in one call, per §4.3. Legal only when
    /// no channel is open yet, or the previous one has been finalized.
    pub async fn open(
        &mut self,
        channel_id: String,
        initial_balances: BTreeMap<Asset, Decimal>,
        now: u64,
    ) -> Result<ChannelSession> {
        if let Some(existing) = &self.channel {
            if existing.status != ChannelStatus::Finalized {
                return Err(LedgerError::StateError(format!(
                    "cannot open: channel {} is {:?}",
                    existing.channel_id, existing.status
                )));
            }
        }

        let state = self.build_state(&channel_id, 0, initial_balances, now).await?;
        let session = ChannelSession {
            channel_id,
            status: ChannelStatus::Running,
            participants: [self.operator_address().to_string(), self.counterparty.address().to_string()],
            current_state: state.clone(),
            state_history: vec![state],
            opened_at: now,
            closed_at: None,
        };
        self.channel = Some(session.clone());
        tracing::info!(channel_id = %session.channel_id, "channel opened");
        Ok(session)
    }

    /// Creates turn `n+1`, both parties sign, and the new state is appended
    /// to history. Requires the channel to be `running`.
    ///
    /// Idempotent by `(channelId, balances)`: if the requested balances are
    /// identical to the already-committed current state (the caller retrying
    /// after a transport timeout without knowing whether the prior attempt
    /// landed), the existing state is returned rather than minting a
    /// duplicate turn.
    pub async fn update(&mut self, new_balances: BTreeMap<Asset, Decimal>, now: u64) -> Result<ChannelState> {
        let session = self
            .channel
            .as_ref()
            .ok_or_else(|| LedgerError::StateError("no channel is open".to_string()))?;
        if session.status != ChannelStatus::Running {
            return Err(LedgerError::StateError(format!(
                "cannot update: channel is {:?}, not running",
                session.status
            )));
        }
        if session.current_state.balances == new_balances {
            return Ok(session.current_state.clone());
        }

        let channel_id = session.channel_id.clone();
        let next_turn = session.current_state.turn_num + 1;
        let state = self.build_state(&channel_id, next_turn, new_balances, now).await?;

        let session = self.channel.as_mut().expect("checked above");
        session.state_history.push(state.clone());
        session.current_state = state.clone();
        tracing::debug!(channel_id = %channel_id, turn = next_turn, "channel state updated");
        Ok(state)
    }

    /// Creates a final turn, both parties sign, and the channel transitions
    /// `running -> closing -> finalized`. No further mutation is permitted
    /// afterward.
    pub async fn close(&mut self, now: u64) -> Result<ChannelSession> {
        let session = self
            .channel
            .as_ref()
            .ok_or_else(|| LedgerError::StateError("no channel is open".to_string()))?;
        if session.status != ChannelStatus::Running {
            return Err(LedgerError::StateError(format!(
                "cannot close: channel is {:?}, not running",
                session.status
            )));
        }

        let channel_id = session.channel_id.clone();
        let next_turn = session.current_state.turn_num + 1;
        let final_balances = session.current_state.balances.clone();
        let state = self.build_state(&channel_id, next_turn, final_balances, now).await?;

        let session = self.channel.as_mut().expect("checked above");
        session.state_history.push(state.clone());
        session.current_state = state;
        session.status = ChannelStatus::Finalized;
        session.closed_at = Some(now);
        tracing::info!(channel_id = %channel_id, "channel finalized");
        Ok(session.clone())
    }

    pub fn latest_hash(&self) -> Option<[u8; 32]> {
        self.channel.as_ref().map(|c| c.current_state.state_hash)
    }

    pub fn get_channel(&self) -> Option<&ChannelSession> {
        self.channel.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::signers::LocalWallet;
    use sentinel_types::Asset;

    fn ledger() -> ChannelLedger<LocalDeterministicSigner> {
        let operator = LocalWallet::new(&mut rand::thread_rng());
        let counterparty = LocalDeterministicSigner::new(LocalWallet::new(&mut rand::thread_rng()));
        ChannelLedger::new(operator, counterparty)
    }

    fn balances(usdc: &str) -> BTreeMap<Asset, Decimal> {
        let mut map = BTreeMap::new();
        map.insert(Asset::Usdc, Decimal::parse(usdc, 6).unwrap());
        map.insert(Asset::Eth, Decimal::zero(18));
        map
    }

    #[tokio::test]
    async fn open_produces_a_fully_signed_turn_zero_state() {
        let mut ledger = ledger();
        let session = ledger.open("chan-1".to_string(), balances("1000"), 0).await.unwrap();
        assert_eq!(session.status, ChannelStatus::Running);
        assert_eq!(session.current_state.turn_num, 0);
        assert!(session.current_state.is_fully_signed());
        assert!(session.turn_matches_history());
    }

    #[tokio::test]
    async fn update_increments_turn_and_appends_history() {
        let mut ledger = ledger();
        ledger.open("chan-1".to_string(), balances("1000"), 0).await.unwrap();
        let state = ledger.update(balances("980"), 1).await.unwrap();
        assert_eq!(state.turn_num, 1);
        let session = ledger.get_channel().unwrap();
        assert_eq!(session.state_history.len(), 2);
        assert!(session.turn_matches_history());
    }

    #[tokio::test]
    async fn update_before_open_is_a_state_error() {
        let mut ledger = ledger();
        let err = ledger.update(balances("1000"), 0).await.unwrap_err();
        assert!(matches!(err, LedgerError::StateError(_)));
    }

    #[tokio::test]
    async fn close_produces_n_plus_two_states() {
        let mut ledger = ledger();
        ledger.open("chan-1".to_string(), balances("1000"), 0).await.unwrap();
        ledger.update(balances("980"), 1).await.unwrap();
        ledger.update(balances("960"), 2).await.unwrap();
        let session = ledger.close(3).await.unwrap();
        assert_eq!(session.status, ChannelStatus::Finalized);
        // open + 2 updates + final close = 4 states.
        assert_eq!(session.state_history.len(), 4);
    }

    #[tokio::test]
    async fn update_after_close_is_rejected() {
        let mut ledger = ledger();
        ledger.open("chan-1".to_string(), balances("1000"), 0).await.unwrap();
        ledger.close(1).await.unwrap();
        let err = ledger.update(balances("900"), 2).await.unwrap_err();
        assert!(matches!(err, LedgerError::StateError(_)));
    }

    #[tokio::test]
    async fn retrying_the_same_update_is_idempotent() {
        let mut ledger = ledger();
        ledger.open("chan-1".to_string(), balances("1000"), 0).await.unwrap();
        let first = ledger.update(balances("980"), 1).await.unwrap();
        let retried = ledger.update(balances("980"), 1).await.unwrap();
        assert_eq!(first, retried);
        assert_eq!(ledger.get_channel().unwrap().state_history.len(), 2);
    }
}
