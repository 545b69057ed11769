//! The facade that wires C1–C6 behind the Session Manager and exposes the
//! agent-facing tool surface of spec §6. The MCP transport and HTTP API
//! themselves are out of scope (§1/§6 of `SPEC_FULL.md`); this module is as
//! far as the core goes — every tool call funnels through
//! policy → session → ledger → guard exactly as §9 describes.

use std::sync::Arc;

use ethers::types::Address;
use serde::Serialize;
use tokio::sync::Mutex;

use sentinel_chain::{GuardPolicyMirror, PolicyGuard, Vault};
use sentinel_ledger::{ChannelLedger, CounterpartySigner};
use sentinel_policy::PolicyEngine;
use sentinel_quote::{Quote, QuoteBackend, QuoteOracle};
use sentinel_session::{ProposeOutcome, SessionManager, SessionSummary};
use sentinel_settlement::{LocalChainClient, SettlementClient};
use sentinel_types::{Asset, Decimal, PolicyConfig, PolicyDecision, SessionBalance, SessionState, SettlementRecord};

use crate::clock::WallClock;

/// The uniform envelope every agent-facing tool call returns (§6: "Every
/// tool response carries `{success, data?, error?, policyDecision?,
/// timestamp}`").
#[derive(Clone, Debug, Serialize)]
pub struct ToolResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub policy_decision: Option<PolicyDecision>,
    pub timestamp: u64,
}

impl<T: Serialize> ToolResponse<T> {
    fn ok(data: T, policy_decision: Option<PolicyDecision>, timestamp: u64) -> Self {
        ToolResponse { success: true, data: Some(data), error: None, policy_decision, timestamp }
    }

    fn rejected(policy_decision: PolicyDecision, timestamp: u64) -> Self {
        ToolResponse {
            success: false,
            data: None,
            error: Some("policy rejected the proposal".to_string()),
            policy_decision: Some(policy_decision),
            timestamp,
        }
    }

    fn error(error: impl std::fmt::Display, timestamp: u64) -> Self {
        ToolResponse { success: false, data: None, error: Some(error.to_string()), policy_decision: None, timestamp }
    }
}

/// `get_session_balance` tool output (§6): the requested asset's balance
/// record alongside the whole-session summary.
#[derive(Clone, Debug, Serialize)]
pub struct BalanceView {
    pub asset: Asset,
    pub balance: SessionBalance,
    pub summary: SessionSummary,
}

/// `simulate_swap` tool output: the dry-run quote. `would_approve` and the
/// full rule breakdown travel in the envelope's `policy_decision` field.
#[derive(Clone, Debug, Serialize)]
pub struct SimulateView {
    pub quote: Quote,
    pub would_approve: bool,
}

/// The kernel: one instance owns exactly one session's lifecycle, matching
/// §5's "single logical owner per session" model (`SPEC_FULL.md` §4). A
/// process hosting many sessions constructs one [`Kernel`] per session.
pub struct Kernel<S: CounterpartySigner> {
    session: SessionManager<S, WallClock>,
    vault: Arc<Mutex<Vault>>,
    settlement: SettlementClient<LocalChainClient>,
    clock: WallClock,
}

impl<S: CounterpartySigner> Kernel<S> {
    /// Wire C1 (policy), C2 (quote oracle), C3 (channel ledger, optional —
    /// §9's "memory-only mode" degrades gracefully if `None`), C5
    /// (settlement client), and C6 (guard + vault) into one session-scoped
    /// facade.
    pub fn bootstrap(
        policy_config: PolicyConfig,
        quote_backends: Vec<Box<dyn QuoteBackend>>,
        ledger: Option<ChannelLedger<S>>,
        preview_deposit_usdc: Decimal,
        guard_owner: Address,
        guard_entry_point: Option<Address>,
        guard_policy: GuardPolicyMirror,
        operator: Address,
        wallet_address: String,
    ) -> Self {
        let policy = PolicyEngine::new(policy_config);
        let quote_oracle = QuoteOracle::new(quote_backends);
        let session =
            SessionManager::new(policy, quote_oracle, ledger, WallClock, preview_deposit_usdc);

        let events = sentinel_chain::EventBus::new();
        let guard = PolicyGuard::new(guard_owner, guard_policy, events.clone());
        let vault = Arc::new(Mutex::new(Vault::new(guard_owner, guard_entry_point, guard, events)));
        let chain_client = LocalChainClient::new(vault.clone(), operator);
        let settlement = SettlementClient::new(chain_client, operator, wallet_address);

        Kernel { session, vault, settlement, clock: WallClock }
    }

    pub fn session(&self) -> &SessionManager<S, WallClock> {
        &self.session
    }

    pub fn vault(&self) -> &Arc<Mutex<Vault>> {
        &self.vault
    }

    pub fn policy_hash(&self) -> sentinel_types::PolicyHash {
        self.session.policy().policy_hash()
    }

    /// `open(depositUsdc)` — not itself part of the four-tool surface of
    /// §6 (session creation is driven by whatever hosts the kernel), but
    /// the operation every tool call below requires to have happened first.
    pub async fn open_session(&self, deposit_usdc: Decimal) -> anyhow::Result<SessionState> {
        Ok(self.session.open(deposit_usdc).await?)
    }

    /// `get_session_balance` (§6 tool table).
    pub async fn get_session_balance(&self, asset: Asset) -> ToolResponse<BalanceView> {
        let now = self.clock_now();
        let balance = match self.session.balance(asset).await {
            Ok(balance) => balance,
            Err(err) => return ToolResponse::error(err, now),
        };
        let summary = match self.session.summary().await {
            Ok(summary) => summary,
            Err(err) => return ToolResponse::error(err, now),
        };
        ToolResponse::ok(BalanceView { asset, balance, summary }, None, now)
    }

    /// `simulate_swap` (§6 tool table): never mutates state.
    pub async fn simulate_swap(&self, token_in: Asset, token_out: Asset, amount_in: Decimal) -> ToolResponse<SimulateView> {
        let now = self.clock_now();
        match self.session.simulate_swap(token_in, token_out, amount_in).await {
            Ok(outcome) => ToolResponse::ok(
                SimulateView { quote: outcome.quote, would_approve: outcome.would_approve },
                Some(outcome.decision),
                now,
            ),
            Err(err) => ToolResponse::error(err, now),
        }
    }

    /// `propose_swap` (§6 tool table): the canonical pipeline of §4.4. A
    /// policy rejection is a normal, non-error outcome with `success:
    /// false` and no mutation, per §4.4 step 3 / §7.
    pub async fn propose_swap(
        &self,
        token_in: Asset,
        token_out: Asset,
        amount_in: Decimal,
    ) -> ToolResponse<sentinel_types::SwapResult> {
        let now = self.clock_now();
        match self.session.propose_swap(token_in, token_out, amount_in, None, None).await {
            Ok(ProposeOutcome::Approved { swap, decision }) => ToolResponse::ok(swap, Some(decision), now),
            Ok(ProposeOutcome::Rejected(decision)) => ToolResponse::rejected(decision, now),
            Err(err) => ToolResponse::error(err, now),
        }
    }

    /// `close_session_and_settle` (§6 tool table): closes the session
    /// (final co-signed channel state), settles the final balance sheet
    /// on-chain, then marks the session settled.
    pub async fn close_session_and_settle(&self) -> ToolResponse<SettlementRecord> {
        let now = self.clock_now();
        let closed = match self.session.close().await {
            Ok(session) => session,
            Err(err) => return ToolResponse::error(err, now),
        };
        let record = match self.settlement.settle(&closed).await {
            Ok(record) => record,
            Err(err) => return ToolResponse::error(err, now),
        };
        if let Err(err) = self.session.mark_settled(record.tx_hash.clone()).await {
            return ToolResponse::error(err, now);
        }
        ToolResponse::ok(record, None, now)
    }

    fn clock_now(&self) -> u64 {
        use sentinel_types::Clock;
        self.clock.now()
    }
}
