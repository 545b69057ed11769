use std::collections::BTreeMap;

use serde::Serialize;
use sentinel_ledger::{CounterpartySigner, ChannelLedger};
use sentinel_policy::PolicyEngine;
use sentinel_quote::{Quote, QuoteOracle};
use sentinel_types::{
    Asset, BalanceSheet, Clock, Decimal, ExecutionType, PolicyDecision, SessionBalance, SessionState,
    SessionStatus, SwapProposal, SwapResult,
};
use tokio::sync::{Mutex, RwLock};

use crate::audit::{AuditEntry, AuditEventKind};
use crate::error::{Result, SessionError};
use crate::ids::{generate_channel_id, generate_proposal_id, generate_session_id};

/// `proposeSwap`'s default slippage bound when the caller does not name one
/// (§4.4).
pub const DEFAULT_MAX_SLIPPAGE_BPS: u32 = 50;
/// `proposeSwap`'s default venue when the caller does not name one (§4.4).
pub const DEFAULT_DEX: &str = "default-venue";

/// The outcome of [`SessionManager::propose_swap`]. A rejection is a normal
/// outcome, not an error — §4.4 step 3: "record a rejection event and
/// return without mutating any balance or channel state."
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProposeOutcome {
    Approved { swap: SwapResult, decision: PolicyDecision },
    Rejected(PolicyDecision),
}

impl ProposeOutcome {
    pub fn decision(&self) -> &PolicyDecision {
        match self {
            ProposeOutcome::Approved { decision, .. } => decision,
            ProposeOutcome::Rejected(decision) => decision,
        }
    }
}

/// The outcome of [`SessionManager::simulate_swap`]: a dry-run quote plus
/// would-be policy decision, never mutating anything (§4.4).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulateOutcome {
    pub quote: Quote,
    pub would_approve: bool,
    pub decision: PolicyDecision,
    /// `None` when simulated against the synthetic preview balance sheet
    /// because no session is currently active.
    pub session_id: Option<String>,
}

/// A read-only view of the current session for the `get_session_balance`
/// tool and the dashboard's `/api/status` (§6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub status: SessionStatus,
    pub balances: BalanceSheet,
    pub history_len: usize,
}

struct Inner {
    session: Option<SessionState>,
    /// Set once `open` successfully establishes a channel; cleared (stays
    /// false) if no transport is configured at all, or if the channel
    /// degrades during `open` (§4.4/§7).
    channel_active: bool,
    audit_log: Vec<AuditEntry>,
    sequence: u64,
}

impl Inner {
    fn audit(&mut self, timestamp: u64, kind: AuditEventKind, correlation_id: impl Into<String>, detail: impl Into<String>) {
        self.sequence += 1;
        self.audit_log.push(AuditEntry {
            sequence: self.sequence,
            timestamp,
            kind,
            correlation_id: correlation_id.into(),
            detail: detail.into(),
        });
    }
}

/// C4: the session manager. Owns the balance map exclusively, drives the
/// policy → ledger pipeline, and exposes balance and summary views (§4.4).
///
/// One instance owns exactly one session's lifecycle, matching §5's
/// "single logical owner per session" model — a process hosting many
/// sessions constructs one `SessionManager` per session. `propose_swap` is
/// serialized through `inner`'s write lock so that at most one proposal is
/// ever between its quote and its ledger commit at a time (§5).
pub struct SessionManager<S: CounterpartySigner, C: Clock> {
    policy: PolicyEngine,
    quote_oracle: QuoteOracle,
    ledger: Option<Mutex<ChannelLedger<S>>>,
    clock: C,
    /// Balance sheet used to dry-run `simulate_swap` when no session is
    /// active yet, so a caller can preview a trade before `open` (§4.4).
    preview_deposit_usdc: Decimal,
    inner: RwLock<Inner>,
}

impl<S: CounterpartySigner, C: Clock> SessionManager<S, C> {
    pub fn new(
        policy: PolicyEngine,
        quote_oracle: QuoteOracle,
        ledger: Option<ChannelLedger<S>>,
        clock: C,
        preview_deposit_usdc: Decimal,
    ) -> Self {
        SessionManager {
            policy,
            quote_oracle,
            ledger: ledger.map(Mutex::new),
            clock,
            preview_deposit_usdc,
            inner: RwLock::new(Inner {
                session: None,
                channel_active: false,
                audit_log: Vec::new(),
                sequence: 0,
            }),
        }
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    /// `open(depositUsdc) -> SessionState` (§4.4). Initial balances are
    /// `{USDC: deposit, ETH: 0}`. If a channel transport is configured,
    /// connects and opens the channel over the same balances; on transport
    /// failure the session still opens, in memory-only mode, with the
    /// degradation recorded in the audit log.
    pub async fn open(&self, deposit_usdc: Decimal) -> Result<SessionState> {
        let now = self.clock.now();
        let mut guard = self.inner.write().await;
        if guard.session.is_some() {
            return Err(SessionError::StateError("session already opened on this manager".to_string()));
        }

        let session_id = generate_session_id();
        let mut balances = BalanceSheet::new();
        balances.insert(Asset::Usdc, SessionBalance::opening(deposit_usdc));
        balances.insert(Asset::Eth, SessionBalance::opening(Decimal::zero(Asset::Eth.decimals())));

        if let Some(ledger) = self.ledger.as_ref() {
            let channel_id = generate_channel_id();
            let mut ledger_guard = ledger.lock().await;
            match ledger_guard.open(channel_id, project_balances(&balances), now).await {
                Ok(_) => guard.channel_active = true,
                Err(err) => {
                    tracing::warn!(%session_id, error = %err, "channel transport failed at open, degrading to memory-only mode");
                    guard.audit(
                        now,
                        AuditEventKind::ChannelDegraded,
                        session_id.clone(),
                        format!("channel open failed, continuing memory-only: {err}"),
                    );
                }
            }
        }

        let session = SessionState::open(session_id.clone(), balances, now);
        guard.audit(now, AuditEventKind::SessionOpened, session_id, "session opened");
        guard.session = Some(session.clone());
        Ok(session)
    }

    /// `simulateSwap(in, out, amount)` (§4.4): composes the quote oracle
    /// then dry-runs the policy engine against the current balances, or a
    /// synthetic preview balance sheet if no session is active yet. Never
    /// mutates state.
    pub async fn simulate_swap(&self, token_in: Asset, token_out: Asset, amount_in: Decimal) -> Result<SimulateOutcome> {
        let quote = self.quote_oracle.quote(token_in, token_out, amount_in).await?;
        let now = self.clock.now();

        let (balances, session_id) = {
            let guard = self.inner.read().await;
            match &guard.session {
                Some(session) => (session.balances.clone(), Some(session.session_id.clone())),
                None => (self.synthetic_preview_balances(), None),
            }
        };

        let proposal = SwapProposal {
            id: generate_proposal_id(),
            token_in,
            token_out,
            amount_in,
            estimated_amount_out: quote.estimated_amount_out,
            max_slippage_bps: DEFAULT_MAX_SLIPPAGE_BPS,
            dex: DEFAULT_DEX.to_string(),
            timestamp: now,
        };
        let decision = self.policy.evaluate(&proposal, &balances, now);

        {
            let mut guard = self.inner.write().await;
            guard.audit(
                now,
                AuditEventKind::SwapSimulated,
                proposal.id.clone(),
                format!("would_approve={}", decision.approved),
            );
        }

        Ok(SimulateOutcome { quote, would_approve: decision.approved, decision, session_id })
    }

    /// The canonical `proposeSwap` pipeline of §4.4: quote → build proposal
    /// → evaluate → (if approved) check sufficiency → apply delta → commit
    /// to the channel ledger → append history. A rejection short-circuits
    /// before any mutation.
    pub async fn propose_swap(
        &self,
        token_in: Asset,
        token_out: Asset,
        amount_in: Decimal,
        max_slippage_bps: Option<u32>,
        dex: Option<String>,
    ) -> Result<ProposeOutcome> {
        let max_slippage_bps = max_slippage_bps.unwrap_or(DEFAULT_MAX_SLIPPAGE_BPS);
        let dex = dex.unwrap_or_else(|| DEFAULT_DEX.to_string());

        // Suspension point 1: the quote call. No lock held, so concurrent
        // `simulate_swap` calls (and other proposals' quotes) may proceed.
        let quote = self.quote_oracle.quote(token_in, token_out, amount_in).await?;
        let now = self.clock.now();

        // From here until the ledger commit, the write lock serializes
        // against every other proposal on this session (§5).
        let mut guard = self.inner.write().await;
        let status = guard
            .session
            .as_ref()
            .ok_or_else(|| SessionError::StateError("no active session".to_string()))?
            .status;
        if status != SessionStatus::Active {
            return Err(SessionError::StateError(format!("cannot propose a swap while session is {status:?}")));
        }

        let proposal = SwapProposal {
            id: generate_proposal_id(),
            token_in,
            token_out,
            amount_in,
            estimated_amount_out: quote.estimated_amount_out,
            max_slippage_bps,
            dex,
            timestamp: now,
        };

        let session = guard.session.as_ref().expect("checked above");
        let decision = self.policy.evaluate(&proposal, &session.balances, now);

        if !decision.approved {
            guard.audit(now, AuditEventKind::SwapRejected, proposal.id.clone(), rejection_summary(&decision));
            return Ok(ProposeOutcome::Rejected(decision));
        }

        let session = guard.session.as_ref().expect("checked above");
        let balance_in = session
            .balances
            .get(&token_in)
            .ok_or_else(|| SessionError::StateError(format!("no balance entry for {token_in}")))?;
        if balance_in.amount.minor_units() < proposal.amount_in.minor_units() {
            return Err(SessionError::InsufficientBalance {
                asset: token_in.symbol().to_string(),
                available: balance_in.amount.to_fixed_string(),
                requested: proposal.amount_in.to_fixed_string(),
            });
        }

        let mut new_balances = session.balances.clone();
        apply_delta(&mut new_balances, token_in, token_out, &proposal)?;

        // Suspension point 2: the channel update. Held across the await,
        // same as the teacher's tokio::Mutex-guarded critical sections —
        // the write lock stays acquired, so no other proposal can observe
        // a balance sheet between the policy check and the ledger commit.
        if self.ledger.is_some() && guard.channel_active {
            let ledger = self.ledger.as_ref().expect("checked is_some above");
            let mut ledger_guard = ledger.lock().await;
            if let Err(err) = ledger_guard.update(project_balances(&new_balances), now).await {
                guard.audit(now, AuditEventKind::SwapRolledBack, proposal.id.clone(), err.to_string());
                return Err(err.into());
            }
        }

        let swap_result = SwapResult {
            proposal_id: proposal.id.clone(),
            success: true,
            amount_in: proposal.amount_in,
            amount_out: proposal.estimated_amount_out,
            executed_price: executed_price(proposal.amount_in, proposal.estimated_amount_out),
            execution_type: ExecutionType::Offchain,
            timestamp: now,
        };

        let session = guard.session.as_mut().expect("checked above");
        session.balances = new_balances;
        session.history.push(swap_result.clone());
        guard.audit(now, AuditEventKind::SwapApproved, proposal.id, "swap applied");

        Ok(ProposeOutcome::Approved { swap: swap_result, decision })
    }

    /// `close() -> SessionState` (§4.4): `active -> closing`, then closes
    /// the channel (final co-signed state). Final: once closing, no
    /// further swaps are admitted even if the channel close hasn't
    /// completed (§5).
    pub async fn close(&self) -> Result<SessionState> {
        let now = self.clock.now();
        let mut guard = self.inner.write().await;
        let session_id = {
            let session = guard
                .session
                .as_mut()
                .ok_or_else(|| SessionError::StateError("no active session to close".to_string()))?;
            session
                .transition(SessionStatus::Closing)
                .map_err(|e| SessionError::StateError(e.to_string()))?;
            session.closed_at = Some(now);
            session.session_id.clone()
        };
        guard.audit(now, AuditEventKind::SessionClosing, session_id.clone(), "session closing");

        if self.ledger.is_some() && guard.channel_active {
            let ledger = self.ledger.as_ref().expect("checked is_some above");
            let mut ledger_guard = ledger.lock().await;
            if let Err(err) = ledger_guard.close(now).await {
                tracing::warn!(%session_id, error = %err, "channel close failed during session close");
                guard.audit(now, AuditEventKind::ChannelDegraded, session_id, err.to_string());
            }
        }

        Ok(guard.session.as_ref().expect("checked above").clone())
    }

    /// `markSettled(txHash)` (§4.4): only legal from `closing`.
    pub async fn mark_settled(&self, tx_hash: String) -> Result<SessionState> {
        let now = self.clock.now();
        let mut guard = self.inner.write().await;
        let session = guard
            .session
            .as_mut()
            .ok_or_else(|| SessionError::StateError("no session to settle".to_string()))?;
        session
            .transition(SessionStatus::Settled)
            .map_err(|e| SessionError::StateError(e.to_string()))?;
        session.settlement_tx_hash = Some(tx_hash);
        let session_id = session.session_id.clone();
        let session = session.clone();
        guard.audit(now, AuditEventKind::SessionSettled, session_id, "session settled");
        Ok(session)
    }

    pub async fn summary(&self) -> Result<SessionSummary> {
        let guard = self.inner.read().await;
        let session = guard
            .session
            .as_ref()
            .ok_or_else(|| SessionError::StateError("no active session".to_string()))?;
        Ok(SessionSummary {
            session_id: session.session_id.clone(),
            status: session.status,
            balances: session.balances.clone(),
            history_len: session.history.len(),
        })
    }

    pub async fn balance(&self, asset: Asset) -> Result<SessionBalance> {
        let guard = self.inner.read().await;
        let session = guard
            .session
            .as_ref()
            .ok_or_else(|| SessionError::StateError("no active session".to_string()))?;
        session
            .balances
            .get(&asset)
            .cloned()
            .ok_or_else(|| SessionError::StateError(format!("no balance entry for {asset}")))
    }

    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.inner.read().await.audit_log.clone()
    }

    fn synthetic_preview_balances(&self) -> BalanceSheet {
        let mut balances = BalanceSheet::new();
        balances.insert(Asset::Usdc, SessionBalance::opening(self.preview_deposit_usdc));
        balances.insert(Asset::Eth, SessionBalance::opening(Decimal::zero(Asset::Eth.decimals())));
        balances
    }
}

fn rejection_summary(decision: &PolicyDecision) -> String {
    decision
        .results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| format!("{}: {}", r.rule_id, r.reason.as_deref().unwrap_or("failed")))
        .collect::<Vec<_>>()
        .join("; ")
}

fn apply_delta(
    balances: &mut BalanceSheet,
    token_in: Asset,
    token_out: Asset,
    proposal: &SwapProposal,
) -> Result<()> {
    {
        let in_balance = balances.get_mut(&token_in).expect("sufficiency already checked");
        in_balance.amount = in_balance
            .amount
            .checked_sub(&proposal.amount_in)
            .map_err(|e| SessionError::Arithmetic(e.to_string()))?;
    }
    {
        let out_balance = balances
            .entry(token_out)
            .or_insert_with(|| SessionBalance::opening(Decimal::zero(token_out.decimals())));
        out_balance.amount = out_balance
            .amount
            .checked_add(&proposal.estimated_amount_out)
            .map_err(|e| SessionError::Arithmetic(e.to_string()))?;
    }
    Ok(())
}

/// Projects a session's `{amount, initialAmount, pnl}` balance records down
/// to the plain `Asset -> amount` map the channel ledger signs over.
fn project_balances(balances: &BalanceSheet) -> BTreeMap<Asset, Decimal> {
    balances.iter().map(|(asset, balance)| (*asset, balance.amount)).collect()
}

/// A best-effort execution price for [`SwapResult::executed_price`]. Never
/// relied on for any invariant check (§4.4/§9: "intermediate prices are
/// computed but never relied on for invariant checks") — only for display
/// and audit purposes, so a saturating, non-erroring computation is fine.
fn executed_price(amount_in: Decimal, amount_out: Decimal) -> Decimal {
    if amount_in.minor_units() == 0 {
        return Decimal::zero(amount_out.scale());
    }
    let scale_factor = 10i128.pow(amount_in.scale());
    let minor = amount_out
        .minor_units()
        .checked_mul(scale_factor)
        .and_then(|v| v.checked_div(amount_in.minor_units()))
        .unwrap_or(0);
    Decimal::from_minor_units(minor, amount_out.scale())
}
