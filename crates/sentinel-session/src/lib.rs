//! C4: the session manager. Owns the session lifecycle state machine,
//! drives the policy → ledger pipeline, and exposes balance & summary views
//! (§4.4). The component that wires the other five together.

pub mod audit;
pub mod error;
mod ids;
mod manager;

pub use audit::{AuditEntry, AuditEventKind};
pub use error::{Result, SessionError};
pub use manager::{
    ProposeOutcome, SessionManager, SessionSummary, SimulateOutcome, DEFAULT_DEX, DEFAULT_MAX_SLIPPAGE_BPS,
};

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_ledger::{ChannelLedger, LocalDeterministicSigner};
    use sentinel_policy::PolicyEngine;
    use sentinel_quote::{ConstantProductAmm, QuoteOracle};
    use sentinel_types::{Asset, Decimal, FixedClock, PolicyConfig, Ratio};
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// A clock that advances by one on every call, so each operation in a
    /// test gets a distinct, reproducible timestamp.
    struct SequentialClock(AtomicU64);

    impl SequentialClock {
        fn new() -> Self {
            SequentialClock(AtomicU64::new(1))
        }
    }

    impl sentinel_types::Clock for SequentialClock {
        fn now(&self) -> u64 {
            self.0.fetch_add(1, Ordering::SeqCst)
        }
    }

    fn policy_engine() -> PolicyEngine {
        PolicyEngine::new(PolicyConfig {
            max_trade_percent: Ratio::percent(2),
            max_slippage_bps: 50,
            allowed_dexes: BTreeSet::from(["default-venue".to_string()]),
            allowed_assets: BTreeSet::from([Asset::Usdc, Asset::Eth]),
        })
    }

    fn quote_oracle() -> QuoteOracle {
        QuoteOracle::new(vec![Box::new(ConstantProductAmm::new(
            Asset::Usdc,
            Decimal::parse("2500000", 6).unwrap(),
            Asset::Eth,
            Decimal::parse("1000", 18).unwrap(),
        ))])
    }

    fn channel_ledger() -> ChannelLedger<LocalDeterministicSigner> {
        use ethers::signers::LocalWallet;
        let operator = LocalWallet::new(&mut rand::thread_rng());
        let counterparty = LocalDeterministicSigner::new(LocalWallet::new(&mut rand::thread_rng()));
        ChannelLedger::new(operator, counterparty)
    }

    fn manager_with_channel() -> SessionManager<LocalDeterministicSigner, SequentialClock> {
        SessionManager::new(
            policy_engine(),
            quote_oracle(),
            Some(channel_ledger()),
            SequentialClock::new(),
            Decimal::parse("1000", 6).unwrap(),
        )
    }

    fn manager_memory_only() -> SessionManager<LocalDeterministicSigner, SequentialClock> {
        SessionManager::new(
            policy_engine(),
            quote_oracle(),
            None,
            SequentialClock::new(),
            Decimal::parse("1000", 6).unwrap(),
        )
    }

    #[tokio::test]
    async fn open_sets_initial_balances_and_audits() {
        let manager = manager_memory_only();
        let session = manager.open(Decimal::parse("1000", 6).unwrap()).await.unwrap();
        assert_eq!(session.balances[&Asset::Usdc].amount.to_fixed_string(), "1000.000000");
        assert_eq!(session.balances[&Asset::Eth].amount.to_fixed_string(), "0.000000000000000000");
        let log = manager.audit_log().await;
        assert!(log.iter().any(|e| e.kind == AuditEventKind::SessionOpened));
    }

    #[tokio::test]
    async fn opening_twice_is_a_state_error() {
        let manager = manager_memory_only();
        manager.open(Decimal::parse("1000", 6).unwrap()).await.unwrap();
        let err = manager.open(Decimal::parse("1000", 6).unwrap()).await.unwrap_err();
        assert!(matches!(err, SessionError::StateError(_)));
    }

    #[tokio::test]
    async fn happy_path_swap_mutates_balances_as_scenario_1() {
        let manager = manager_with_channel();
        manager.open(Decimal::parse("1000", 6).unwrap()).await.unwrap();
        let outcome = manager
            .propose_swap(Asset::Usdc, Asset::Eth, Decimal::parse("20", 6).unwrap(), None, None)
            .await
            .unwrap();
        match outcome {
            ProposeOutcome::Approved { swap, decision } => {
                assert!(decision.approved);
                assert!(swap.amount_out.to_fixed_string().starts_with("0.0079"));
            }
            ProposeOutcome::Rejected(_) => panic!("expected approval"),
        }
        let summary = manager.summary().await.unwrap();
        assert_eq!(summary.balances[&Asset::Usdc].amount.to_fixed_string(), "980.000000");
        assert_eq!(summary.history_len, 1);
    }

    #[tokio::test]
    async fn oversized_proposal_is_rejected_without_mutation() {
        let manager = manager_with_channel();
        manager.open(Decimal::parse("1000", 6).unwrap()).await.unwrap();
        manager
            .propose_swap(Asset::Usdc, Asset::Eth, Decimal::parse("20", 6).unwrap(), None, None)
            .await
            .unwrap();

        let before = manager.summary().await.unwrap();
        let outcome = manager
            .propose_swap(Asset::Usdc, Asset::Eth, Decimal::parse("50", 6).unwrap(), None, None)
            .await
            .unwrap();
        assert!(matches!(outcome, ProposeOutcome::Rejected(_)));
        let after = manager.summary().await.unwrap();
        assert_eq!(before.balances, after.balances);
        assert_eq!(after.history_len, 1);

        let log = manager.audit_log().await;
        assert!(log.iter().any(|e| e.kind == AuditEventKind::SwapRejected));
    }

    #[tokio::test]
    async fn disallowed_dex_is_rejected() {
        let manager = manager_with_channel();
        manager.open(Decimal::parse("1000", 6).unwrap()).await.unwrap();
        let outcome = manager
            .propose_swap(
                Asset::Usdc,
                Asset::Eth,
                Decimal::parse("10", 6).unwrap(),
                None,
                Some("curve".to_string()),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, ProposeOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn slippage_over_policy_max_is_rejected() {
        let manager = manager_with_channel();
        manager.open(Decimal::parse("1000", 6).unwrap()).await.unwrap();
        let outcome = manager
            .propose_swap(Asset::Usdc, Asset::Eth, Decimal::parse("10", 6).unwrap(), Some(51), None)
            .await
            .unwrap();
        assert!(matches!(outcome, ProposeOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn insufficient_balance_is_an_error_not_a_rejection() {
        // A policy loose enough (200% cap) that rule 1 never fires, so the
        // only thing standing between the proposal and approval is the
        // session actually holding enough of the input asset.
        let manager = SessionManager::new(
            PolicyEngine::new(PolicyConfig {
                max_trade_percent: Ratio::new(200, 100).unwrap(),
                max_slippage_bps: 50,
                allowed_dexes: BTreeSet::from(["default-venue".to_string()]),
                allowed_assets: BTreeSet::from([Asset::Usdc, Asset::Eth]),
            }),
            quote_oracle(),
            None::<ChannelLedger<LocalDeterministicSigner>>,
            SequentialClock::new(),
            Decimal::parse("1000", 6).unwrap(),
        );
        manager.open(Decimal::parse("10", 6).unwrap()).await.unwrap();
        let err = manager
            .propose_swap(Asset::Usdc, Asset::Eth, Decimal::parse("20", 6).unwrap(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn proposing_after_close_is_a_state_error() {
        let manager = manager_with_channel();
        manager.open(Decimal::parse("1000", 6).unwrap()).await.unwrap();
        manager.close().await.unwrap();
        let err = manager
            .propose_swap(Asset::Usdc, Asset::Eth, Decimal::parse("1", 6).unwrap(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::StateError(_)));
    }

    #[tokio::test]
    async fn closing_with_no_active_session_is_a_state_error() {
        let manager = manager_memory_only();
        let err = manager.close().await.unwrap_err();
        assert!(matches!(err, SessionError::StateError(_)));
    }

    #[tokio::test]
    async fn close_then_mark_settled_transitions_to_settled() {
        let manager = manager_with_channel();
        manager.open(Decimal::parse("1000", 6).unwrap()).await.unwrap();
        manager.close().await.unwrap();
        let settled = manager.mark_settled("0xdeadbeef".to_string()).await.unwrap();
        assert_eq!(settled.status, sentinel_types::SessionStatus::Settled);
        assert_eq!(settled.settlement_tx_hash.as_deref(), Some("0xdeadbeef"));
    }

    #[tokio::test]
    async fn mark_settled_before_closing_is_a_state_error() {
        let manager = manager_with_channel();
        manager.open(Decimal::parse("1000", 6).unwrap()).await.unwrap();
        let err = manager.mark_settled("0xdeadbeef".to_string()).await.unwrap_err();
        assert!(matches!(err, SessionError::StateError(_)));
    }

    #[tokio::test]
    async fn simulate_swap_before_open_uses_synthetic_balances() {
        let manager = manager_memory_only();
        let outcome = manager
            .simulate_swap(Asset::Usdc, Asset::Eth, Decimal::parse("20", 6).unwrap())
            .await
            .unwrap();
        assert!(outcome.would_approve);
        assert!(outcome.session_id.is_none());
    }

    #[tokio::test]
    async fn simulate_swap_does_not_mutate_balances() {
        let manager = manager_with_channel();
        manager.open(Decimal::parse("1000", 6).unwrap()).await.unwrap();
        manager
            .simulate_swap(Asset::Usdc, Asset::Eth, Decimal::parse("20", 6).unwrap())
            .await
            .unwrap();
        let summary = manager.summary().await.unwrap();
        assert_eq!(summary.balances[&Asset::Usdc].amount.to_fixed_string(), "1000.000000");
        assert_eq!(summary.history_len, 0);
    }

    #[tokio::test]
    async fn rejecting_a_swap_produces_no_channel_state() {
        let manager = manager_with_channel();
        manager.open(Decimal::parse("1000", 6).unwrap()).await.unwrap();
        manager
            .propose_swap(Asset::Usdc, Asset::Eth, Decimal::parse("500", 6).unwrap(), None, None)
            .await
            .unwrap();
        // Still only the turn-0 open state; no update was ever sent.
        let log = manager.audit_log().await;
        assert!(log.iter().any(|e| e.kind == AuditEventKind::SwapRejected));
        assert!(!log.iter().any(|e| e.kind == AuditEventKind::SwapApproved));
    }
}
