//! Exercises `SettlementClient`'s transport-retry and pre-validation
//! semantics (§4.5/§7) against a `mockall`-generated fake for `ChainClient`,
//! rather than the hand-rolled `LocalChainClient` the other integration
//! tests drive — the adapter-trait fake test tooling names alongside the
//! hand-rolled fixtures used elsewhere in the workspace.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use ethers::types::Address;

use sentinel_kernel::{SettlementClient, SettlementError};
use sentinel_settlement::{ChainClient, ChainConfirmation};
use sentinel_types::{Asset, Decimal, ExecutionType, SessionBalance, SessionState, SessionStatus, SwapResult};

mockall::mock! {
    pub Chain {}

    #[async_trait]
    impl ChainClient for Chain {
        async fn pre_validate(
            &self,
            session_id: &str,
            token: Asset,
            usdc_amount: Decimal,
            eth_amount: Decimal,
        ) -> sentinel_settlement::Result<()>;

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
        ) -> sentinel_settlement::Result<String>;

        async fn await_confirmation(&self, tx_hash: &str) -> sentinel_settlement::Result<ChainConfirmation>;
    }
}

fn closing_session() -> SessionState {
    let mut balances = BTreeMap::new();
    balances.insert(
        Asset::Usdc,
        SessionBalance { amount: Decimal::parse("960.4", 6).unwrap(), initial_amount: Decimal::parse("1000", 6).unwrap() },
    );
    balances.insert(Asset::Eth, SessionBalance { amount: Decimal::zero(18), initial_amount: Decimal::zero(18) });
    SessionState {
        session_id: "sess-mock".to_string(),
        status: SessionStatus::Closing,
        balances,
        history: vec![SwapResult {
            proposal_id: "p1".to_string(),
            success: true,
            amount_in: Decimal::parse("39.6", 6).unwrap(),
            amount_out: Decimal::zero(18),
            executed_price: Decimal::zero(6),
            execution_type: ExecutionType::Offchain,
            timestamp: 100,
        }],
        opened_at: 0,
        closed_at: Some(100),
        settlement_tx_hash: None,
    }
}

#[tokio::test]
async fn transport_failure_on_submit_is_retried_then_succeeds() {
    let mut mock = MockChain::new();
    mock.expect_pre_validate().returning(|_, _, _, _| Ok(()));

    let attempts = AtomicU32::new(0);
    mock.expect_submit_settlement().returning(move |_, _, _, _, _, _, _, _| {
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(SettlementError::TransportFailure("dropped connection".to_string()))
        } else {
            Ok("0xmocktx".to_string())
        }
    });
    mock.expect_await_confirmation().returning(|_| {
        Ok(ChainConfirmation { block_number: 42, operator: Address::zero(), usdc_delta: 39_600_000, eth_delta: 0, timestamp: 100 })
    });

    let client = SettlementClient::new(mock, Address::zero(), "0xwallet".to_string());
    let record = client.settle(&closing_session()).await.unwrap();
    assert_eq!(record.tx_hash, "0xmocktx");
}

#[tokio::test]
async fn pre_validation_rejection_is_terminal_and_never_submits() {
    let mut mock = MockChain::new();
    mock.expect_pre_validate()
        .returning(|_, _, _, _| Err(SettlementError::PreValidationRejected("replay".to_string())));
    mock.expect_submit_settlement().times(0).returning(|_, _, _, _, _, _, _, _| Ok("unreachable".to_string()));

    let client = SettlementClient::new(mock, Address::zero(), "0xwallet".to_string());
    let err = client.settle(&closing_session()).await.unwrap_err();
    assert!(matches!(err, SettlementError::PreValidationRejected(_)));
}
