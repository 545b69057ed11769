use ethers::types::Address;
use sentinel_types::{Asset, SessionState, SettlementBalance, SettlementRecord};

use crate::chain_client::ChainClient;
use crate::error::{Result, SettlementError};

/// Maximum number of submit/confirm attempts for a transport-layer failure
/// before giving up. Pre-validation failures never retry — see §4.5/§7.
const MAX_TRANSPORT_RETRIES: u32 = 3;

/// C5: encodes a finalized session for on-chain submission, awaits
/// confirmation, and returns the settlement record (§4.5).
pub struct SettlementClient<C: ChainClient> {
    chain: C,
    operator: Address,
    wallet_address: String,
}

impl<C: ChainClient> SettlementClient<C> {
    pub fn new(chain: C, operator: Address, wallet_address: String) -> Self {
        SettlementClient { chain, operator, wallet_address }
    }

    /// `settle(finalSession) -> SettlementRecord` (§4.5): pre-validate
    /// (read-only), submit, await one confirmation, parse the event,
    /// return the record. Transport failures retry idempotently — the
    /// guard's replay map makes re-submission safe; pre-validation
    /// failures are terminal for this attempt.
    pub async fn settle(&self, session: &SessionState) -> Result<SettlementRecord> {
        let usdc_final = balance_of(session, Asset::Usdc);
        let eth_final = balance_of(session, Asset::Eth);
        let usdc_delta = delta_for(session, Asset::Usdc, false);
        let eth_delta = delta_for(session, Asset::Eth, true);

        self.chain.pre_validate(&session.session_id, Asset::Usdc, usdc_final, eth_final).await?;

        let mut last_transport_err = None;
        for attempt in 0..MAX_TRANSPORT_RETRIES {
            let submit_result = self
                .chain
                .submit_settlement(
                    &session.session_id,
                    self.operator,
                    Asset::Usdc,
                    usdc_final,
                    eth_final,
                    usdc_delta,
                    eth_delta,
                    session.closed_at.unwrap_or(session.opened_at),
                )
                .await;

            let tx_hash = match submit_result {
                Ok(tx_hash) => tx_hash,
                Err(err @ SettlementError::PreValidationRejected(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "settlement submission failed, retrying");
                    last_transport_err = Some(err);
                    continue;
                }
            };

            match self.chain.await_confirmation(&tx_hash).await {
                Ok(confirmation) => {
                    return Ok(SettlementRecord {
                        session_id: session.session_id.clone(),
                        wallet_address: self.wallet_address.clone(),
                        balances: vec![
                            SettlementBalance {
                                asset_symbol: Asset::Usdc.symbol().to_string(),
                                minor_units: usdc_final.minor_units(),
                            },
                            SettlementBalance {
                                asset_symbol: Asset::Eth.symbol().to_string(),
                                minor_units: eth_final.minor_units(),
                            },
                        ],
                        tx_hash,
                        block_number: confirmation.block_number,
                        timestamp: confirmation.timestamp,
                    });
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "confirmation wait failed, retrying");
                    last_transport_err = Some(err);
                }
            }
        }

        Err(last_transport_err.unwrap_or_else(|| SettlementError::TransportFailure("retries exhausted".to_string())))
    }
}

fn balance_of(session: &SessionState, asset: Asset) -> sentinel_types::Decimal {
    session.balances.get(&asset).map(|b| b.amount).unwrap_or_else(|| sentinel_types::Decimal::zero(asset.decimals()))
}

/// USDC's delta is reported as net spent (`initial - final`); ETH's delta
/// is reported as net gained (`final - initial`) — matching §8 scenario
/// 7's worked formula `usdcDelta = (deposit - finalUsdc) * 10^6`.
fn delta_for(session: &SessionState, asset: Asset, gained: bool) -> i128 {
    let Some(balance) = session.balances.get(&asset) else { return 0 };
    let pnl = balance.pnl().minor_units();
    if gained {
        pnl
    } else {
        -pnl
    }
}
