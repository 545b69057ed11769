use async_trait::async_trait;
use sentinel_types::{Asset, Decimal};

use crate::error::{QuoteError, Result};
use crate::quote::Quote;
use crate::QuoteBackend;

const FEE_BPS: u32 = 30;
const BPS_DENOMINATOR: i128 = 10_000;

/// C2 backend 2: a local constant-product AMM with fixed reference
/// reserves and a 30-bps fee, per §4.2. Used as the fallback when the
/// on-chain quoter errors, and directly in tests that need a quote without
/// any RPC dependency.
#[derive(Clone, Debug)]
pub struct ConstantProductAmm {
    asset_a: Asset,
    reserve_a: Decimal,
    asset_b: Asset,
    reserve_b: Decimal,
}

impl ConstantProductAmm {
    pub fn new(asset_a: Asset, reserve_a: Decimal, asset_b: Asset, reserve_b: Decimal) -> Self {
        ConstantProductAmm { asset_a, reserve_a, asset_b, reserve_b }
    }

    fn reserves_for(&self, token_in: Asset, token_out: Asset) -> Result<(Decimal, Decimal)> {
        if token_in == self.asset_a && token_out == self.asset_b {
            Ok((self.reserve_a, self.reserve_b))
        } else if token_in == self.asset_b && token_out == self.asset_a {
            Ok((self.reserve_b, self.reserve_a))
        } else {
            Err(QuoteError::NoLiquidity {
                token_in: token_in.symbol().to_string(),
                token_out: token_out.symbol().to_string(),
            })
        }
    }
}

#[async_trait]
impl QuoteBackend for ConstantProductAmm {
    async fn quote(&self, token_in: Asset, token_out: Asset, amount_in: Decimal) -> Result<Quote> {
        let (reserve_in, reserve_out) = self.reserves_for(token_in, token_out)?;

        let amount_in_minor = amount_in.minor_units();
        let reserve_in_minor = reserve_in.minor_units();
        let reserve_out_minor = reserve_out.minor_units();

        let amount_in_after_fee = amount_in_minor
            .checked_mul((BPS_DENOMINATOR - FEE_BPS as i128) as i128)
            .and_then(|v| v.checked_div(BPS_DENOMINATOR))
            .ok_or_else(|| QuoteError::Arithmetic("fee application overflow".to_string()))?;

        let denominator = reserve_in_minor
            .checked_add(amount_in_after_fee)
            .ok_or_else(|| QuoteError::Arithmetic("reserve + amount overflow".to_string()))?;
        if denominator == 0 {
            return Err(QuoteError::NoLiquidity {
                token_in: token_in.symbol().to_string(),
                token_out: token_out.symbol().to_string(),
            });
        }
        let amount_out_minor = reserve_out_minor
            .checked_mul(amount_in_after_fee)
            .and_then(|v| v.checked_div(denominator))
            .ok_or_else(|| QuoteError::Arithmetic("constant-product division overflow".to_string()))?;

        let price_impact_bps = price_impact_bps(
            amount_in_minor,
            amount_out_minor,
            reserve_in_minor,
            reserve_out_minor,
        )?;

        Ok(Quote {
            estimated_amount_out: Decimal::from_minor_units(amount_out_minor, token_out.decimals()),
            price_impact_bps,
            route: vec!["local-amm".to_string()],
            estimated_gas: 90_000,
        })
    }
}

/// `|1 - (amountOut/amountIn) / (reserveOut/reserveIn)|` in bps, computed by
/// cross-multiplication so the per-asset decimal scales cancel out exactly
/// and no intermediate ratio is ever a float (§4.2/§9).
fn price_impact_bps(
    amount_in_minor: i128,
    amount_out_minor: i128,
    reserve_in_minor: i128,
    reserve_out_minor: i128,
) -> Result<u32> {
    if amount_in_minor == 0 || reserve_out_minor == 0 {
        return Ok(0);
    }
    let lhs = amount_out_minor
        .checked_mul(reserve_in_minor)
        .ok_or_else(|| QuoteError::Arithmetic("price impact numerator overflow".to_string()))?;
    let rhs = amount_in_minor
        .checked_mul(reserve_out_minor)
        .ok_or_else(|| QuoteError::Arithmetic("price impact denominator overflow".to_string()))?;
    if rhs == 0 {
        return Ok(0);
    }
    let ratio_bps = lhs
        .checked_mul(BPS_DENOMINATOR)
        .and_then(|v| v.checked_div(rhs))
        .ok_or_else(|| QuoteError::Arithmetic("price impact ratio overflow".to_string()))?;
    Ok((BPS_DENOMINATOR - ratio_bps).unsigned_abs() as u32)
}
