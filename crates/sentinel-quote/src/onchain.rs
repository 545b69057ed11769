use async_trait::async_trait;
use ethers::types::U256;
use sentinel_types::{Asset, Decimal};

use crate::error::{QuoteError, Result};
use crate::quote::Quote;
use crate::QuoteBackend;

/// Stands in for a read-only RPC call against a canonical exact-input-single
/// quoter (§4.2, backend 1). A real implementation reads pool state through
/// `ethers::providers::Provider`; this trait is the seam that lets tests
/// supply a fixture instead.
#[async_trait]
pub trait PoolStateReader: Send + Sync {
    /// The pool's current `sqrtPriceX96` for `(token_in, token_out)`, and
    /// whether `token_in` is the pool's canonical "token0" (lower address).
    /// `None` means no pool exists for the pair.
    async fn sqrt_price_x96(&self, token_in: Asset, token_out: Asset) -> Result<Option<(u128, bool)>>;

    /// A micro-quote of a tiny reference amount, used when a direct
    /// pool-state read is unavailable but the quoter contract can still be
    /// called with a small probe amount.
    async fn micro_quote(&self, token_in: Asset, token_out: Asset, tiny_amount_in: Decimal) -> Result<Option<Decimal>>;
}

/// C2 backend 1: an on-chain quoter. Tries a pool-state read first, falling
/// back to a micro-quote of a tiny reference amount, per §4.2.
pub struct OnChainQuoter<R> {
    reader: R,
    venue: String,
}

impl<R: PoolStateReader> OnChainQuoter<R> {
    pub fn new(reader: R, venue: impl Into<String>) -> Self {
        OnChainQuoter { reader, venue: venue.into() }
    }
}

#[async_trait]
impl<R: PoolStateReader> QuoteBackend for OnChainQuoter<R> {
    async fn quote(&self, token_in: Asset, token_out: Asset, amount_in: Decimal) -> Result<Quote> {
        if let Some((sqrt_price_x96, token_in_is_token0)) =
            self.reader.sqrt_price_x96(token_in, token_out).await?
        {
            let out_minor = amount_out_from_sqrt_price_x96(
                amount_in.minor_units(),
                sqrt_price_x96,
                token_in_is_token0,
                token_in.decimals(),
                token_out.decimals(),
            )?;
            return Ok(Quote {
                estimated_amount_out: Decimal::from_minor_units(out_minor, token_out.decimals()),
                price_impact_bps: 0,
                route: vec![self.venue.clone()],
                estimated_gas: 150_000,
            });
        }

        // Fall back to a micro-quote: probe with a small reference amount
        // and scale linearly to the requested size.
        let tiny = Decimal::from_minor_units(10i128.pow(token_in.decimals().min(3)), token_in.decimals());
        if let Some(micro_out) = self.reader.micro_quote(token_in, token_out, tiny).await? {
            if micro_out.is_zero() || tiny.is_zero() {
                return Err(QuoteError::NoLiquidity {
                    token_in: token_in.symbol().to_string(),
                    token_out: token_out.symbol().to_string(),
                });
            }
            let scaled = amount_in
                .minor_units()
                .checked_mul(micro_out.minor_units())
                .and_then(|v| v.checked_div(tiny.minor_units()))
                .ok_or_else(|| QuoteError::Arithmetic("micro-quote scaling overflow".to_string()))?;
            return Ok(Quote {
                estimated_amount_out: Decimal::from_minor_units(scaled, token_out.decimals()),
                price_impact_bps: 0,
                route: vec![self.venue.clone()],
                estimated_gas: 180_000,
            });
        }

        Err(QuoteError::NoLiquidity {
            token_in: token_in.symbol().to_string(),
            token_out: token_out.symbol().to_string(),
        })
    }
}

/// `amountOut = amountIn * (sqrtPriceX96 / 2^96)^2`, adjusted for the
/// decimal delta between the two assets and for which side of the pool
/// `token_in` sits on, per §4.2's "spot price is derived ... from a
/// pool-state read (reading the square-root-price representation and
/// squaring, then adjusting by decimal delta and canonical token order)".
///
/// `sqrtPriceX96` is accepted as a `u128` rather than the formal `uint160`:
/// real pool prices for the asset pairs this kernel trades never approach
/// that bound, and it keeps the squared intermediate inside `U256`.
fn amount_out_from_sqrt_price_x96(
    amount_in_minor: i128,
    sqrt_price_x96: u128,
    token_in_is_token0: bool,
    decimals_in: u32,
    decimals_out: u32,
) -> Result<i128> {
    if amount_in_minor < 0 {
        return Err(QuoteError::Arithmetic("amount_in must be non-negative".to_string()));
    }
    let sqrt_price = U256::from(sqrt_price_x96);
    let price_q192 = sqrt_price
        .checked_mul(sqrt_price)
        .ok_or_else(|| QuoteError::Arithmetic("sqrt price squared overflow".to_string()))?;
    let q192 = U256::from(1u8) << 192u32;
    let amount_in = U256::from(amount_in_minor as u128);

    // price_q192 == (token1 per token0) * 2^192. If token_in is token0,
    // amountOut = amountIn * price / 2^192; otherwise invert.
    let raw = if token_in_is_token0 {
        amount_in.checked_mul(price_q192).and_then(|v| v.checked_div(q192))
    } else {
        amount_in.checked_mul(q192).and_then(|v| v.checked_div(price_q192))
    }
    .ok_or_else(|| QuoteError::Arithmetic("amount-out computation overflow".to_string()))?;

    let decimal_delta = decimals_out as i32 - decimals_in as i32;
    let adjusted = if decimal_delta >= 0 {
        raw.checked_mul(U256::from(10u128).pow(U256::from(decimal_delta as u32)))
            .ok_or_else(|| QuoteError::Arithmetic("decimal adjustment overflow".to_string()))?
    } else {
        raw / U256::from(10u128).pow(U256::from((-decimal_delta) as u32))
    };

    if adjusted > U256::from(i128::MAX as u128) {
        return Err(QuoteError::Arithmetic("amount-out exceeds representable range".to_string()));
    }
    Ok(adjusted.as_u128() as i128)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_to_one_price_is_identity_modulo_decimals() {
        // sqrtPriceX96 for price == 1.0 is exactly 2^96.
        let sqrt_price_one = 1u128 << 96;
        let out = amount_out_from_sqrt_price_x96(1_000_000, sqrt_price_one, true, 6, 6).unwrap();
        assert_eq!(out, 1_000_000);
    }

    #[test]
    fn inverted_side_divides_instead_of_multiplies() {
        let sqrt_price_one = 1u128 << 96;
        let out = amount_out_from_sqrt_price_x96(1_000_000, sqrt_price_one, false, 6, 6).unwrap();
        assert_eq!(out, 1_000_000);
    }

    #[test]
    fn decimal_delta_scales_output() {
        // price == 1.0 but token_out has 12 more decimals than token_in.
        let sqrt_price_one = 1u128 << 96;
        let out = amount_out_from_sqrt_price_x96(1_000_000, sqrt_price_one, true, 6, 18).unwrap();
        assert_eq!(out, 1_000_000 * 10i128.pow(12));
    }
}
