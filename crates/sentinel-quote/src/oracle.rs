use async_trait::async_trait;
use sentinel_types::{Asset, Decimal};

use crate::error::{QuoteError, Result};
use crate::quote::Quote;

/// A single quote source, on-chain or local. §4.2.
#[async_trait]
pub trait QuoteBackend: Send + Sync {
    async fn quote(&self, token_in: Asset, token_out: Asset, amount_in: Decimal) -> Result<Quote>;
}

/// Tries each configured backend in priority order, falling over to the
/// next on any error, and only reports "no liquidity for pair" once every
/// backend has said so (§4.2).
pub struct QuoteOracle {
    backends: Vec<Box<dyn QuoteBackend>>,
}

impl QuoteOracle {
    pub fn new(backends: Vec<Box<dyn QuoteBackend>>) -> Self {
        QuoteOracle { backends }
    }

    pub async fn quote(&self, token_in: Asset, token_out: Asset, amount_in: Decimal) -> Result<Quote> {
        let mut last_err = QuoteError::NoLiquidity {
            token_in: token_in.symbol().to_string(),
            token_out: token_out.symbol().to_string(),
        };
        for (index, backend) in self.backends.iter().enumerate() {
            match backend.quote(token_in, token_out, amount_in).await {
                Ok(quote) => return Ok(quote),
                Err(err) => {
                    tracing::warn!(backend_index = index, error = %err, "quote backend failed, trying next");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}
