use serde::{Deserialize, Serialize};
use sentinel_types::Decimal;

/// The result of a successful quote, regardless of which backend produced
/// it (§4.2).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub estimated_amount_out: Decimal,
    pub price_impact_bps: u32,
    pub route: Vec<String>,
    pub estimated_gas: u64,
}
