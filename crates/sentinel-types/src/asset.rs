use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of asset symbols the kernel knows how to hold and trade.
///
/// Adding a new variant is a code change, not a config change: §3 of the
/// spec calls this a "closed enumeration" and every policy rule relies on
/// being able to exhaustively match over it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Asset {
    Usdc,
    Eth,
}

impl Asset {
    /// All assets the kernel currently recognizes, in canonical order.
    pub const ALL: [Asset; 2] = [Asset::Usdc, Asset::Eth];

    /// Number of decimal places used to display (and canonically encode)
    /// amounts of this asset. Internally amounts are always integers in the
    /// asset's smallest unit.
    pub fn decimals(&self) -> u32 {
        match self {
            Asset::Usdc => 6,
            Asset::Eth => 18,
        }
    }

    /// The symbol as it appears in proposals, policy configs, and logs.
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Usdc => "USDC",
            Asset::Eth => "ETH",
        }
    }

    /// The asset's on-chain contract/native address, used when encoding
    /// settlement calldata and when the quote oracle talks to a real pool.
    pub fn on_chain_address(&self) -> &'static str {
        match self {
            Asset::Usdc => "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            // The conventional sentinel address for native ETH.
            Asset::Eth => "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE",
        }
    }

    /// Parse from the canonical symbol string. Case-sensitive, matching the
    /// spec's "exact string match" treatment of asset/dex identifiers.
    pub fn from_symbol(symbol: &str) -> Option<Asset> {
        Asset::ALL.into_iter().find(|a| a.symbol() == symbol)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_symbol() {
        for asset in Asset::ALL {
            assert_eq!(Asset::from_symbol(asset.symbol()), Some(asset));
        }
    }

    #[test]
    fn unknown_symbol_is_none() {
        assert_eq!(Asset::from_symbol("DAI"), None);
    }

    #[test]
    fn ordering_is_stable_for_canonical_encoding() {
        let mut assets = vec![Asset::Eth, Asset::Usdc];
        assets.sort();
        assert_eq!(assets, vec![Asset::Usdc, Asset::Eth]);
    }
}
