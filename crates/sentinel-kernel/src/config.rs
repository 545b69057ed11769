//! Layered configuration loading (§6 of `SPEC_FULL.md`): exactly the keys
//! the core recognizes, following the teacher's `Settings::new` pattern
//! (`engine/src/settings.rs`) but built on the builder API of a newer
//! `config` crate. Unknown keys are rejected at load via serde's
//! `deny_unknown_fields`, matching spec §6's "Unknown options are rejected
//! at load."

use std::collections::BTreeSet;
use std::path::Path;

use config::{Config, File};
use serde::Deserialize;

use sentinel_types::{Asset, Decimal, PolicyConfig, Ratio};

use crate::error::{KernelError, Result};

/// `policy.*` — exactly the fields of spec §3's `PolicyConfig`, expressed in
/// the human-readable form a config file carries rather than the
/// already-parsed in-memory types.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicySection {
    /// A percentage like `"2%"` or a bare rational like `"1/50"`.
    pub max_trade_percent: String,
    pub max_slippage_bps: u32,
    pub allowed_dexes: Vec<String>,
    /// Asset symbols, e.g. `["USDC", "ETH"]`.
    pub allowed_assets: Vec<String>,
}

/// `session.*`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionSection {
    /// Human-readable decimal string, e.g. `"1000"`.
    pub default_deposit_usdc: String,
    pub max_actions_per_session: u32,
    pub timeout_ms: u64,
}

/// The on-chain contract address book the settlement client and identity
/// resolver need, plus the RPC endpoint they talk over.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContractsSection {
    pub vault_address: String,
    pub policy_guard_address: String,
    pub rpc_endpoint: String,
}

/// The full set of options the core recognizes (§6). Loading rejects any
/// key outside this shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KernelConfig {
    pub policy: PolicySection,
    pub session: SessionSection,
    pub contracts: ContractsSection,
}

impl KernelConfig {
    /// Load from a single layered `File` source, following
    /// `engine/src/settings.rs::Settings::new`'s "merge in the default
    /// configuration file" pattern, updated to the builder API.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path.as_ref().to_string_lossy().as_ref()))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Parse `policy.maxTradePercent` into a [`Ratio`]. Accepts either a
    /// trailing `%` (interpreted as parts-per-hundred) or a bare `n/d`.
    fn max_trade_percent(&self) -> Result<Ratio> {
        let raw = self.policy.max_trade_percent.trim();
        if let Some(pct) = raw.strip_suffix('%') {
            let pct: u64 = pct.trim().parse().map_err(|_| KernelError::InvalidField {
                field: "policy.maxTradePercent",
                value: raw.to_string(),
                reason: "not an integer percentage".to_string(),
            })?;
            return Ok(Ratio::percent(pct));
        }
        let (numerator, denominator) = raw.split_once('/').ok_or_else(|| KernelError::InvalidField {
            field: "policy.maxTradePercent",
            value: raw.to_string(),
            reason: "expected 'N%' or 'N/D'".to_string(),
        })?;
        let parse_part = |part: &str| -> Result<u64> {
            part.trim().parse().map_err(|_| KernelError::InvalidField {
                field: "policy.maxTradePercent",
                value: raw.to_string(),
                reason: "numerator/denominator must be integers".to_string(),
            })
        };
        Ok(Ratio::new(parse_part(numerator)?, parse_part(denominator)?)?)
    }

    fn allowed_assets(&self) -> Result<BTreeSet<Asset>> {
        self.policy
            .allowed_assets
            .iter()
            .map(|symbol| {
                Asset::from_symbol(symbol).ok_or_else(|| KernelError::InvalidField {
                    field: "policy.allowedAssets",
                    value: symbol.clone(),
                    reason: "not a recognized asset symbol".to_string(),
                })
            })
            .collect()
    }

    /// Build the in-memory [`PolicyConfig`] the policy engine is constructed
    /// from.
    pub fn policy_config(&self) -> Result<PolicyConfig> {
        Ok(PolicyConfig {
            max_trade_percent: self.max_trade_percent()?,
            max_slippage_bps: self.policy.max_slippage_bps,
            allowed_dexes: self.policy.allowed_dexes.iter().cloned().collect(),
            allowed_assets: self.allowed_assets()?,
        })
    }

    /// Parse `session.defaultDepositUsdc` into USDC's fixed-point scale.
    pub fn default_deposit_usdc(&self) -> Result<Decimal> {
        Decimal::parse(&self.session.default_deposit_usdc, Asset::Usdc.decimals()).map_err(KernelError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KernelConfig {
        KernelConfig {
            policy: PolicySection {
                max_trade_percent: "2%".to_string(),
                max_slippage_bps: 50,
                allowed_dexes: vec!["default-venue".to_string()],
                allowed_assets: vec!["USDC".to_string(), "ETH".to_string()],
            },
            session: SessionSection {
                default_deposit_usdc: "1000".to_string(),
                max_actions_per_session: 100,
                timeout_ms: 30_000,
            },
            contracts: ContractsSection {
                vault_address: "0x0000000000000000000000000000000000000001".to_string(),
                policy_guard_address: "0x0000000000000000000000000000000000000002".to_string(),
                rpc_endpoint: "http://localhost:8545".to_string(),
            },
        }
    }

    #[test]
    fn percent_syntax_parses_to_the_expected_ratio() {
        let ratio = sample().max_trade_percent().unwrap();
        assert_eq!(ratio.numerator, 2);
        assert_eq!(ratio.denominator, 100);
    }

    #[test]
    fn fraction_syntax_is_also_accepted() {
        let mut cfg = sample();
        cfg.policy.max_trade_percent = "1/50".to_string();
        let ratio = cfg.max_trade_percent().unwrap();
        assert_eq!(ratio.numerator, 1);
        assert_eq!(ratio.denominator, 50);
    }

    #[test]
    fn garbage_percent_is_rejected() {
        let mut cfg = sample();
        cfg.policy.max_trade_percent = "not-a-number".to_string();
        assert!(cfg.max_trade_percent().is_err());
    }

    #[test]
    fn unknown_asset_symbol_is_rejected() {
        let mut cfg = sample();
        cfg.policy.allowed_assets = vec!["DAI".to_string()];
        assert!(cfg.allowed_assets().is_err());
    }

    #[test]
    fn policy_config_round_trips_into_a_usable_fingerprint() {
        let policy = sample().policy_config().unwrap();
        // Exercises the full path end to end: two independently-built
        // configs with the same content fingerprint identically.
        assert_eq!(policy.fingerprint(), sample().policy_config().unwrap().fingerprint());
    }

    #[test]
    fn default_deposit_parses_at_usdc_scale() {
        let deposit = sample().default_deposit_usdc().unwrap();
        assert_eq!(deposit.to_fixed_string(), "1000.000000");
    }
}
