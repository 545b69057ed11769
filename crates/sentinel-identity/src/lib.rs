//! Identity & policy anchoring (§6): the agent's identity is a
//! human-readable name resolved to an address via a standard naming
//! registry; a text record under a reserved key stores the policy hash.
//! The integrity check is resolve → read text record → compare to the
//! locally computed hash. A mismatch is a warning unless strict mode is
//! configured.

pub mod error;
pub mod resolver;

pub use error::{IdentityError, Result};
pub use resolver::NameResolver;

use ethers::types::Address;
use sentinel_types::PolicyHash;

/// The reserved ENS text-record key the policy hash is anchored under.
pub const POLICY_HASH_RECORD_KEY: &str = "com.sentinel.policyHash";

/// The outcome of resolving `name` and comparing its anchored policy hash
/// against the hash computed locally from the running `PolicyConfig`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityCheck {
    pub resolved_address: Address,
    pub on_chain_hash: Option<PolicyHash>,
    pub locally_computed: PolicyHash,
    pub matches: bool,
    pub warning: Option<String>,
}

/// `resolve_and_check(name, locallyComputed) -> IdentityCheck` (§6).
/// `strict` decides whether a mismatch (or a missing/unparseable record) is
/// a hard failure or only a recorded warning.
pub async fn resolve_and_check<R: NameResolver>(
    resolver: &R,
    name: &str,
    locally_computed: PolicyHash,
    strict: bool,
) -> Result<IdentityCheck> {
    let resolved_address = resolver.resolve(name).await?;
    let record = resolver.text_record(name, POLICY_HASH_RECORD_KEY).await?;

    let on_chain_hash = record.as_deref().and_then(parse_policy_hash);
    let matches = on_chain_hash == Some(locally_computed);

    let warning = if matches {
        None
    } else {
        Some(match &record {
            None => format!("no '{POLICY_HASH_RECORD_KEY}' text record found for '{name}'"),
            Some(raw) if on_chain_hash.is_none() => {
                format!("text record '{raw}' for '{name}' is not a valid policy hash")
            }
            Some(_) => format!(
                "policy hash anchored for '{name}' does not match the locally computed hash"
            ),
        })
    };

    if !matches && strict {
        return Err(IdentityError::PolicyHashMismatch {
            name: name.to_string(),
            on_chain: on_chain_hash.map(|h| h.to_string()).unwrap_or_else(|| "none".to_string()),
            local: locally_computed.to_string(),
        });
    }

    if let Some(warning) = &warning {
        tracing::warn!(name, warning, "policy hash anchoring check failed");
    }

    Ok(IdentityCheck { resolved_address, on_chain_hash, locally_computed, matches, warning })
}

fn parse_policy_hash(raw: &str) -> Option<PolicyHash> {
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    if raw.len() != 64 {
        return None;
    }
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(raw, &mut bytes).ok()?;
    Some(PolicyHash(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_types::{Asset, PolicyConfig, Ratio};
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex as StdMutex;

    struct FixtureResolver {
        address: Address,
        records: StdMutex<BTreeMap<(String, String), String>>,
    }

    #[async_trait::async_trait]
    impl NameResolver for FixtureResolver {
        async fn resolve(&self, _name: &str) -> Result<Address> {
            Ok(self.address)
        }

        async fn text_record(&self, name: &str, key: &str) -> Result<Option<String>> {
            Ok(self.records.lock().unwrap().get(&(name.to_string(), key.to_string())).cloned())
        }
    }

    fn sample_hash() -> PolicyHash {
        PolicyConfig {
            max_trade_percent: Ratio::percent(2),
            max_slippage_bps: 50,
            allowed_dexes: BTreeSet::from(["default-venue".to_string()]),
            allowed_assets: BTreeSet::from([Asset::Usdc, Asset::Eth]),
        }
        .fingerprint()
    }

    #[tokio::test]
    async fn matching_anchored_hash_passes_without_warning() {
        let hash = sample_hash();
        let resolver = FixtureResolver {
            address: Address::random(),
            records: StdMutex::new(BTreeMap::from([(
                ("agent.eth".to_string(), POLICY_HASH_RECORD_KEY.to_string()),
                hash.to_string(),
            )])),
        };
        let check = resolve_and_check(&resolver, "agent.eth", hash, false).await.unwrap();
        assert!(check.matches);
        assert!(check.warning.is_none());
    }

    #[tokio::test]
    async fn missing_record_is_a_warning_not_a_hard_fail_by_default() {
        let resolver = FixtureResolver { address: Address::random(), records: StdMutex::new(BTreeMap::new()) };
        let check = resolve_and_check(&resolver, "agent.eth", sample_hash(), false).await.unwrap();
        assert!(!check.matches);
        assert!(check.warning.is_some());
    }

    #[tokio::test]
    async fn mismatch_is_a_hard_fail_in_strict_mode() {
        let resolver = FixtureResolver {
            address: Address::random(),
            records: StdMutex::new(BTreeMap::from([(
                ("agent.eth".to_string(), POLICY_HASH_RECORD_KEY.to_string()),
                format!("0x{}", "ab".repeat(32)),
            )])),
        };
        let err = resolve_and_check(&resolver, "agent.eth", sample_hash(), true).await.unwrap_err();
        assert!(matches!(err, IdentityError::PolicyHashMismatch { .. }));
    }
}
