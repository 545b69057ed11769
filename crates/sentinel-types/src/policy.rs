use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::asset::Asset;
use crate::canonical::CanonicalValue;
use crate::decimal::Decimal;
use crate::ratio::Ratio;

/// An immutable policy configuration. A new policy is always a new
/// [`PolicyHash`] and therefore a new session — see §3: "PolicyConfig is
/// immutable for the life of a session".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub max_trade_percent: Ratio,
    pub max_slippage_bps: u32,
    pub allowed_dexes: BTreeSet<String>,
    pub allowed_assets: BTreeSet<Asset>,
}

impl PolicyConfig {
    /// Canonicalize per §3/§9: struct keys sorted lexicographically, set
    /// elements sorted, integers in decimal.
    pub fn canonicalize(&self) -> CanonicalValue {
        CanonicalValue::object(vec![
            (
                "allowedAssets",
                CanonicalValue::sorted_array(self.allowed_assets.iter().copied().collect(), |a| {
                    CanonicalValue::Text(a.symbol().to_string())
                }),
            ),
            (
                "allowedDexes",
                CanonicalValue::sorted_array(
                    self.allowed_dexes.iter().cloned().collect(),
                    |s: &String| CanonicalValue::Text(s.clone()),
                ),
            ),
            (
                "maxSlippageBps",
                CanonicalValue::Integer(self.max_slippage_bps as i128),
            ),
            (
                "maxTradePercent",
                CanonicalValue::object(vec![
                    (
                        "denominator",
                        CanonicalValue::Integer(self.max_trade_percent.denominator as i128),
                    ),
                    (
                        "numerator",
                        CanonicalValue::Integer(self.max_trade_percent.numerator as i128),
                    ),
                ]),
            ),
        ])
    }

    /// `PolicyHash(config)` — §3's "256-bit digest ... produced by
    /// canonicalization ... then SHA-256".
    pub fn fingerprint(&self) -> PolicyHash {
        PolicyHash(self.canonicalize().digest())
    }
}

/// The 256-bit fingerprint identifying a specific, operationally distinct
/// policy configuration. Two policies hash equal iff they are equal as
/// configurations regardless of field or set order (§8).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyHash(pub [u8; 32]);

impl fmt::Display for PolicyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for PolicyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PolicyHash({self})")
    }
}

/// The verdict of a single rule evaluation. `value`/`limit` are rendered as
/// canonical fixed-decimal strings so the reason text is stable and
/// assertable in tests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRuleResult {
    pub rule_id: &'static str,
    pub rule_name: &'static str,
    pub passed: bool,
    pub reason: Option<String>,
    pub value: String,
    pub limit: String,
}

impl PolicyRuleResult {
    pub fn pass(rule_id: &'static str, rule_name: &'static str, value: String, limit: String) -> Self {
        PolicyRuleResult { rule_id, rule_name, passed: true, reason: None, value, limit }
    }

    pub fn fail(
        rule_id: &'static str,
        rule_name: &'static str,
        reason: String,
        value: String,
        limit: String,
    ) -> Self {
        PolicyRuleResult { rule_id, rule_name, passed: false, reason: Some(reason), value, limit }
    }
}

/// The policy engine's full verdict on one proposal. `approved` is always
/// the conjunction of every result's `passed` — never stored independently
/// of the results that justify it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub approved: bool,
    pub results: Vec<PolicyRuleResult>,
    pub evaluated_at: u64,
    pub policy_hash: PolicyHash,
}

impl PolicyDecision {
    pub fn new(results: Vec<PolicyRuleResult>, evaluated_at: u64, policy_hash: PolicyHash) -> Self {
        let approved = results.iter().all(|r| r.passed);
        PolicyDecision { approved, results, evaluated_at, policy_hash }
    }
}

/// A not-yet-accepted swap request from the agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapProposal {
    pub id: String,
    pub token_in: Asset,
    pub token_out: Asset,
    pub amount_in: Decimal,
    pub estimated_amount_out: Decimal,
    pub max_slippage_bps: u32,
    pub dex: String,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_policy() -> PolicyConfig {
        PolicyConfig {
            max_trade_percent: Ratio::percent(2),
            max_slippage_bps: 50,
            allowed_dexes: BTreeSet::from(["default-venue".to_string(), "uniswap-v3".to_string()]),
            allowed_assets: BTreeSet::from([Asset::Usdc, Asset::Eth]),
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let p = sample_policy();
        assert_eq!(p.fingerprint(), p.fingerprint());
    }

    #[test]
    fn fingerprint_ignores_set_construction_order() {
        let mut p1 = sample_policy();
        let mut p2 = sample_policy();
        p1.allowed_dexes = BTreeSet::from(["uniswap-v3".to_string(), "default-venue".to_string()]);
        p2.allowed_dexes = BTreeSet::from(["default-venue".to_string(), "uniswap-v3".to_string()]);
        assert_eq!(p1.fingerprint(), p2.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let p1 = sample_policy();
        let mut p2 = sample_policy();
        p2.max_slippage_bps = 51;
        assert_ne!(p1.fingerprint(), p2.fingerprint());
    }

    #[test]
    fn decision_approved_is_conjunction_of_results() {
        let results = vec![
            PolicyRuleResult::pass("r1", "a", "1".into(), "2".into()),
            PolicyRuleResult::fail("r2", "b", "too big".into(), "3".into(), "2".into()),
        ];
        let decision = PolicyDecision::new(results, 0, sample_policy().fingerprint());
        assert!(!decision.approved);
    }
}
