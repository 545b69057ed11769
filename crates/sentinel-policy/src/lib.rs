//! C1: the policy engine. A pure, deterministic function of a
//! [`PolicyConfig`], a [`SwapProposal`], and a balance snapshot — no I/O, no
//! hidden time dependency, never throws. See spec §4.1.

use sentinel_types::{Asset, BalanceSheet, Decimal, PolicyConfig, PolicyDecision, PolicyHash, PolicyRuleResult, SwapProposal};

const RULE_MAX_TRADE_SIZE: &str = "max_trade_size";
const RULE_ALLOWED_DEX: &str = "allowed_dex";
const RULE_ALLOWED_ASSETS: &str = "allowed_assets";
const RULE_MAX_SLIPPAGE: &str = "max_slippage";

/// The fixed rule count every [`PolicyDecision`] must carry results for.
pub const RULE_COUNT: usize = 4;

/// Holds an immutable [`PolicyConfig`] and its precomputed [`PolicyHash`].
/// The rule set itself is static — exactly the four rules of §4.1, always
/// all evaluated, in fixed order.
pub struct PolicyEngine {
    config: PolicyConfig,
    policy_hash: PolicyHash,
}

impl PolicyEngine {
    pub fn new(config: PolicyConfig) -> Self {
        let policy_hash = config.fingerprint();
        PolicyEngine { config, policy_hash }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn policy_hash(&self) -> PolicyHash {
        self.policy_hash
    }

    /// Evaluate a proposal against every rule, in fixed order, and produce
    /// an auditable decision. `now` is supplied by the caller (typically via
    /// a [`sentinel_types::Clock`]) so this function stays pure.
    pub fn evaluate(&self, proposal: &SwapProposal, balances: &BalanceSheet, now: u64) -> PolicyDecision {
        let results = vec![
            self.check_max_trade_size(proposal, balances),
            self.check_allowed_dex(proposal),
            self.check_allowed_assets(proposal),
            self.check_max_slippage(proposal),
        ];
        debug_assert_eq!(results.len(), RULE_COUNT);
        tracing::debug!(
            proposal_id = %proposal.id,
            approved = results.iter().all(|r| r.passed),
            "policy decision evaluated"
        );
        PolicyDecision::new(results, now, self.policy_hash)
    }

    fn check_max_trade_size(&self, proposal: &SwapProposal, balances: &BalanceSheet) -> PolicyRuleResult {
        let Some(balance) = balances.get(&proposal.token_in) else {
            return PolicyRuleResult::fail(
                RULE_MAX_TRADE_SIZE,
                "Max Trade Size",
                format!("no balance entry for {}", proposal.token_in),
                proposal.amount_in.to_fixed_string(),
                "n/a".to_string(),
            );
        };
        let cap = match balance.amount.checked_mul_ratio(
            self.config.max_trade_percent.numerator,
            self.config.max_trade_percent.denominator,
        ) {
            Ok(cap) => cap,
            Err(err) => {
                return PolicyRuleResult::fail(
                    RULE_MAX_TRADE_SIZE,
                    "Max Trade Size",
                    format!("failed to compute cap: {err}"),
                    proposal.amount_in.to_fixed_string(),
                    "n/a".to_string(),
                )
            }
        };
        if proposal.amount_in.minor_units() <= cap.minor_units() {
            PolicyRuleResult::pass(
                RULE_MAX_TRADE_SIZE,
                "Max Trade Size",
                proposal.amount_in.to_fixed_string(),
                cap.to_fixed_string(),
            )
        } else {
            PolicyRuleResult::fail(
                RULE_MAX_TRADE_SIZE,
                "Max Trade Size",
                format!(
                    "amountIn {} exceeds cap {} ({} of {} balance)",
                    proposal.amount_in, cap, self.config.max_trade_percent, proposal.token_in
                ),
                proposal.amount_in.to_fixed_string(),
                cap.to_fixed_string(),
            )
        }
    }

    fn check_allowed_dex(&self, proposal: &SwapProposal) -> PolicyRuleResult {
        let allowed = self.config.allowed_dexes.contains(&proposal.dex);
        let limit = self.config.allowed_dexes.iter().cloned().collect::<Vec<_>>().join(",");
        if allowed {
            PolicyRuleResult::pass(RULE_ALLOWED_DEX, "Allowed DEX", proposal.dex.clone(), limit)
        } else {
            PolicyRuleResult::fail(
                RULE_ALLOWED_DEX,
                "Allowed DEX",
                format!("dex '{}' is not in the allowed set", proposal.dex),
                proposal.dex.clone(),
                limit,
            )
        }
    }

    fn check_allowed_assets(&self, proposal: &SwapProposal) -> PolicyRuleResult {
        let violations: Vec<&str> = [
            (proposal.token_in, "tokenIn"),
            (proposal.token_out, "tokenOut"),
        ]
        .into_iter()
        .filter(|(asset, _)| !self.config.allowed_assets.contains(asset))
        .map(|(_, side)| side)
        .collect();

        let allowed_list = self
            .config
            .allowed_assets
            .iter()
            .map(Asset::symbol)
            .collect::<Vec<_>>()
            .join(",");
        let value = format!("tokenIn={},tokenOut={}", proposal.token_in, proposal.token_out);

        if violations.is_empty() {
            PolicyRuleResult::pass(RULE_ALLOWED_ASSETS, "Allowed Assets", value, allowed_list)
        } else {
            let reason = violations
                .iter()
                .map(|side| {
                    let asset = if *side == "tokenIn" { proposal.token_in } else { proposal.token_out };
                    format!("{side}={asset} is not an allowed asset")
                })
                .collect::<Vec<_>>()
                .join("; ");
            PolicyRuleResult::fail(RULE_ALLOWED_ASSETS, "Allowed Assets", reason, value, allowed_list)
        }
    }

    fn check_max_slippage(&self, proposal: &SwapProposal) -> PolicyRuleResult {
        if proposal.max_slippage_bps <= self.config.max_slippage_bps {
            PolicyRuleResult::pass(
                RULE_MAX_SLIPPAGE,
                "Max Slippage",
                proposal.max_slippage_bps.to_string(),
                self.config.max_slippage_bps.to_string(),
            )
        } else {
            PolicyRuleResult::fail(
                RULE_MAX_SLIPPAGE,
                "Max Slippage",
                format!(
                    "maxSlippageBps {} exceeds policy max {}",
                    proposal.max_slippage_bps, self.config.max_slippage_bps
                ),
                proposal.max_slippage_bps.to_string(),
                self.config.max_slippage_bps.to_string(),
            )
        }
    }
}

/// Amounts below which a [`Decimal`] cannot be represented are not a concern
/// here; this helper exists only so tests can construct "smallest
/// representable unit more than the cap" fixtures without duplicating the
/// scale arithmetic.
pub fn smallest_unit(scale: u32) -> Decimal {
    Decimal::from_minor_units(1, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_types::Ratio;
    use std::collections::{BTreeMap, BTreeSet};

    fn engine() -> PolicyEngine {
        PolicyEngine::new(PolicyConfig {
            max_trade_percent: Ratio::percent(2),
            max_slippage_bps: 50,
            allowed_dexes: BTreeSet::from(["default-venue".to_string()]),
            allowed_assets: BTreeSet::from([Asset::Usdc, Asset::Eth]),
        })
    }

    fn balances() -> BalanceSheet {
        let mut map = BTreeMap::new();
        map.insert(
            Asset::Usdc,
            sentinel_types::SessionBalance::opening(Decimal::parse("980", 6).unwrap()),
        );
        map.insert(
            Asset::Eth,
            sentinel_types::SessionBalance::opening(Decimal::zero(18)),
        );
        map
    }

    fn proposal(amount_in: &str, dex: &str, slippage: u32, token_out: Asset) -> SwapProposal {
        SwapProposal {
            id: "p1".to_string(),
            token_in: Asset::Usdc,
            token_out,
            amount_in: Decimal::parse(amount_in, 6).unwrap(),
            estimated_amount_out: Decimal::zero(18),
            max_slippage_bps: slippage,
            dex: dex.to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn boundary_amount_equal_to_cap_is_admitted() {
        let e = engine();
        let decision = e.evaluate(&proposal("19.6", "default-venue", 50, Asset::Eth), &balances(), 0);
        assert!(decision.approved);
    }

    #[test]
    fn one_minor_unit_over_cap_is_rejected() {
        let e = engine();
        let decision = e.evaluate(&proposal("19.600001", "default-venue", 50, Asset::Eth), &balances(), 0);
        assert!(!decision.approved);
        assert!(!decision.results[0].passed);
    }

    #[test]
    fn missing_balance_entry_fails_rather_than_treating_as_zero() {
        let e = engine();
        let mut p = proposal("1", "default-venue", 50, Asset::Usdc);
        p.token_in = Asset::Eth;
        let mut empty_balances: BalanceSheet = BTreeMap::new();
        empty_balances.insert(
            Asset::Usdc,
            sentinel_types::SessionBalance::opening(Decimal::parse("980", 6).unwrap()),
        );
        let decision = e.evaluate(&p, &empty_balances, 0);
        assert!(!decision.results[0].passed);
        assert!(decision.results[0].reason.as_ref().unwrap().contains("no balance entry"));
    }

    #[test]
    fn disallowed_dex_fails_only_that_rule() {
        let e = engine();
        let decision = e.evaluate(&proposal("10", "curve", 50, Asset::Eth), &balances(), 0);
        assert!(!decision.approved);
        assert!(!decision.results[1].passed);
        assert!(decision.results[0].passed);
    }

    #[test]
    fn disallowed_asset_names_the_violating_side() {
        let e = PolicyEngine::new(PolicyConfig {
            max_trade_percent: Ratio::percent(2),
            max_slippage_bps: 50,
            allowed_dexes: BTreeSet::from(["default-venue".to_string()]),
            allowed_assets: BTreeSet::from([Asset::Usdc]),
        });
        let decision = e.evaluate(&proposal("10", "default-venue", 50, Asset::Eth), &balances(), 0);
        assert!(!decision.results[2].passed);
        assert!(decision.results[2].reason.as_ref().unwrap().contains("tokenOut"));
    }

    #[test]
    fn slippage_boundary_equal_is_admitted_one_more_is_rejected() {
        let e = engine();
        assert!(e.evaluate(&proposal("1", "default-venue", 50, Asset::Eth), &balances(), 0).approved);
        assert!(!e.evaluate(&proposal("1", "default-venue", 51, Asset::Eth), &balances(), 0).approved);
    }

    #[test]
    fn decisions_are_byte_identical_across_runs() {
        let e = engine();
        let p = proposal("10", "default-venue", 50, Asset::Eth);
        let b = balances();
        let d1 = e.evaluate(&p, &b, 42);
        let d2 = e.evaluate(&p, &b, 42);
        assert_eq!(d1, d2);
    }

    #[test]
    fn rule_count_is_always_four() {
        let e = engine();
        let decision = e.evaluate(&proposal("10", "default-venue", 50, Asset::Eth), &balances(), 0);
        assert_eq!(decision.results.len(), RULE_COUNT);
    }
}
