use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::PerformanceTier;
use crate::money::round_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionBasis {
    Percentage,
    Fixed,
}

impl CommissionBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionBasis::Percentage => "percentage",
            CommissionBasis::Fixed => "fixed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(CommissionBasis::Percentage),
            "fixed" => Some(CommissionBasis::Fixed),
            _ => None,
        }
    }
}

/// An active commission rule, already loaded from storage.
#[derive(Debug, Clone)]
pub struct CommissionRuleSpec {
    pub id: Uuid,
    pub basis: CommissionBasis,
    pub value: BigDecimal,
    pub provider_id: Option<Uuid>,
    pub performance_tier: Option<PerformanceTier>,
}

/// The rule picked for a completion, or the built-in default.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCommission {
    pub rule_id: Option<Uuid>,
    pub basis: CommissionBasis,
    pub value: BigDecimal,
}

pub const DEFAULT_COMMISSION_PERCENT: u32 = 10;

impl ResolvedCommission {
    pub fn default_rate() -> Self {
        Self {
            rule_id: None,
            basis: CommissionBasis::Percentage,
            value: BigDecimal::from(DEFAULT_COMMISSION_PERCENT),
        }
    }

    /// Commission owed on `total`. A fixed rule never exceeds the total, so
    /// the invoice net amount stays non-negative.
    pub fn amount(&self, total: &BigDecimal) -> BigDecimal {
        match self.basis {
            CommissionBasis::Percentage => {
                round_money(total * &self.value / BigDecimal::from(100))
            }
            CommissionBasis::Fixed => {
                if &self.value > total {
                    round_money(total.clone())
                } else {
                    round_money(self.value.clone())
                }
            }
        }
    }
}

/// Pick the rule for a provider: provider-scoped beats tier-scoped beats
/// the unscoped "apply to all" rule; with no match the platform default
/// of 10% applies.
pub fn resolve_commission(
    rules: &[CommissionRuleSpec],
    provider_id: Uuid,
    tier: PerformanceTier,
) -> ResolvedCommission {
    let pick = rules
        .iter()
        .find(|r| r.provider_id == Some(provider_id))
        .or_else(|| {
            rules
                .iter()
                .find(|r| r.provider_id.is_none() && r.performance_tier == Some(tier))
        })
        .or_else(|| {
            rules
                .iter()
                .find(|r| r.provider_id.is_none() && r.performance_tier.is_none())
        });

    match pick {
        Some(rule) => ResolvedCommission {
            rule_id: Some(rule.id),
            basis: rule.basis,
            value: rule.value.clone(),
        },
        None => ResolvedCommission::default_rate(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn rule(
        basis: CommissionBasis,
        value: &str,
        provider_id: Option<Uuid>,
        tier: Option<PerformanceTier>,
    ) -> CommissionRuleSpec {
        CommissionRuleSpec {
            id: Uuid::new_v4(),
            basis,
            value: BigDecimal::from_str(value).unwrap(),
            provider_id,
            performance_tier: tier,
        }
    }

    #[test]
    fn default_ten_percent_when_no_rules() {
        let resolved = resolve_commission(&[], Uuid::new_v4(), PerformanceTier::Standard);
        let total = BigDecimal::from(1000);
        assert_eq!(resolved.amount(&total), BigDecimal::from_str("100.00").unwrap());
        assert_eq!(
            &total - resolved.amount(&total),
            BigDecimal::from_str("900.00").unwrap()
        );
    }

    #[test]
    fn provider_rule_beats_tier_and_global() {
        let provider = Uuid::new_v4();
        let rules = vec![
            rule(CommissionBasis::Percentage, "20", None, None),
            rule(
                CommissionBasis::Percentage,
                "15",
                None,
                Some(PerformanceTier::Gold),
            ),
            rule(CommissionBasis::Percentage, "5", Some(provider), None),
        ];
        let resolved = resolve_commission(&rules, provider, PerformanceTier::Gold);
        assert_eq!(resolved.rule_id, Some(rules[2].id));
        assert_eq!(
            resolved.amount(&BigDecimal::from(200)),
            BigDecimal::from_str("10.00").unwrap()
        );
    }

    #[test]
    fn tier_rule_beats_global() {
        let rules = vec![
            rule(CommissionBasis::Percentage, "20", None, None),
            rule(
                CommissionBasis::Percentage,
                "12",
                None,
                Some(PerformanceTier::Silver),
            ),
        ];
        let resolved =
            resolve_commission(&rules, Uuid::new_v4(), PerformanceTier::Silver);
        assert_eq!(resolved.rule_id, Some(rules[1].id));
    }

    #[test]
    fn other_tier_falls_through_to_global() {
        let rules = vec![
            rule(
                CommissionBasis::Percentage,
                "12",
                None,
                Some(PerformanceTier::Gold),
            ),
            rule(CommissionBasis::Percentage, "20", None, None),
        ];
        let resolved =
            resolve_commission(&rules, Uuid::new_v4(), PerformanceTier::Standard);
        assert_eq!(resolved.rule_id, Some(rules[1].id));
    }

    #[test]
    fn fixed_rule_clamped_at_total() {
        let resolved = ResolvedCommission {
            rule_id: None,
            basis: CommissionBasis::Fixed,
            value: BigDecimal::from(500),
        };
        let small_total = BigDecimal::from(300);
        assert_eq!(
            resolved.amount(&small_total),
            BigDecimal::from_str("300.00").unwrap()
        );
        assert_eq!(
            resolved.amount(&BigDecimal::from(800)),
            BigDecimal::from_str("500.00").unwrap()
        );
    }
}
