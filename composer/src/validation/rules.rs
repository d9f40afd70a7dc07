//! Cross-field rule engine.
//!
//! A rule is a pure function of the whole draft plus the [`RuleContext`].
//! Rules are independent of each other and of per-field validity: every rule
//! runs on every evaluation, so all broken invariants can be shown at once.
//! A rule that does not apply to the draft's kind reports valid.

use serde::Serialize;
use thiserror::Error;

use super::requirements::conditional_requirements;
use crate::config::{MAX_APP_GLOBALS, MAX_APP_LOCALS, MAX_APP_TOTAL_DEPS, MICROUNITS_PER_UNIT};
use crate::draft::{FieldName, FieldValue, TransactionDraft, TxnKind};
use crate::preset::Preset;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identifies a cross-field rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    RoundOrder,
    ConditionalRequirement,
    FeeMinimum,
    VoteRoundOrder,
    AppDependencyLimit,
    AppGlobalSchemaLimit,
    AppLocalSchemaLimit,
}

/// Inputs to the rules beyond the draft itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleContext {
    pub preset: Option<Preset>,
    /// Protocol minimum fee in microunits.
    pub min_fee: u64,
}

/// Why a cross-field rule failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "key", rename_all = "snake_case")]
pub enum RuleError {
    #[error("first valid round {first_valid} is after last valid round {last_valid}")]
    RoundOrder { first_valid: u64, last_valid: u64 },

    #[error("required fields are empty: {}", join(.fields))]
    MissingRequired { fields: Vec<FieldName> },

    #[error("fee of {fee} microunits is below the minimum of {min_fee}")]
    FeeBelowMinimum { fee: u64, min_fee: u64 },

    #[error("first voting round {vote_first} is after last voting round {vote_last}")]
    VoteRoundOrder { vote_first: u64, vote_last: u64 },

    #[error("{count} foreign references exceed the limit of {max}")]
    TooManyDependencies { count: usize, max: usize },

    #[error("global state schema of {total} exceeds the limit of {max}")]
    GlobalSchemaTooLarge { total: u64, max: u64 },

    #[error("local state schema of {total} exceeds the limit of {max}")]
    LocalSchemaTooLarge { total: u64, max: u64 },
}

fn join(fields: &[FieldName]) -> String {
    fields
        .iter()
        .map(FieldName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleResult {
    pub rule: RuleId,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RuleError>,
    /// Fields whose error slot shows this rule's error. Empty when valid.
    pub fields: Vec<FieldName>,
}

impl RuleResult {
    fn valid(rule: RuleId) -> Self {
        Self {
            rule,
            is_valid: true,
            error: None,
            fields: Vec::new(),
        }
    }

    fn invalid(rule: RuleId, error: RuleError, fields: Vec<FieldName>) -> Self {
        Self {
            rule,
            is_valid: false,
            error: Some(error),
            fields,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

type Rule = fn(&TransactionDraft, &RuleContext) -> RuleResult;

const RULES: [Rule; 7] = [
    round_order,
    conditional_requirement,
    fee_minimum,
    vote_round_order,
    app_dependency_limit,
    app_global_schema_limit,
    app_local_schema_limit,
];

/// Runs every rule against `draft`. No short-circuiting.
pub fn evaluate_rules(draft: &TransactionDraft, ctx: &RuleContext) -> Vec<RuleResult> {
    let results: Vec<RuleResult> = RULES.iter().map(|rule| rule(draft, ctx)).collect();
    let broken = results.iter().filter(|r| !r.is_valid).count();
    tracing::debug!(kind = %draft.kind(), broken, "cross-field rules evaluated");
    results
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn round_order(draft: &TransactionDraft, _: &RuleContext) -> RuleResult {
    let first = draft.get(FieldName::FirstValid).as_u64();
    let last = draft.get(FieldName::LastValid).as_u64();
    match (first, last) {
        (Some(first_valid), Some(last_valid)) if first_valid > last_valid => RuleResult::invalid(
            RuleId::RoundOrder,
            RuleError::RoundOrder {
                first_valid,
                last_valid,
            },
            vec![FieldName::FirstValid, FieldName::LastValid],
        ),
        _ => RuleResult::valid(RuleId::RoundOrder),
    }
}

fn conditional_requirement(draft: &TransactionDraft, ctx: &RuleContext) -> RuleResult {
    let missing: Vec<FieldName> = conditional_requirements(draft, ctx.preset)
        .into_iter()
        .filter(|f| draft.get(*f).is_empty())
        .collect();
    if missing.is_empty() {
        RuleResult::valid(RuleId::ConditionalRequirement)
    } else {
        RuleResult::invalid(
            RuleId::ConditionalRequirement,
            RuleError::MissingRequired {
                fields: missing.clone(),
            },
            missing,
        )
    }
}

fn fee_minimum(draft: &TransactionDraft, ctx: &RuleContext) -> RuleResult {
    // Empty or negative fees are the field validator's concern.
    let Some(fee) = draft.get(FieldName::Fee).as_f64().filter(|f| *f >= 0.0) else {
        return RuleResult::valid(RuleId::FeeMinimum);
    };
    let microunits = (fee * MICROUNITS_PER_UNIT as f64).round() as u64;
    if microunits >= ctx.min_fee {
        RuleResult::valid(RuleId::FeeMinimum)
    } else {
        RuleResult::invalid(
            RuleId::FeeMinimum,
            RuleError::FeeBelowMinimum {
                fee: microunits,
                min_fee: ctx.min_fee,
            },
            vec![FieldName::Fee],
        )
    }
}

fn vote_round_order(draft: &TransactionDraft, _: &RuleContext) -> RuleResult {
    let first = draft.get(FieldName::VoteFirst).as_u64();
    let last = draft.get(FieldName::VoteLast).as_u64();
    match (first, last) {
        (Some(vote_first), Some(vote_last)) if vote_first > vote_last => RuleResult::invalid(
            RuleId::VoteRoundOrder,
            RuleError::VoteRoundOrder {
                vote_first,
                vote_last,
            },
            vec![FieldName::VoteFirst, FieldName::VoteLast],
        ),
        _ => RuleResult::valid(RuleId::VoteRoundOrder),
    }
}

fn list_len(value: FieldValue) -> usize {
    match value {
        FieldValue::TextList(v) => v.len(),
        FieldValue::NumberList(v) => v.len(),
        FieldValue::Boxes(v) => v.len(),
        _ => 0,
    }
}

fn app_dependency_limit(draft: &TransactionDraft, _: &RuleContext) -> RuleResult {
    const DEPS: [FieldName; 4] = [
        FieldName::ForeignAccounts,
        FieldName::ForeignApps,
        FieldName::ForeignAssets,
        FieldName::Boxes,
    ];
    if draft.kind() != TxnKind::ApplicationCall {
        return RuleResult::valid(RuleId::AppDependencyLimit);
    }
    let count: usize = DEPS.iter().map(|f| list_len(draft.get(*f))).sum();
    if count <= MAX_APP_TOTAL_DEPS {
        RuleResult::valid(RuleId::AppDependencyLimit)
    } else {
        RuleResult::invalid(
            RuleId::AppDependencyLimit,
            RuleError::TooManyDependencies {
                count,
                max: MAX_APP_TOTAL_DEPS,
            },
            DEPS.to_vec(),
        )
    }
}

fn schema_total(draft: &TransactionDraft, ints: FieldName, bytes: FieldName) -> u64 {
    let ints = draft.get(ints).as_u64().unwrap_or(0);
    let bytes = draft.get(bytes).as_u64().unwrap_or(0);
    ints.saturating_add(bytes)
}

fn app_global_schema_limit(draft: &TransactionDraft, _: &RuleContext) -> RuleResult {
    let total = schema_total(draft, FieldName::GlobalInts, FieldName::GlobalBytes);
    if total <= MAX_APP_GLOBALS {
        RuleResult::valid(RuleId::AppGlobalSchemaLimit)
    } else {
        RuleResult::invalid(
            RuleId::AppGlobalSchemaLimit,
            RuleError::GlobalSchemaTooLarge {
                total,
                max: MAX_APP_GLOBALS,
            },
            vec![FieldName::GlobalInts, FieldName::GlobalBytes],
        )
    }
}

fn app_local_schema_limit(draft: &TransactionDraft, _: &RuleContext) -> RuleResult {
    let total = schema_total(draft, FieldName::LocalInts, FieldName::LocalBytes);
    if total <= MAX_APP_LOCALS {
        RuleResult::valid(RuleId::AppLocalSchemaLimit)
    } else {
        RuleResult::invalid(
            RuleId::AppLocalSchemaLimit,
            RuleError::LocalSchemaTooLarge {
                total,
                max: MAX_APP_LOCALS,
            },
            vec![FieldName::LocalInts, FieldName::LocalBytes],
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_TX_FEE;

    const ADDR: &str = "EW64GC6F24M7NDSC5R3ES4YUVE3ZXXNMARJHDCCCLIHZU6TBEOC7XRSBG4";

    fn ctx(preset: Option<Preset>) -> RuleContext {
        RuleContext {
            preset,
            min_fee: MIN_TX_FEE,
        }
    }

    fn set(draft: TransactionDraft, field: FieldName, raw: &str) -> TransactionDraft {
        draft.set_field(field, FieldValue::from_input(field, raw))
    }

    fn result(draft: &TransactionDraft, c: &RuleContext, rule: RuleId) -> RuleResult {
        evaluate_rules(draft, c)
            .into_iter()
            .find(|r| r.rule == rule)
            .unwrap()
    }

    #[test]
    fn every_rule_reports_once() {
        let results = evaluate_rules(&TransactionDraft::default(), &ctx(None));
        assert_eq!(results.len(), RULES.len());
        assert!(results.iter().all(|r| r.is_valid));
    }

    #[test]
    fn round_order_matches_integer_comparison() {
        for (first, last) in [(1u64, 1u64), (1, 2), (2, 1), (6_000_000, 6_001_000), (10, 9)] {
            let draft = set(
                set(TransactionDraft::default(), FieldName::FirstValid, &first.to_string()),
                FieldName::LastValid,
                &last.to_string(),
            );
            let r = result(&draft, &ctx(None), RuleId::RoundOrder);
            assert_eq!(r.is_valid, first <= last, "fv={first} lv={last}");
            if !r.is_valid {
                assert_eq!(r.fields, vec![FieldName::FirstValid, FieldName::LastValid]);
            }
        }
    }

    #[test]
    fn round_order_ignores_incomplete_pairs() {
        let draft = set(TransactionDraft::default(), FieldName::FirstValid, "100");
        assert!(result(&draft, &ctx(None), RuleId::RoundOrder).is_valid);
    }

    #[test]
    fn opt_out_preset_requires_close_to() {
        let draft = TransactionDraft::empty(TxnKind::AssetTransfer);
        let c = ctx(Some(Preset::AssetOptOut));
        let r = result(&draft, &c, RuleId::ConditionalRequirement);
        assert!(!r.is_valid);
        assert_eq!(
            r.error,
            Some(RuleError::MissingRequired {
                fields: vec![FieldName::AssetCloseTo]
            })
        );

        let filled = set(draft, FieldName::AssetCloseTo, ADDR);
        assert!(result(&filled, &c, RuleId::ConditionalRequirement).is_valid);
    }

    #[test]
    fn fee_below_minimum_is_rejected() {
        let low = set(TransactionDraft::default(), FieldName::Fee, "0.0009");
        match result(&low, &ctx(None), RuleId::FeeMinimum).error {
            Some(RuleError::FeeBelowMinimum { fee: 900, min_fee: 1000 }) => {}
            other => panic!("expected FeeBelowMinimum, got {:?}", other),
        }
        let ok = set(TransactionDraft::default(), FieldName::Fee, "0.001");
        assert!(result(&ok, &ctx(None), RuleId::FeeMinimum).is_valid);
    }

    #[test]
    fn fee_minimum_follows_context() {
        let draft = set(TransactionDraft::default(), FieldName::Fee, "0.001");
        let strict = RuleContext {
            preset: None,
            min_fee: 2_000,
        };
        assert!(!result(&draft, &strict, RuleId::FeeMinimum).is_valid);
    }

    #[test]
    fn vote_rounds_must_be_ordered() {
        let draft = set(
            set(
                TransactionDraft::empty(TxnKind::KeyRegistration),
                FieldName::VoteFirst,
                "300",
            ),
            FieldName::VoteLast,
            "200",
        );
        assert!(!result(&draft, &ctx(None), RuleId::VoteRoundOrder).is_valid);
    }

    #[test]
    fn app_dependencies_are_counted_across_lists() {
        let draft = TransactionDraft::empty(TxnKind::ApplicationCall);
        let draft = set(draft, FieldName::ForeignApps, "1,2,3");
        let draft = set(draft, FieldName::ForeignAssets, "4,5,6");
        assert!(result(&draft, &ctx(None), RuleId::AppDependencyLimit).is_valid);
        let draft = set(draft, FieldName::Boxes, "0:a,0:b,0:c");
        let r = result(&draft, &ctx(None), RuleId::AppDependencyLimit);
        assert_eq!(
            r.error,
            Some(RuleError::TooManyDependencies { count: 9, max: 8 })
        );
    }

    #[test]
    fn app_schema_totals_are_bounded() {
        let draft = TransactionDraft::empty(TxnKind::ApplicationCall);
        let draft = set(draft, FieldName::GlobalInts, "40");
        let draft = set(draft, FieldName::GlobalBytes, "30");
        let draft = set(draft, FieldName::LocalInts, "8");
        let draft = set(draft, FieldName::LocalBytes, "8");
        assert!(!result(&draft, &ctx(None), RuleId::AppGlobalSchemaLimit).is_valid);
        assert!(result(&draft, &ctx(None), RuleId::AppLocalSchemaLimit).is_valid);
    }

    #[test]
    fn all_broken_rules_are_reported_together() {
        let draft = TransactionDraft::empty(TxnKind::AssetTransfer);
        let draft = set(draft, FieldName::Fee, "0");
        let draft = set(draft, FieldName::FirstValid, "10");
        let draft = set(draft, FieldName::LastValid, "5");
        let broken: Vec<RuleId> = evaluate_rules(&draft, &ctx(Some(Preset::AssetOptOut)))
            .into_iter()
            .filter(|r| !r.is_valid)
            .map(|r| r.rule)
            .collect();
        assert_eq!(
            broken,
            vec![
                RuleId::RoundOrder,
                RuleId::ConditionalRequirement,
                RuleId::FeeMinimum
            ]
        );
    }
}
