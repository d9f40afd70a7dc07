//! # Validation
//!
//! Two layers judge a draft:
//!
//! ```text
//! field.rs        — one validator per field class, required-ness passed in
//! requirements.rs — schema, preset and value-conditional required-ness
//! rules.rs        — cross-field rules over the whole draft
//! ```
//!
//! [`validate_draft`] runs both layers and folds the outcome into a
//! [`ValidationReport`]. A draft may be submitted only when the report has
//! no field errors and no broken rules.

pub mod field;
pub mod requirements;
pub mod rules;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::draft::{FieldName, TransactionDraft};

pub use field::{validate_field, FieldError};
pub use requirements::{conditional_requirements, is_required, schema_required};
pub use rules::{evaluate_rules, RuleContext, RuleError, RuleId, RuleResult};

/// Full validation outcome for one draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Fields whose own validator failed under their current required-ness.
    pub field_errors: BTreeMap<FieldName, FieldError>,
    /// One entry per cross-field rule, valid or not.
    pub rules: Vec<RuleResult>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.field_errors.is_empty() && self.rules.iter().all(|r| r.is_valid)
    }

    pub fn broken_rules(&self) -> impl Iterator<Item = &RuleResult> {
        self.rules.iter().filter(|r| !r.is_valid)
    }

    /// Cross-field errors attached to `field`'s error slot.
    pub fn rule_errors_for(&self, field: FieldName) -> Vec<&RuleError> {
        self.broken_rules()
            .filter(|r| r.fields.contains(&field))
            .filter_map(|r| r.error.as_ref())
            .collect()
    }
}

/// Validates every field of the draft's kind, then runs every rule.
pub fn validate_draft(draft: &TransactionDraft, ctx: &RuleContext) -> ValidationReport {
    let schema = schema_required(draft.kind());
    let conditional = conditional_requirements(draft, ctx.preset);

    let field_errors = draft
        .fields()
        .filter_map(|field| {
            let required = schema.contains(&field) || conditional.contains(&field);
            validate_field(field, &draft.get(field), required)
                .err()
                .map(|e| (field, e))
        })
        .collect();

    ValidationReport {
        field_errors,
        rules: evaluate_rules(draft, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_TX_FEE;
    use crate::draft::{FieldValue, TxnKind};
    use crate::preset::Preset;

    const ADDR_A: &str = "EW64GC6F24M7NDSC5R3ES4YUVE3ZXXNMARJHDCCCLIHZU6TBEOC7XRSBG4";
    const ADDR_B: &str = "GD64YIY3TWGDMCNPP553DZPPR6LDUSFQOIJVFDPPXWEG3FVOJCCDBBHU5A";

    fn fill(mut draft: TransactionDraft, values: &[(FieldName, &str)]) -> TransactionDraft {
        for (field, raw) in values {
            draft = draft.set_field(*field, FieldValue::from_input(*field, raw));
        }
        draft
    }

    fn ctx(preset: Option<Preset>) -> RuleContext {
        RuleContext {
            preset,
            min_fee: MIN_TX_FEE,
        }
    }

    fn header() -> Vec<(FieldName, &'static str)> {
        vec![
            (FieldName::Sender, ADDR_A),
            (FieldName::Fee, "0.001"),
            (FieldName::FirstValid, "6000000"),
            (FieldName::LastValid, "6001000"),
        ]
    }

    #[test]
    fn complete_payment_is_valid() {
        let mut values = header();
        values.extend([(FieldName::Receiver, ADDR_B), (FieldName::Amount, "5")]);
        let report = validate_draft(&fill(TransactionDraft::default(), &values), &ctx(None));
        assert!(report.is_valid(), "{report:?}");
    }

    #[test]
    fn empty_draft_reports_required_fields() {
        let report = validate_draft(&TransactionDraft::default(), &ctx(None));
        assert!(!report.is_valid());
        for field in schema_required(TxnKind::Payment) {
            assert_eq!(report.field_errors.get(field), Some(&FieldError::Required));
        }
        assert!(!report.field_errors.contains_key(&FieldName::Note));
    }

    #[test]
    fn opt_out_without_close_to_fails_both_layers() {
        let mut values = header();
        values.extend([
            (FieldName::AssetReceiver, ADDR_A),
            (FieldName::TransferAssetId, "10458941"),
            (FieldName::AssetAmount, "0"),
        ]);
        let draft = fill(TransactionDraft::empty(TxnKind::AssetTransfer), &values);
        let c = ctx(Some(Preset::AssetOptOut));

        let report = validate_draft(&draft, &c);
        assert_eq!(
            report.field_errors.get(&FieldName::AssetCloseTo),
            Some(&FieldError::Required)
        );
        assert_eq!(report.rule_errors_for(FieldName::AssetCloseTo).len(), 1);

        let draft = fill(draft, &[(FieldName::AssetCloseTo, ADDR_B)]);
        let report = validate_draft(&draft, &c);
        assert!(report.is_valid(), "{report:?}");
    }

    #[test]
    fn field_errors_use_current_requirements() {
        // Same empty `apar_t`, required only while `caid` is empty.
        let mut values = header();
        values.push((FieldName::Decimals, "0"));
        let create = fill(TransactionDraft::empty(TxnKind::AssetConfig), &values);
        let report = validate_draft(&create, &ctx(None));
        assert!(report.field_errors.contains_key(&FieldName::Total));

        let reconfig = fill(create, &[(FieldName::ConfigAssetId, "99")]);
        let report = validate_draft(&reconfig, &ctx(None));
        assert!(!report.field_errors.contains_key(&FieldName::Total));
    }

    #[test]
    fn round_error_attaches_to_both_rounds() {
        let mut values = header();
        values.extend([
            (FieldName::Receiver, ADDR_B),
            (FieldName::Amount, "5"),
            (FieldName::FirstValid, "7000000"),
        ]);
        let report = validate_draft(&fill(TransactionDraft::default(), &values), &ctx(None));
        assert!(report.field_errors.is_empty());
        assert_eq!(report.rule_errors_for(FieldName::FirstValid).len(), 1);
        assert_eq!(report.rule_errors_for(FieldName::LastValid).len(), 1);
    }
}
