//! Required-ness of each field.
//!
//! Three sources decide whether a field must be filled in:
//!
//! 1. **Schema** — fields without which the kind makes no sense (sender,
//!    fee, rounds, a payment's receiver ...).
//! 2. **Preset** — the active preset's [`Preset::required_fields`].
//! 3. **Values** — other fields of the same draft. Creating an asset
//!    (no `caid`) needs a total and decimals; going online needs all six
//!    participation values; creating or updating an application needs both
//!    programs.
//!
//! Sources 2 and 3 are "conditional". They are recomputed from scratch on
//! every call and never cached.

use crate::draft::{FieldName, FieldValue, OnComplete, TransactionDraft, TxnKind};
use crate::preset::Preset;

/// Fields required by a kind's schema alone.
pub fn schema_required(kind: TxnKind) -> &'static [FieldName] {
    use FieldName::*;
    match kind {
        TxnKind::Payment => &[Sender, Fee, FirstValid, LastValid, Receiver, Amount],
        TxnKind::AssetTransfer => &[
            Sender,
            Fee,
            FirstValid,
            LastValid,
            AssetReceiver,
            TransferAssetId,
            AssetAmount,
        ],
        TxnKind::AssetConfig | TxnKind::KeyRegistration => &[Sender, Fee, FirstValid, LastValid],
        TxnKind::AssetFreeze => &[
            Sender,
            Fee,
            FirstValid,
            LastValid,
            FreezeAssetId,
            FreezeTarget,
        ],
        TxnKind::ApplicationCall => &[Sender, Fee, FirstValid, LastValid, OnComplete],
    }
}

const PARTICIPATION_FIELDS: [FieldName; 6] = [
    FieldName::VoteKey,
    FieldName::SelectionKey,
    FieldName::StateProofKey,
    FieldName::VoteFirst,
    FieldName::VoteLast,
    FieldName::KeyDilution,
];

/// Fields made required by the preset or by other values in the draft,
/// excluding those the schema already requires. Sorted and deduplicated.
pub fn conditional_requirements(
    draft: &TransactionDraft,
    preset: Option<Preset>,
) -> Vec<FieldName> {
    let kind = draft.kind();
    let mut fields: Vec<FieldName> = preset
        .map(|p| p.required_fields())
        .unwrap_or_default()
        .iter()
        .copied()
        .filter(|f| f.belongs_to(kind))
        .collect();

    match kind {
        TxnKind::AssetConfig if draft.get(FieldName::ConfigAssetId).is_empty() => {
            fields.extend([FieldName::Total, FieldName::Decimals]);
        }
        TxnKind::KeyRegistration => {
            let nonpart = draft.get(FieldName::Nonparticipation) == FieldValue::Flag(true);
            let any_filled = PARTICIPATION_FIELDS
                .iter()
                .any(|f| !draft.get(*f).is_empty());
            if any_filled && !nonpart {
                fields.extend(PARTICIPATION_FIELDS);
            }
        }
        TxnKind::ApplicationCall => {
            let creating = draft.get(FieldName::AppId).is_empty();
            let updating = draft.get(FieldName::OnComplete).as_u64()
                == Some(OnComplete::UpdateApplication.code());
            if creating || updating {
                fields.extend([FieldName::ApprovalProgram, FieldName::ClearProgram]);
            }
        }
        _ => {}
    }

    let schema = schema_required(kind);
    fields.retain(|f| !schema.contains(f));
    fields.sort_unstable();
    fields.dedup();
    fields
}

/// Whether `field` must be filled in on this draft right now.
pub fn is_required(draft: &TransactionDraft, preset: Option<Preset>, field: FieldName) -> bool {
    field.belongs_to(draft.kind())
        && (schema_required(draft.kind()).contains(&field)
            || conditional_requirements(draft, preset).contains(&field))
}
