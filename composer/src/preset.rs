//! # Presets
//!
//! A preset is a named intent ("opt out of an asset", "register online")
//! arriving as a query-style token. It picks the kind a fresh draft starts
//! with, seeds a few values, and makes some otherwise-optional fields
//! required. It never clears anything the user already entered.
//!
//! Resolution is forgiving: an unknown token resolves to `None` and the
//! wizard carries on with no special requirements.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::draft::{FieldName, FieldValue, OnComplete, TransactionDraft, TxnKind};

/// Name of the query parameter carrying the preset token.
pub const PARAM_NAME: &str = "preset";

/// A named transaction intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    TransferAlgos,
    RekeyAccount,
    CloseAccount,
    AssetTransfer,
    AssetOptIn,
    AssetOptOut,
    AssetCreate,
    AssetReconfig,
    AssetClawback,
    AssetDestroy,
    AssetFreeze,
    AssetUnfreeze,
    AppRun,
    AppOptIn,
    AppDeploy,
    AppUpdate,
    AppClose,
    AppClear,
    AppDelete,
    RegOnline,
    RegOffline,
    RegNonpart,
}

impl Preset {
    pub const ALL: [Preset; 22] = [
        Preset::TransferAlgos,
        Preset::RekeyAccount,
        Preset::CloseAccount,
        Preset::AssetTransfer,
        Preset::AssetOptIn,
        Preset::AssetOptOut,
        Preset::AssetCreate,
        Preset::AssetReconfig,
        Preset::AssetClawback,
        Preset::AssetDestroy,
        Preset::AssetFreeze,
        Preset::AssetUnfreeze,
        Preset::AppRun,
        Preset::AppOptIn,
        Preset::AppDeploy,
        Preset::AppUpdate,
        Preset::AppClose,
        Preset::AppClear,
        Preset::AppDelete,
        Preset::RegOnline,
        Preset::RegOffline,
        Preset::RegNonpart,
    ];

    /// Resolves an incoming token. Unknown or absent tokens yield `None`.
    pub fn resolve(token: Option<&str>) -> Option<Preset> {
        let token = token?.trim();
        let preset = Self::ALL.into_iter().find(|p| p.as_str() == token);
        if preset.is_none() && !token.is_empty() {
            tracing::debug!(token, "ignoring unknown preset");
        }
        preset
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransferAlgos => "transfer_algos",
            Self::RekeyAccount => "rekey_account",
            Self::CloseAccount => "close_account",
            Self::AssetTransfer => "asset_transfer",
            Self::AssetOptIn => "asset_opt_in",
            Self::AssetOptOut => "asset_opt_out",
            Self::AssetCreate => "asset_create",
            Self::AssetReconfig => "asset_reconfig",
            Self::AssetClawback => "asset_clawback",
            Self::AssetDestroy => "asset_destroy",
            Self::AssetFreeze => "asset_freeze",
            Self::AssetUnfreeze => "asset_unfreeze",
            Self::AppRun => "app_run",
            Self::AppOptIn => "app_opt_in",
            Self::AppDeploy => "app_deploy",
            Self::AppUpdate => "app_update",
            Self::AppClose => "app_close",
            Self::AppClear => "app_clear",
            Self::AppDelete => "app_delete",
            Self::RegOnline => "reg_online",
            Self::RegOffline => "reg_offline",
            Self::RegNonpart => "reg_nonpart",
        }
    }

    /// Kind of transaction this preset composes.
    pub fn kind(&self) -> TxnKind {
        match self {
            Self::TransferAlgos | Self::RekeyAccount | Self::CloseAccount => TxnKind::Payment,
            Self::AssetTransfer | Self::AssetOptIn | Self::AssetOptOut | Self::AssetClawback => {
                TxnKind::AssetTransfer
            }
            Self::AssetCreate | Self::AssetReconfig | Self::AssetDestroy => TxnKind::AssetConfig,
            Self::AssetFreeze | Self::AssetUnfreeze => TxnKind::AssetFreeze,
            Self::AppRun
            | Self::AppOptIn
            | Self::AppDeploy
            | Self::AppUpdate
            | Self::AppClose
            | Self::AppClear
            | Self::AppDelete => TxnKind::ApplicationCall,
            Self::RegOnline | Self::RegOffline | Self::RegNonpart => TxnKind::KeyRegistration,
        }
    }

    /// Fields this preset makes required on top of the kind's own schema.
    pub fn required_fields(&self) -> &'static [FieldName] {
        use FieldName::*;
        match self {
            Self::RekeyAccount => &[RekeyTo],
            Self::CloseAccount => &[CloseTo],
            Self::AssetOptOut => &[AssetCloseTo],
            Self::AssetCreate => &[UnitName, AssetName, Total, Decimals],
            Self::AssetReconfig | Self::AssetDestroy => &[ConfigAssetId],
            Self::AssetClawback => &[RevocationTarget],
            Self::AppRun | Self::AppOptIn | Self::AppClose | Self::AppClear | Self::AppDelete => {
                &[AppId]
            }
            Self::AppDeploy => &[ApprovalProgram, ClearProgram],
            Self::AppUpdate => &[AppId, ApprovalProgram, ClearProgram],
            Self::RegOnline => &[
                VoteKey,
                SelectionKey,
                StateProofKey,
                VoteFirst,
                VoteLast,
                KeyDilution,
            ],
            Self::TransferAlgos
            | Self::AssetTransfer
            | Self::AssetOptIn
            | Self::AssetFreeze
            | Self::AssetUnfreeze
            | Self::RegOffline
            | Self::RegNonpart => &[],
        }
    }

    /// Fills the preset's default values into a freshly created draft.
    ///
    /// Only call this on a draft that has no user input yet; restored
    /// drafts are left exactly as they were saved.
    #[must_use]
    pub fn seed(&self, draft: TransactionDraft) -> TransactionDraft {
        let draft = draft.set_kind(self.kind());
        let on_complete = |oc: OnComplete| FieldValue::Number(Some(Number::from(oc.code())));
        match self {
            Self::AssetOptIn | Self::AssetOptOut => {
                draft.set_field(FieldName::AssetAmount, FieldValue::Text("0".into()))
            }
            Self::AssetFreeze => draft.set_field(FieldName::Freeze, FieldValue::Flag(true)),
            Self::AssetUnfreeze => draft.set_field(FieldName::Freeze, FieldValue::Flag(false)),
            Self::RegNonpart => draft.set_field(FieldName::Nonparticipation, FieldValue::Flag(true)),
            Self::AppRun | Self::AppDeploy => {
                draft.set_field(FieldName::OnComplete, on_complete(OnComplete::NoOp))
            }
            Self::AppOptIn => draft.set_field(FieldName::OnComplete, on_complete(OnComplete::OptIn)),
            Self::AppClose => {
                draft.set_field(FieldName::OnComplete, on_complete(OnComplete::CloseOut))
            }
            Self::AppClear => {
                draft.set_field(FieldName::OnComplete, on_complete(OnComplete::ClearState))
            }
            Self::AppUpdate => draft.set_field(
                FieldName::OnComplete,
                on_complete(OnComplete::UpdateApplication),
            ),
            Self::AppDelete => draft.set_field(
                FieldName::OnComplete,
                on_complete(OnComplete::DeleteApplication),
            ),
            _ => draft,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_known_token() {
        for preset in Preset::ALL {
            assert_eq!(Preset::resolve(Some(preset.as_str())), Some(preset));
        }
    }

    #[test]
    fn unknown_or_missing_token_is_none() {
        assert_eq!(Preset::resolve(None), None);
        assert_eq!(Preset::resolve(Some("")), None);
        assert_eq!(Preset::resolve(Some("asset_optout")), None);
        assert_eq!(Preset::resolve(Some("TRANSFER_ALGOS")), None);
    }

    #[test]
    fn serde_uses_token_form() {
        let json = serde_json::to_string(&Preset::AssetOptOut).unwrap();
        assert_eq!(json, "\"asset_opt_out\"");
    }

    #[test]
    fn required_fields_belong_to_preset_kind() {
        for preset in Preset::ALL {
            for field in preset.required_fields() {
                assert!(
                    field.belongs_to(preset.kind()),
                    "{preset} requires {field} outside {}",
                    preset.kind()
                );
            }
        }
    }

    #[test]
    fn opt_out_requires_close_to() {
        assert_eq!(
            Preset::AssetOptOut.required_fields(),
            &[FieldName::AssetCloseTo]
        );
    }

    #[test]
    fn seed_sets_kind_and_defaults() {
        let draft = Preset::AssetFreeze.seed(TransactionDraft::default());
        assert_eq!(draft.kind(), TxnKind::AssetFreeze);
        assert_eq!(draft.get(FieldName::Freeze), FieldValue::Flag(true));

        let draft = Preset::RegNonpart.seed(TransactionDraft::default());
        assert_eq!(draft.get(FieldName::Nonparticipation), FieldValue::Flag(true));

        let draft = Preset::AppDelete.seed(TransactionDraft::default());
        assert_eq!(draft.get(FieldName::OnComplete).as_u64(), Some(5));

        let draft = Preset::AssetOptIn.seed(TransactionDraft::default());
        assert_eq!(draft.get(FieldName::AssetAmount), FieldValue::Text("0".into()));
    }
}
