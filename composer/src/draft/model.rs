//! The draft itself: a tagged union over the six transaction kinds.
//!
//! A [`TransactionDraft`] is a plain value. Every operation consumes or
//! borrows it and hands back a new value; nothing here validates, logs an
//! error to the user, or touches storage. Raw input goes in as-is and the
//! validators decide what it is worth.
//!
//! # JSON shape
//!
//! The draft serializes to a flat object whose `type` key carries the kind
//! and whose other keys are the wire names of [`FieldName`]:
//!
//! ```text
//! { "type": "pay", "snd": "...", "fee": 0.001, "fv": 6000000,
//!   "lv": 6001000, "rcv": "...", "amt": 5 }
//! ```
//!
//! Optional text and number fields are omitted while empty. Flags are
//! always written.

use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::types::{BoxRef, FieldName, FieldValue, TxnKind};

// ---------------------------------------------------------------------------
// Common header
// ---------------------------------------------------------------------------

/// Fields every kind carries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonFields {
    #[serde(rename = "snd")]
    pub sender: String,
    /// Fee in whole native units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<Number>,
    #[serde(rename = "fv", skip_serializing_if = "Option::is_none")]
    pub first_valid: Option<Number>,
    #[serde(rename = "lv", skip_serializing_if = "Option::is_none")]
    pub last_valid: Option<Number>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
    #[serde(rename = "rekey", skip_serializing_if = "String::is_empty")]
    pub rekey_to: String,
    #[serde(rename = "lx", skip_serializing_if = "String::is_empty")]
    pub lease: String,
}

// ---------------------------------------------------------------------------
// Kind-specific fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentFields {
    #[serde(rename = "rcv")]
    pub receiver: String,
    /// Amount in whole native units.
    #[serde(rename = "amt", skip_serializing_if = "Option::is_none")]
    pub amount: Option<Number>,
    #[serde(rename = "close", skip_serializing_if = "String::is_empty")]
    pub close_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetTransferFields {
    #[serde(rename = "arcv")]
    pub receiver: String,
    #[serde(rename = "xaid", skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<Number>,
    /// Base-unit amount kept as a digit string; it may exceed 2^53 - 1.
    #[serde(rename = "aamt", skip_serializing_if = "String::is_empty")]
    pub amount: String,
    #[serde(rename = "asnd", skip_serializing_if = "String::is_empty")]
    pub revocation_target: String,
    #[serde(rename = "aclose", skip_serializing_if = "String::is_empty")]
    pub close_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfigFields {
    /// Empty when creating a new asset.
    #[serde(rename = "caid", skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<Number>,
    #[serde(rename = "apar_un", skip_serializing_if = "String::is_empty")]
    pub unit_name: String,
    #[serde(rename = "apar_an", skip_serializing_if = "String::is_empty")]
    pub asset_name: String,
    /// Total supply as a digit string; it may exceed 2^53 - 1.
    #[serde(rename = "apar_t", skip_serializing_if = "String::is_empty")]
    pub total: String,
    #[serde(rename = "apar_dc", skip_serializing_if = "Option::is_none")]
    pub decimals: Option<Number>,
    #[serde(rename = "apar_df")]
    pub default_frozen: bool,
    #[serde(rename = "apar_au", skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(rename = "apar_m", skip_serializing_if = "String::is_empty")]
    pub manager: String,
    #[serde(rename = "apar_f", skip_serializing_if = "String::is_empty")]
    pub freeze: String,
    #[serde(rename = "apar_c", skip_serializing_if = "String::is_empty")]
    pub clawback: String,
    #[serde(rename = "apar_r", skip_serializing_if = "String::is_empty")]
    pub reserve: String,
    #[serde(rename = "apar_am", skip_serializing_if = "String::is_empty")]
    pub metadata_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetFreezeFields {
    #[serde(rename = "faid", skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<Number>,
    #[serde(rename = "fadd")]
    pub target: String,
    #[serde(rename = "afrz")]
    pub freeze: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyRegistrationFields {
    #[serde(rename = "votekey", skip_serializing_if = "String::is_empty")]
    pub vote_key: String,
    #[serde(rename = "selkey", skip_serializing_if = "String::is_empty")]
    pub selection_key: String,
    #[serde(rename = "sprfkey", skip_serializing_if = "String::is_empty")]
    pub state_proof_key: String,
    #[serde(rename = "votefst", skip_serializing_if = "Option::is_none")]
    pub vote_first: Option<Number>,
    #[serde(rename = "votelst", skip_serializing_if = "Option::is_none")]
    pub vote_last: Option<Number>,
    #[serde(rename = "votekd", skip_serializing_if = "Option::is_none")]
    pub key_dilution: Option<Number>,
    #[serde(rename = "nonpart")]
    pub nonparticipation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationCallFields {
    /// Empty when creating a new application.
    #[serde(rename = "apid", skip_serializing_if = "Option::is_none")]
    pub app_id: Option<Number>,
    /// On-completion action code, 0 (NoOp) through 5 (DeleteApplication).
    #[serde(rename = "apan", skip_serializing_if = "Option::is_none")]
    pub on_complete: Option<Number>,
    #[serde(rename = "apaa", skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(rename = "apap", skip_serializing_if = "String::is_empty")]
    pub approval_program: String,
    #[serde(rename = "apsu", skip_serializing_if = "String::is_empty")]
    pub clear_program: String,
    #[serde(rename = "apgs_nui", skip_serializing_if = "Option::is_none")]
    pub global_ints: Option<Number>,
    #[serde(rename = "apgs_nbs", skip_serializing_if = "Option::is_none")]
    pub global_bytes: Option<Number>,
    #[serde(rename = "apls_nui", skip_serializing_if = "Option::is_none")]
    pub local_ints: Option<Number>,
    #[serde(rename = "apls_nbs", skip_serializing_if = "Option::is_none")]
    pub local_bytes: Option<Number>,
    #[serde(rename = "apep", skip_serializing_if = "Option::is_none")]
    pub extra_pages: Option<Number>,
    #[serde(rename = "apat", skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<String>,
    #[serde(rename = "apfa", skip_serializing_if = "Vec::is_empty")]
    pub foreign_apps: Vec<Option<Number>>,
    #[serde(rename = "apas", skip_serializing_if = "Vec::is_empty")]
    pub foreign_assets: Vec<Option<Number>>,
    #[serde(rename = "apbx", skip_serializing_if = "Vec::is_empty")]
    pub boxes: Vec<BoxRef>,
}

/// Kind-specific half of a draft, tagged by the `type` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KindFields {
    #[serde(rename = "pay")]
    Payment(PaymentFields),
    #[serde(rename = "axfer")]
    AssetTransfer(AssetTransferFields),
    #[serde(rename = "acfg")]
    AssetConfig(AssetConfigFields),
    #[serde(rename = "afrz")]
    AssetFreeze(AssetFreezeFields),
    #[serde(rename = "keyreg")]
    KeyRegistration(KeyRegistrationFields),
    #[serde(rename = "appl")]
    ApplicationCall(ApplicationCallFields),
}

impl KindFields {
    /// Default (all empty) fields for `kind`.
    pub fn empty(kind: TxnKind) -> Self {
        match kind {
            TxnKind::Payment => Self::Payment(Default::default()),
            TxnKind::AssetTransfer => Self::AssetTransfer(Default::default()),
            TxnKind::AssetConfig => Self::AssetConfig(Default::default()),
            TxnKind::AssetFreeze => Self::AssetFreeze(Default::default()),
            TxnKind::KeyRegistration => Self::KeyRegistration(Default::default()),
            TxnKind::ApplicationCall => Self::ApplicationCall(Default::default()),
        }
    }

    pub fn kind(&self) -> TxnKind {
        match self {
            Self::Payment(_) => TxnKind::Payment,
            Self::AssetTransfer(_) => TxnKind::AssetTransfer,
            Self::AssetConfig(_) => TxnKind::AssetConfig,
            Self::AssetFreeze(_) => TxnKind::AssetFreeze,
            Self::KeyRegistration(_) => TxnKind::KeyRegistration,
            Self::ApplicationCall(_) => TxnKind::ApplicationCall,
        }
    }
}

// ---------------------------------------------------------------------------
// Field slots
// ---------------------------------------------------------------------------

/// Borrowed view of one field's storage.
enum Slot<'a> {
    Text(&'a String),
    Number(&'a Option<Number>),
    Flag(&'a bool),
    TextList(&'a Vec<String>),
    NumberList(&'a Vec<Option<Number>>),
    Boxes(&'a Vec<BoxRef>),
}

/// Mutable view of one field's storage.
enum SlotMut<'a> {
    Text(&'a mut String),
    Number(&'a mut Option<Number>),
    Flag(&'a mut bool),
    TextList(&'a mut Vec<String>),
    NumberList(&'a mut Vec<Option<Number>>),
    Boxes(&'a mut Vec<BoxRef>),
}

/// Resolves a field name to its storage. Expanded once for shared and once
/// for mutable borrows; match ergonomics pick the binding mode.
macro_rules! select_slot {
    ($header:expr, $body:expr, $field:expr, $slot:ident) => {{
        let CommonFields {
            sender,
            fee,
            first_valid,
            last_valid,
            note,
            rekey_to,
            lease,
        } = $header;
        match ($body, $field) {
            (_, FieldName::Sender) => Some($slot::Text(sender)),
            (_, FieldName::Fee) => Some($slot::Number(fee)),
            (_, FieldName::FirstValid) => Some($slot::Number(first_valid)),
            (_, FieldName::LastValid) => Some($slot::Number(last_valid)),
            (_, FieldName::Note) => Some($slot::Text(note)),
            (_, FieldName::RekeyTo) => Some($slot::Text(rekey_to)),
            (_, FieldName::Lease) => Some($slot::Text(lease)),

            (
                KindFields::Payment(PaymentFields {
                    receiver,
                    amount,
                    close_to,
                }),
                field,
            ) => match field {
                FieldName::Receiver => Some($slot::Text(receiver)),
                FieldName::Amount => Some($slot::Number(amount)),
                FieldName::CloseTo => Some($slot::Text(close_to)),
                _ => None,
            },

            (
                KindFields::AssetTransfer(AssetTransferFields {
                    receiver,
                    asset_id,
                    amount,
                    revocation_target,
                    close_to,
                }),
                field,
            ) => match field {
                FieldName::AssetReceiver => Some($slot::Text(receiver)),
                FieldName::TransferAssetId => Some($slot::Number(asset_id)),
                FieldName::AssetAmount => Some($slot::Text(amount)),
                FieldName::RevocationTarget => Some($slot::Text(revocation_target)),
                FieldName::AssetCloseTo => Some($slot::Text(close_to)),
                _ => None,
            },

            (
                KindFields::AssetConfig(AssetConfigFields {
                    asset_id,
                    unit_name,
                    asset_name,
                    total,
                    decimals,
                    default_frozen,
                    url,
                    manager,
                    freeze,
                    clawback,
                    reserve,
                    metadata_hash,
                }),
                field,
            ) => match field {
                FieldName::ConfigAssetId => Some($slot::Number(asset_id)),
                FieldName::UnitName => Some($slot::Text(unit_name)),
                FieldName::AssetName => Some($slot::Text(asset_name)),
                FieldName::Total => Some($slot::Text(total)),
                FieldName::Decimals => Some($slot::Number(decimals)),
                FieldName::DefaultFrozen => Some($slot::Flag(default_frozen)),
                FieldName::Url => Some($slot::Text(url)),
                FieldName::Manager => Some($slot::Text(manager)),
                FieldName::FreezeAddr => Some($slot::Text(freeze)),
                FieldName::Clawback => Some($slot::Text(clawback)),
                FieldName::Reserve => Some($slot::Text(reserve)),
                FieldName::MetadataHash => Some($slot::Text(metadata_hash)),
                _ => None,
            },

            (
                KindFields::AssetFreeze(AssetFreezeFields {
                    asset_id,
                    target,
                    freeze,
                }),
                field,
            ) => match field {
                FieldName::FreezeAssetId => Some($slot::Number(asset_id)),
                FieldName::FreezeTarget => Some($slot::Text(target)),
                FieldName::Freeze => Some($slot::Flag(freeze)),
                _ => None,
            },

            (
                KindFields::KeyRegistration(KeyRegistrationFields {
                    vote_key,
                    selection_key,
                    state_proof_key,
                    vote_first,
                    vote_last,
                    key_dilution,
                    nonparticipation,
                }),
                field,
            ) => match field {
                FieldName::VoteKey => Some($slot::Text(vote_key)),
                FieldName::SelectionKey => Some($slot::Text(selection_key)),
                FieldName::StateProofKey => Some($slot::Text(state_proof_key)),
                FieldName::VoteFirst => Some($slot::Number(vote_first)),
                FieldName::VoteLast => Some($slot::Number(vote_last)),
                FieldName::KeyDilution => Some($slot::Number(key_dilution)),
                FieldName::Nonparticipation => Some($slot::Flag(nonparticipation)),
                _ => None,
            },

            (
                KindFields::ApplicationCall(ApplicationCallFields {
                    app_id,
                    on_complete,
                    args,
                    approval_program,
                    clear_program,
                    global_ints,
                    global_bytes,
                    local_ints,
                    local_bytes,
                    extra_pages,
                    accounts,
                    foreign_apps,
                    foreign_assets,
                    boxes,
                }),
                field,
            ) => match field {
                FieldName::AppId => Some($slot::Number(app_id)),
                FieldName::OnComplete => Some($slot::Number(on_complete)),
                FieldName::AppArgs => Some($slot::TextList(args)),
                FieldName::ApprovalProgram => Some($slot::Text(approval_program)),
                FieldName::ClearProgram => Some($slot::Text(clear_program)),
                FieldName::GlobalInts => Some($slot::Number(global_ints)),
                FieldName::GlobalBytes => Some($slot::Number(global_bytes)),
                FieldName::LocalInts => Some($slot::Number(local_ints)),
                FieldName::LocalBytes => Some($slot::Number(local_bytes)),
                FieldName::ExtraPages => Some($slot::Number(extra_pages)),
                FieldName::ForeignAccounts => Some($slot::TextList(accounts)),
                FieldName::ForeignApps => Some($slot::NumberList(foreign_apps)),
                FieldName::ForeignAssets => Some($slot::NumberList(foreign_assets)),
                FieldName::Boxes => Some($slot::Boxes(boxes)),
                _ => None,
            },
        }
    }};
}

// ---------------------------------------------------------------------------
// TransactionDraft
// ---------------------------------------------------------------------------

/// The in-progress, not-yet-signed transaction.
///
/// The header and the kind-specific body are flattened into one JSON object
/// on the wire. The body's variant is the draft's kind; switching kinds
/// throws the old body away wholesale so nothing leaks across kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    #[serde(flatten)]
    pub header: CommonFields,
    #[serde(flatten)]
    pub body: KindFields,
}

impl Default for TransactionDraft {
    fn default() -> Self {
        Self::empty(TxnKind::Payment)
    }
}

impl TransactionDraft {
    /// A draft of `kind` with every field empty.
    pub fn empty(kind: TxnKind) -> Self {
        Self {
            header: CommonFields::default(),
            body: KindFields::empty(kind),
        }
    }

    /// The draft's discriminant.
    pub fn kind(&self) -> TxnKind {
        self.body.kind()
    }

    /// Switches the draft to `kind`.
    ///
    /// Common fields survive. Kind-specific fields are reset to their empty
    /// values, unless the kind does not actually change, in which case the
    /// draft is returned untouched.
    #[must_use]
    pub fn set_kind(self, kind: TxnKind) -> Self {
        if self.kind() == kind {
            return self;
        }
        Self {
            header: self.header,
            body: KindFields::empty(kind),
        }
    }

    /// Stores a raw value into `field`.
    ///
    /// A field that does not exist on the current kind, or a value of the
    /// wrong shape, leaves the draft as it was.
    #[must_use]
    pub fn set_field(mut self, field: FieldName, value: FieldValue) -> Self {
        let kind = self.kind();
        match (self.slot_mut(field), value) {
            (Some(SlotMut::Text(slot)), FieldValue::Text(v)) => *slot = v,
            (Some(SlotMut::Number(slot)), FieldValue::Number(v)) => *slot = v,
            (Some(SlotMut::Flag(slot)), FieldValue::Flag(v)) => *slot = v,
            (Some(SlotMut::TextList(slot)), FieldValue::TextList(v)) => *slot = v,
            (Some(SlotMut::NumberList(slot)), FieldValue::NumberList(v)) => *slot = v,
            (Some(SlotMut::Boxes(slot)), FieldValue::Boxes(v)) => *slot = v,
            (None, _) => {
                tracing::debug!(%field, %kind, "ignoring value for field outside the draft kind");
            }
            (Some(_), value) => {
                tracing::debug!(%field, shape = ?value.shape(), "ignoring value of the wrong shape");
            }
        }
        self
    }

    /// Reads `field`. Fields outside the current kind read as empty.
    pub fn get(&self, field: FieldName) -> FieldValue {
        match self.slot(field) {
            Some(Slot::Text(v)) => FieldValue::Text(v.clone()),
            Some(Slot::Number(v)) => FieldValue::Number(v.clone()),
            Some(Slot::Flag(v)) => FieldValue::Flag(*v),
            Some(Slot::TextList(v)) => FieldValue::TextList(v.clone()),
            Some(Slot::NumberList(v)) => FieldValue::NumberList(v.clone()),
            Some(Slot::Boxes(v)) => FieldValue::Boxes(v.clone()),
            None => FieldValue::empty(field.shape()),
        }
    }

    /// Fields present on this draft: the header followed by the kind's own.
    pub fn fields(&self) -> impl Iterator<Item = FieldName> {
        self.kind().all_fields()
    }

    fn slot(&self, field: FieldName) -> Option<Slot<'_>> {
        select_slot!(&self.header, &self.body, field, Slot)
    }

    fn slot_mut(&mut self, field: FieldName) -> Option<SlotMut<'_>> {
        select_slot!(&mut self.header, &mut self.body, field, SlotMut)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
