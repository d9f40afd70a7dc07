//! Vocabulary of the draft: transaction kinds, field names and raw values.
//!
//! Field names double as the wire keys of the persisted draft (`snd`, `fv`,
//! `apar_t`, ...), so the string forms here are part of the storage format.
//! Changing one is a schema change.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// TxnKind
// ---------------------------------------------------------------------------

/// Discriminant of a [`super::TransactionDraft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TxnKind {
    /// Native-unit payment.
    #[serde(rename = "pay")]
    Payment,
    /// Asset transfer, opt-in, opt-out or clawback.
    #[serde(rename = "axfer")]
    AssetTransfer,
    /// Asset creation, reconfiguration or destruction.
    #[serde(rename = "acfg")]
    AssetConfig,
    /// Freezing or unfreezing an account's asset holding.
    #[serde(rename = "afrz")]
    AssetFreeze,
    /// Participation key registration (online, offline or nonparticipating).
    #[serde(rename = "keyreg")]
    KeyRegistration,
    /// Application call, creation or update.
    #[serde(rename = "appl")]
    ApplicationCall,
}

impl TxnKind {
    /// Every kind, in the order the compose form lists them.
    pub const ALL: [TxnKind; 6] = [
        TxnKind::Payment,
        TxnKind::AssetTransfer,
        TxnKind::AssetConfig,
        TxnKind::AssetFreeze,
        TxnKind::KeyRegistration,
        TxnKind::ApplicationCall,
    ];

    /// Wire tag written into the `type` key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "pay",
            Self::AssetTransfer => "axfer",
            Self::AssetConfig => "acfg",
            Self::AssetFreeze => "afrz",
            Self::KeyRegistration => "keyreg",
            Self::ApplicationCall => "appl",
        }
    }

    /// Fields specific to this kind, excluding the common header fields.
    pub fn fields(&self) -> &'static [FieldName] {
        use FieldName::*;
        match self {
            Self::Payment => &[Receiver, Amount, CloseTo],
            Self::AssetTransfer => &[
                AssetReceiver,
                TransferAssetId,
                AssetAmount,
                RevocationTarget,
                AssetCloseTo,
            ],
            Self::AssetConfig => &[
                ConfigAssetId,
                UnitName,
                AssetName,
                Total,
                Decimals,
                DefaultFrozen,
                Url,
                Manager,
                FreezeAddr,
                Clawback,
                Reserve,
                MetadataHash,
            ],
            Self::AssetFreeze => &[FreezeAssetId, FreezeTarget, Freeze],
            Self::KeyRegistration => &[
                VoteKey,
                SelectionKey,
                StateProofKey,
                VoteFirst,
                VoteLast,
                KeyDilution,
                Nonparticipation,
            ],
            Self::ApplicationCall => &[
                AppId,
                OnComplete,
                AppArgs,
                ApprovalProgram,
                ClearProgram,
                GlobalInts,
                GlobalBytes,
                LocalInts,
                LocalBytes,
                ExtraPages,
                ForeignAccounts,
                ForeignApps,
                ForeignAssets,
                Boxes,
            ],
        }
    }

    /// Common fields followed by this kind's own fields.
    pub fn all_fields(self) -> impl Iterator<Item = FieldName> {
        FieldName::COMMON.iter().chain(self.fields()).copied()
    }
}

impl fmt::Display for TxnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxnKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// A string did not name a known kind or field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown name: {0}")]
pub struct UnknownName(pub String);

// ---------------------------------------------------------------------------
// FieldName
// ---------------------------------------------------------------------------

/// Raw value shape a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Text,
    Number,
    Flag,
    TextList,
    NumberList,
    Boxes,
}

macro_rules! field_names {
    ($($variant:ident => $key:literal, $shape:ident, $kind:expr;)*) => {
        /// Every field a draft can hold, across all kinds.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum FieldName {
            $(
                #[serde(rename = $key)]
                $variant,
            )*
        }

        impl FieldName {
            /// Every field name.
            pub const ALL: &'static [FieldName] = &[$(FieldName::$variant,)*];

            /// Wire key of the field.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)*
                }
            }

            /// Shape of the raw value this field stores.
            pub fn shape(&self) -> FieldShape {
                match self {
                    $(Self::$variant => FieldShape::$shape,)*
                }
            }

            /// Kind this field belongs to; `None` for the common header.
            pub fn kind(&self) -> Option<TxnKind> {
                match self {
                    $(Self::$variant => $kind,)*
                }
            }
        }
    };
}

field_names! {
    Sender => "snd", Text, None;
    Fee => "fee", Number, None;
    FirstValid => "fv", Number, None;
    LastValid => "lv", Number, None;
    Note => "note", Text, None;
    RekeyTo => "rekey", Text, None;
    Lease => "lx", Text, None;

    Receiver => "rcv", Text, Some(TxnKind::Payment);
    Amount => "amt", Number, Some(TxnKind::Payment);
    CloseTo => "close", Text, Some(TxnKind::Payment);

    AssetReceiver => "arcv", Text, Some(TxnKind::AssetTransfer);
    TransferAssetId => "xaid", Number, Some(TxnKind::AssetTransfer);
    AssetAmount => "aamt", Text, Some(TxnKind::AssetTransfer);
    RevocationTarget => "asnd", Text, Some(TxnKind::AssetTransfer);
    AssetCloseTo => "aclose", Text, Some(TxnKind::AssetTransfer);

    ConfigAssetId => "caid", Number, Some(TxnKind::AssetConfig);
    UnitName => "apar_un", Text, Some(TxnKind::AssetConfig);
    AssetName => "apar_an", Text, Some(TxnKind::AssetConfig);
    Total => "apar_t", Text, Some(TxnKind::AssetConfig);
    Decimals => "apar_dc", Number, Some(TxnKind::AssetConfig);
    DefaultFrozen => "apar_df", Flag, Some(TxnKind::AssetConfig);
    Url => "apar_au", Text, Some(TxnKind::AssetConfig);
    Manager => "apar_m", Text, Some(TxnKind::AssetConfig);
    FreezeAddr => "apar_f", Text, Some(TxnKind::AssetConfig);
    Clawback => "apar_c", Text, Some(TxnKind::AssetConfig);
    Reserve => "apar_r", Text, Some(TxnKind::AssetConfig);
    MetadataHash => "apar_am", Text, Some(TxnKind::AssetConfig);

    FreezeAssetId => "faid", Number, Some(TxnKind::AssetFreeze);
    FreezeTarget => "fadd", Text, Some(TxnKind::AssetFreeze);
    Freeze => "afrz", Flag, Some(TxnKind::AssetFreeze);

    VoteKey => "votekey", Text, Some(TxnKind::KeyRegistration);
    SelectionKey => "selkey", Text, Some(TxnKind::KeyRegistration);
    StateProofKey => "sprfkey", Text, Some(TxnKind::KeyRegistration);
    VoteFirst => "votefst", Number, Some(TxnKind::KeyRegistration);
    VoteLast => "votelst", Number, Some(TxnKind::KeyRegistration);
    KeyDilution => "votekd", Number, Some(TxnKind::KeyRegistration);
    Nonparticipation => "nonpart", Flag, Some(TxnKind::KeyRegistration);

    AppId => "apid", Number, Some(TxnKind::ApplicationCall);
    OnComplete => "apan", Number, Some(TxnKind::ApplicationCall);
    AppArgs => "apaa", TextList, Some(TxnKind::ApplicationCall);
    ApprovalProgram => "apap", Text, Some(TxnKind::ApplicationCall);
    ClearProgram => "apsu", Text, Some(TxnKind::ApplicationCall);
    GlobalInts => "apgs_nui", Number, Some(TxnKind::ApplicationCall);
    GlobalBytes => "apgs_nbs", Number, Some(TxnKind::ApplicationCall);
    LocalInts => "apls_nui", Number, Some(TxnKind::ApplicationCall);
    LocalBytes => "apls_nbs", Number, Some(TxnKind::ApplicationCall);
    ExtraPages => "apep", Number, Some(TxnKind::ApplicationCall);
    ForeignAccounts => "apat", TextList, Some(TxnKind::ApplicationCall);
    ForeignApps => "apfa", NumberList, Some(TxnKind::ApplicationCall);
    ForeignAssets => "apas", NumberList, Some(TxnKind::ApplicationCall);
    Boxes => "apbx", Boxes, Some(TxnKind::ApplicationCall);
}

impl FieldName {
    /// Header fields every kind carries.
    pub const COMMON: &'static [FieldName] = &[
        FieldName::Sender,
        FieldName::Fee,
        FieldName::FirstValid,
        FieldName::LastValid,
        FieldName::Note,
        FieldName::RekeyTo,
        FieldName::Lease,
    ];

    /// Whether the field exists on a draft of `kind`.
    pub fn belongs_to(&self, kind: TxnKind) -> bool {
        self.kind().map_or(true, |k| k == kind)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// OnComplete
// ---------------------------------------------------------------------------

/// Action an application call performs after the approval program runs.
/// Stored in the draft as its numeric code under `apan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnComplete {
    NoOp = 0,
    OptIn = 1,
    CloseOut = 2,
    ClearState = 3,
    UpdateApplication = 4,
    DeleteApplication = 5,
}

impl OnComplete {
    pub fn code(self) -> u64 {
        self as u64
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::NoOp),
            1 => Some(Self::OptIn),
            2 => Some(Self::CloseOut),
            3 => Some(Self::ClearState),
            4 => Some(Self::UpdateApplication),
            5 => Some(Self::DeleteApplication),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// BoxRef
// ---------------------------------------------------------------------------

/// Box reference of an application call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoxRef {
    /// ID of the application owning the box; empty means the called app.
    #[serde(rename = "i", default)]
    pub app_id: Option<Number>,
    /// Box name.
    #[serde(rename = "n", default)]
    pub name: String,
}

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A raw, unvalidated field value.
///
/// Values are stored exactly as entered; only the validators judge them.
/// Numbers keep the precision they were entered with (`serde_json::Number`
/// holds integers as `u64`/`i64` and everything else as `f64`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(Option<Number>),
    Text(String),
    TextList(Vec<String>),
    NumberList(Vec<Option<Number>>),
    Boxes(Vec<BoxRef>),
}

impl FieldValue {
    /// The empty value of a shape: what a field reads as before any input.
    pub fn empty(shape: FieldShape) -> Self {
        match shape {
            FieldShape::Text => Self::Text(String::new()),
            FieldShape::Number => Self::Number(None),
            FieldShape::Flag => Self::Flag(false),
            FieldShape::TextList => Self::TextList(Vec::new()),
            FieldShape::NumberList => Self::NumberList(Vec::new()),
            FieldShape::Boxes => Self::Boxes(Vec::new()),
        }
    }

    /// Whether the value counts as "not filled in". Flags are never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Number(n) => n.is_none(),
            Self::Flag(_) => false,
            Self::TextList(v) => v.is_empty(),
            Self::NumberList(v) => v.is_empty(),
            Self::Boxes(v) => v.is_empty(),
        }
    }

    /// Shape of this value.
    pub fn shape(&self) -> FieldShape {
        match self {
            Self::Text(_) => FieldShape::Text,
            Self::Number(_) => FieldShape::Number,
            Self::Flag(_) => FieldShape::Flag,
            Self::TextList(_) => FieldShape::TextList,
            Self::NumberList(_) => FieldShape::NumberList,
            Self::Boxes(_) => FieldShape::Boxes,
        }
    }

    /// Converts text typed by a user into the raw value shape of `field`.
    ///
    /// Numbers that do not parse become empty, the way a browser number
    /// input reports garbage as "". Lists are comma separated; boxes are
    /// `app_id:name` pairs where the app id may be left out.
    pub fn from_input(field: FieldName, input: &str) -> Self {
        let input = input.trim();
        match field.shape() {
            FieldShape::Text => Self::Text(input.to_string()),
            FieldShape::Number => Self::Number(parse_number(input)),
            FieldShape::Flag => Self::Flag(matches!(
                input.to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            )),
            FieldShape::TextList => Self::TextList(split_list(input).map(str::to_string).collect()),
            FieldShape::NumberList => Self::NumberList(split_list(input).map(parse_number).collect()),
            FieldShape::Boxes => Self::Boxes(
                split_list(input)
                    .map(|item| match item.split_once(':') {
                        Some((id, name)) => BoxRef {
                            app_id: parse_number(id.trim()),
                            name: name.trim().to_string(),
                        },
                        None => BoxRef {
                            app_id: None,
                            name: item.to_string(),
                        },
                    })
                    .collect(),
            ),
        }
    }

    /// The value as a float, when it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(Some(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// The value as a non-negative integer, when it is an integral number.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(Some(n)) => number_as_u64(n),
            _ => None,
        }
    }
}

/// Integral value of a JSON number, accepting `5.0` as well as `5`.
pub fn number_as_u64(n: &Number) -> Option<u64> {
    if let Some(v) = n.as_u64() {
        return Some(v);
    }
    let f = n.as_f64()?;
    // 2^64 is exactly representable; anything at or above it does not fit.
    if f >= 0.0 && f.fract() == 0.0 && f < 18_446_744_073_709_551_616.0 {
        Some(f as u64)
    } else {
        None
    }
}

fn parse_number(input: &str) -> Option<Number> {
    if input.is_empty() {
        return None;
    }
    if let Ok(v) = input.parse::<u64>() {
        return Some(Number::from(v));
    }
    if let Ok(v) = input.parse::<i64>() {
        return Some(Number::from(v));
    }
    input.parse::<f64>().ok().and_then(Number::from_f64)
}

fn split_list(input: &str) -> impl Iterator<Item = &str> {
    input.split(',').map(str::trim).filter(|item| !item.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
