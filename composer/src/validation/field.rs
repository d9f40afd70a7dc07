//! Per-field validators.
//!
//! Each field belongs to a validation class (address, bounded text, bounded
//! number, digit string, base64 key, list ...). [`validate_field`] looks the
//! class up and checks a raw value against it. Required-ness is an input
//! here, never a property of the field: the caller computes it from the
//! schema, the active preset and the rest of the draft.

use base64::Engine as _;
use serde::Serialize;
use serde_json::Number;
use thiserror::Error;

use crate::config::{
    ADDRESS_LENGTH, ASSET_NAME_MAX_LENGTH, LEASE_LENGTH, MAX_APP_ACCTS, MAX_APP_ARGS,
    MAX_APP_EXTRA_PAGES, MAX_APP_GLOBALS, MAX_APP_KEY_LENGTH, MAX_APP_LOCALS,
    MAX_DECIMAL_PLACES, MAX_ON_COMPLETE, METADATA_HASH_LENGTH, NATIVE_DECIMALS,
    NOTE_MAX_LENGTH, SELECTION_KEY_LENGTH, STATE_PROOF_KEY_LENGTH, UNIT_NAME_MAX_LENGTH,
    URL_MAX_LENGTH, VOTE_KEY_LENGTH,
};
use crate::draft::{BoxRef, FieldName, FieldValue};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a single field value is invalid.
///
/// Serializes as `{"key": "<reason>", ...interpolation data}` so a UI can
/// look up a localized message by key and fill in the numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "key", rename_all = "snake_case")]
pub enum FieldError {
    #[error("this field is required")]
    Required,

    /// A non-empty address that is not exactly `length` characters long.
    #[error("address must be exactly {length} characters long")]
    InvalidAddressLength { length: usize },

    #[error("must be at most {max} bytes long")]
    TooLong { max: usize },

    /// A non-empty value that is not exactly `length` bytes long.
    #[error("must be exactly {length} bytes long")]
    InvalidByteLength { length: usize },

    #[error("must be at least {min}")]
    TooSmall { min: u64 },

    #[error("must be at most {max}")]
    TooLarge { max: u64 },

    #[error("must be a whole number")]
    NotInteger,

    #[error("must have no more than {max} decimal places")]
    TooManyDecimals { max: u32 },

    /// A big-number string holding something other than ASCII digits.
    #[error("must contain only the digits 0-9")]
    NotWholeNumber,

    #[error("must not exceed {max}")]
    OutOfRange { max: u64 },

    #[error("must be valid base64")]
    InvalidBase64,

    #[error("key must decode to exactly {length} bytes")]
    InvalidKeyLength { length: usize },

    #[error("must have at most {max} items")]
    TooManyItems { max: usize },

    #[error("item {index}: {reason}")]
    InvalidItem {
        index: usize,
        reason: Box<FieldError>,
    },

    /// The value is not of the shape the field holds.
    #[error("value has the wrong shape for this field")]
    WrongShape,
}

impl FieldError {
    /// Stable message key of the reason.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::InvalidAddressLength { .. } => "invalid_address_length",
            Self::TooLong { .. } => "too_long",
            Self::InvalidByteLength { .. } => "invalid_byte_length",
            Self::TooSmall { .. } => "too_small",
            Self::TooLarge { .. } => "too_large",
            Self::NotInteger => "not_integer",
            Self::TooManyDecimals { .. } => "too_many_decimals",
            Self::NotWholeNumber => "not_whole_number",
            Self::OutOfRange { .. } => "out_of_range",
            Self::InvalidBase64 => "invalid_base64",
            Self::InvalidKeyLength { .. } => "invalid_key_length",
            Self::TooManyItems { .. } => "too_many_items",
            Self::InvalidItem { .. } => "invalid_item",
            Self::WrongShape => "wrong_shape",
        }
    }
}

// ---------------------------------------------------------------------------
// Field classes
// ---------------------------------------------------------------------------

/// Bounds of a numeric field.
#[derive(Debug, Clone, Copy)]
struct NumberBounds {
    min: u64,
    max: Option<u64>,
    /// `None` means integers only.
    decimals: Option<u32>,
}

impl NumberBounds {
    const fn integer(min: u64, max: Option<u64>) -> Self {
        Self {
            min,
            max,
            decimals: None,
        }
    }

    const fn native_units() -> Self {
        Self {
            min: 0,
            max: None,
            decimals: Some(NATIVE_DECIMALS),
        }
    }
}

/// How a field is judged.
#[derive(Debug, Clone, Copy)]
enum FieldClass {
    Address,
    Text { max: usize },
    ExactBytes { length: usize },
    Numeric(NumberBounds),
    /// Digit string that may exceed 2^53 - 1 but must fit in a u64.
    WholeNumber,
    Base64Key { length: usize },
    FreeText,
    Flag,
    AddressList { max: usize },
    TextList { max: usize },
    IdList,
    BoxList,
}

fn class_of(field: FieldName) -> FieldClass {
    use FieldClass::*;
    use FieldName as F;

    let round = Numeric(NumberBounds::integer(1, None));
    let id = Numeric(NumberBounds::integer(1, None));

    match field {
        F::Sender | F::RekeyTo => Address,
        F::Fee => Numeric(NumberBounds::native_units()),
        F::FirstValid | F::LastValid => round,
        F::Note => Text {
            max: NOTE_MAX_LENGTH,
        },
        F::Lease => ExactBytes {
            length: LEASE_LENGTH,
        },

        F::Receiver | F::CloseTo => Address,
        F::Amount => Numeric(NumberBounds::native_units()),

        F::AssetReceiver | F::RevocationTarget | F::AssetCloseTo => Address,
        F::TransferAssetId => id,
        F::AssetAmount => WholeNumber,

        F::ConfigAssetId => id,
        F::UnitName => Text {
            max: UNIT_NAME_MAX_LENGTH,
        },
        F::AssetName => Text {
            max: ASSET_NAME_MAX_LENGTH,
        },
        F::Total => WholeNumber,
        F::Decimals => Numeric(NumberBounds::integer(0, Some(MAX_DECIMAL_PLACES))),
        F::DefaultFrozen => Flag,
        F::Url => Text {
            max: URL_MAX_LENGTH,
        },
        F::Manager | F::FreezeAddr | F::Clawback | F::Reserve => Address,
        F::MetadataHash => ExactBytes {
            length: METADATA_HASH_LENGTH,
        },

        F::FreezeAssetId => id,
        F::FreezeTarget => Address,
        F::Freeze => Flag,

        F::VoteKey => Base64Key {
            length: VOTE_KEY_LENGTH,
        },
        F::SelectionKey => Base64Key {
            length: SELECTION_KEY_LENGTH,
        },
        F::StateProofKey => Base64Key {
            length: STATE_PROOF_KEY_LENGTH,
        },
        F::VoteFirst | F::VoteLast | F::KeyDilution => round,
        F::Nonparticipation => Flag,

        F::AppId => id,
        F::OnComplete => Numeric(NumberBounds::integer(0, Some(MAX_ON_COMPLETE))),
        F::AppArgs => TextList { max: MAX_APP_ARGS },
        F::ApprovalProgram | F::ClearProgram => FreeText,
        F::GlobalInts | F::GlobalBytes => {
            Numeric(NumberBounds::integer(0, Some(MAX_APP_GLOBALS)))
        }
        F::LocalInts | F::LocalBytes => Numeric(NumberBounds::integer(0, Some(MAX_APP_LOCALS))),
        F::ExtraPages => Numeric(NumberBounds::integer(0, Some(MAX_APP_EXTRA_PAGES))),
        F::ForeignAccounts => AddressList { max: MAX_APP_ACCTS },
        F::ForeignApps | F::ForeignAssets => IdList,
        F::Boxes => BoxList,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Checks a raw value of `field`.
///
/// An empty value is invalid only when `required` is set. Flags are never
/// empty and always valid.
pub fn validate_field(
    field: FieldName,
    value: &FieldValue,
    required: bool,
) -> Result<(), FieldError> {
    if value.is_empty() {
        return if required {
            Err(FieldError::Required)
        } else {
            Ok(())
        };
    }

    match (class_of(field), value) {
        (FieldClass::Address, FieldValue::Text(s)) => check_address(s),
        (FieldClass::Text { max }, FieldValue::Text(s)) => check_max_bytes(s, max),
        (FieldClass::ExactBytes { length }, FieldValue::Text(s)) => {
            if s.len() == length {
                Ok(())
            } else {
                Err(FieldError::InvalidByteLength { length })
            }
        }
        (FieldClass::Numeric(bounds), FieldValue::Number(Some(n))) => check_number(n, bounds),
        (FieldClass::WholeNumber, FieldValue::Text(s)) => check_whole_number(s),
        (FieldClass::Base64Key { length }, FieldValue::Text(s)) => check_base64_key(s, length),
        (FieldClass::FreeText, FieldValue::Text(_)) => Ok(()),
        (FieldClass::Flag, FieldValue::Flag(_)) => Ok(()),
        (FieldClass::AddressList { max }, FieldValue::TextList(items)) => {
            check_items(items, Some(max), |s| check_address(s))
        }
        (FieldClass::TextList { max }, FieldValue::TextList(items)) => {
            check_items(items, Some(max), |_| Ok(()))
        }
        (FieldClass::IdList, FieldValue::NumberList(items)) => check_items(items, None, |n| {
            match n {
                Some(n) => check_number(n, NumberBounds::integer(1, None)),
                None => Err(FieldError::NotInteger),
            }
        }),
        (FieldClass::BoxList, FieldValue::Boxes(items)) => check_items(items, None, check_box),
        (class, value) => {
            tracing::warn!(%field, ?class, shape = ?value.shape(), "value shape does not match field");
            Err(FieldError::WrongShape)
        }
    }
}

fn check_address(s: &str) -> Result<(), FieldError> {
    if s.chars().count() == ADDRESS_LENGTH {
        Ok(())
    } else {
        Err(FieldError::InvalidAddressLength {
            length: ADDRESS_LENGTH,
        })
    }
}

fn check_max_bytes(s: &str, max: usize) -> Result<(), FieldError> {
    if s.len() <= max {
        Ok(())
    } else {
        Err(FieldError::TooLong { max })
    }
}

fn check_number(n: &Number, bounds: NumberBounds) -> Result<(), FieldError> {
    let Some(value) = n.as_f64() else {
        return Err(FieldError::NotInteger);
    };
    if value < bounds.min as f64 {
        return Err(FieldError::TooSmall { min: bounds.min });
    }
    match bounds.decimals {
        None if value.fract() != 0.0 => return Err(FieldError::NotInteger),
        Some(max) if decimal_places(n) > max => {
            return Err(FieldError::TooManyDecimals { max });
        }
        _ => {}
    }
    if let Some(max) = bounds.max {
        if value > max as f64 {
            return Err(FieldError::TooLarge { max });
        }
    }
    Ok(())
}

/// Decimal places in the shortest textual form of `n`, so `0.001` has 3 and
/// `1e-7` has 7.
fn decimal_places(n: &Number) -> u32 {
    let text = n.to_string();
    let (mantissa, exponent) = match text.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i64>().unwrap_or(0)),
        None => (text.as_str(), 0),
    };
    let fraction = mantissa
        .split_once('.')
        .map_or(0, |(_, f)| f.trim_end_matches('0').len()) as i64;
    u32::try_from((fraction - exponent).max(0)).unwrap_or(u32::MAX)
}

fn check_whole_number(s: &str) -> Result<(), FieldError> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::NotWholeNumber);
    }
    match s.parse::<u64>() {
        Ok(_) => Ok(()),
        Err(_) => Err(FieldError::OutOfRange { max: u64::MAX }),
    }
}

fn check_base64_key(s: &str, length: usize) -> Result<(), FieldError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|_| FieldError::InvalidBase64)?;
    if bytes.len() == length {
        Ok(())
    } else {
        Err(FieldError::InvalidKeyLength { length })
    }
}

fn check_box(item: &BoxRef) -> Result<(), FieldError> {
    if let Some(id) = &item.app_id {
        check_number(id, NumberBounds::integer(0, None))?;
    }
    check_max_bytes(&item.name, MAX_APP_KEY_LENGTH)
}

fn check_items<T>(
    items: &[T],
    max: Option<usize>,
    check: impl Fn(&T) -> Result<(), FieldError>,
) -> Result<(), FieldError> {
    if let Some(max) = max {
        if items.len() > max {
            return Err(FieldError::TooManyItems { max });
        }
    }
    for (index, item) in items.iter().enumerate() {
        check(item).map_err(|reason| FieldError::InvalidItem {
            index,
            reason: Box::new(reason),
        })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
