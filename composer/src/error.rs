//! Error taxonomy of the composer.
//!
//! Field and cross-field failures are carried as data inside
//! [`ComposerError::ValidationFailed`]; they are recoverable and only block
//! submission. A discarded stale signature is not an error at all: it shows
//! up as [`crate::controller::SignOutcome::Discarded`].

use thiserror::Error;

use crate::controller::WizardStep;
use crate::encoding::EncodeError;
use crate::validation::ValidationReport;
use crate::wallet::{NetworkUnavailable, WalletError};

#[derive(Debug, Error)]
pub enum ComposerError {
    #[error(
        "draft is invalid: {} field error(s), {} broken rule(s)",
        .0.field_errors.len(),
        .0.broken_rules().count()
    )]
    ValidationFailed(ValidationReport),

    /// Reading a slot failed. Callers treat this as "nothing stored".
    #[error("could not read the {slot} slot: {reason}")]
    PersistenceRead { slot: &'static str, reason: String },

    /// Writing a slot failed. In-memory state stays authoritative.
    #[error("could not write the {slot} slot: {reason}")]
    PersistenceWrite { slot: &'static str, reason: String },

    #[error(transparent)]
    NetworkUnavailable(#[from] NetworkUnavailable),

    /// The encoder could not produce bytes for a locally valid draft.
    #[error("malformed draft: {0}")]
    MalformedDraft(String),

    #[error("invalid signed payload: {0}")]
    InvalidSignedPayload(String),

    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("cannot {action} while {step}")]
    InvalidStep {
        step: WizardStep,
        action: &'static str,
    },
}

impl From<EncodeError> for ComposerError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::MalformedDraft(msg) => Self::MalformedDraft(msg),
            EncodeError::MalformedSignedPayload(msg) => Self::InvalidSignedPayload(msg),
        }
    }
}

pub type ComposerResult<T> = Result<T, ComposerError>;
