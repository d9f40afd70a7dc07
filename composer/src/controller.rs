//! # Draft Controller
//!
//! Orchestrates the draft model, validators, rule engine, presets and the
//! persistence bridge for one composing session, and walks the wizard
//! through its steps:
//!
//! ```text
//! Composing ──submit()──▶ Reviewing ──complete_sign()──▶ Signed ──mark_sent()──▶ Sent
//!     ▲                      │
//!     └── edit breaks it ────┘
//! ```
//!
//! Every mutation re-runs field validation and every cross-field rule, then
//! checks the stored signature for staleness. An edit made while in
//! `Signed` clears the signature but leaves the step alone; sending is
//! blocked until the draft is signed again.
//!
//! ## Signing while editing
//!
//! Signing is split into [`DraftController::begin_sign`] and
//! [`DraftController::complete_sign`] so the draft stays editable while a
//! wallet is busy. The result is checked against the draft as it is when
//! the result arrives; a superseded signature is discarded, never stored.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ComposerConfig;
use crate::draft::{FieldName, FieldValue, TransactionDraft, TxnKind};
use crate::encoding::{NetworkParams, TxnEncoder, TxnId};
use crate::error::{ComposerError, ComposerResult};
use crate::persistence::{
    KeyValueStore, PersistenceBridge, SignatureRecord, StaleReason, Staleness, StoredDraft,
};
use crate::preset::Preset;
use crate::validation::{validate_draft, FieldError, RuleContext, RuleResult, ValidationReport};
use crate::wallet::{NetworkParamsSource, WalletProvider};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where the wizard is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Composing,
    Reviewing,
    Signed,
    Sent,
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Composing => write!(f, "composing"),
            Self::Reviewing => write!(f, "reviewing"),
            Self::Signed => write!(f, "signed"),
            Self::Sent => write!(f, "sent"),
        }
    }
}

/// An outstanding request to a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    /// Bytes handed to the wallet.
    pub unsigned: Vec<u8>,
    /// Id the draft had when the request was made.
    pub fingerprint: TxnId,
}

/// What became of a wallet's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    /// The signature matches the current draft and has been stored.
    Accepted(TxnId),
    /// The draft changed while the wallet was busy. Nothing was stored.
    Discarded(StaleReason),
}

// ---------------------------------------------------------------------------
// DraftController
// ---------------------------------------------------------------------------

pub struct DraftController<S, E> {
    bridge: PersistenceBridge<S>,
    encoder: E,
    config: ComposerConfig,
    params: NetworkParams,
    preset: Option<Preset>,
    draft: TransactionDraft,
    touched: BTreeSet<FieldName>,
    show_all_errors: bool,
    report: ValidationReport,
    step: WizardStep,
    signature: Option<SignatureRecord>,
    persistence_error: Option<String>,
}

impl<S: KeyValueStore, E: TxnEncoder> DraftController<S, E> {
    /// Starts a session.
    ///
    /// A saved draft is restored as-is together with the network it was
    /// saved for. Otherwise a fresh draft is created from the preset. The
    /// starting step follows from what was restored: a valid draft resumes
    /// in `Reviewing`, and in `Signed` when its stored signature is fresh.
    pub fn mount(
        bridge: PersistenceBridge<S>,
        encoder: E,
        config: ComposerConfig,
        preset_token: Option<&str>,
    ) -> Self {
        let preset = Preset::resolve(preset_token);
        let stored = bridge.load();
        let restored = stored.is_some();
        let (draft, params) = match stored {
            Some(stored) => {
                let params = stored.params();
                (stored.txn, params)
            }
            None => (fresh_draft(preset), config.network.clone()),
        };

        let mut controller = Self {
            bridge,
            encoder,
            config,
            params,
            preset,
            draft,
            touched: BTreeSet::new(),
            show_all_errors: false,
            report: ValidationReport::default(),
            step: WizardStep::Composing,
            signature: None,
            persistence_error: None,
        };
        controller.revalidate();
        controller.refresh_signature();

        controller.step = match (controller.report.is_valid(), &controller.signature) {
            (true, Some(_)) => WizardStep::Signed,
            (true, None) if restored => WizardStep::Reviewing,
            _ => WizardStep::Composing,
        };
        tracing::info!(
            kind = %controller.draft.kind(),
            preset = ?controller.preset.map(|p| p.as_str()),
            restored,
            step = %controller.step,
            "draft mounted"
        );
        controller
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    pub fn values(&self) -> &TransactionDraft {
        &self.draft
    }

    pub fn touched(&self) -> &BTreeSet<FieldName> {
        &self.touched
    }

    /// Every field error, whether or not it should be shown yet.
    pub fn field_errors(&self) -> &BTreeMap<FieldName, FieldError> {
        &self.report.field_errors
    }

    /// Field errors of touched fields, or all of them after a submit attempt.
    pub fn visible_field_errors(&self) -> BTreeMap<FieldName, FieldError> {
        self.report
            .field_errors
            .iter()
            .filter(|(field, _)| self.show_all_errors || self.touched.contains(field))
            .map(|(field, error)| (*field, error.clone()))
            .collect()
    }

    pub fn rule_results(&self) -> &[RuleResult] {
        &self.report.rules
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn preset(&self) -> Option<Preset> {
        self.preset
    }

    pub fn network_params(&self) -> &NetworkParams {
        &self.params
    }

    pub fn signature(&self) -> Option<&SignatureRecord> {
        self.signature.as_ref()
    }

    pub fn show_all_errors(&self) -> bool {
        self.show_all_errors
    }

    /// Most recent failed write, if the last write did fail.
    pub fn persistence_error(&self) -> Option<&str> {
        self.persistence_error.as_deref()
    }

    pub fn can_sign(&self) -> bool {
        matches!(self.step, WizardStep::Reviewing | WizardStep::Signed) && self.report.is_valid()
    }

    pub fn can_send(&self) -> bool {
        self.step == WizardStep::Signed && self.signature.is_some()
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Stores a raw value into `field` and re-evaluates everything.
    pub fn handle_change(&mut self, field: FieldName, value: FieldValue) -> ComposerResult<()> {
        self.ensure_editable("edit the draft")?;
        let draft = std::mem::take(&mut self.draft);
        self.draft = draft.set_field(field, value);
        tracing::debug!(%field, "field changed");
        self.after_edit();
        Ok(())
    }

    /// Marks `field` as visited so its error may be shown.
    pub fn handle_blur(&mut self, field: FieldName) {
        self.touched.insert(field);
    }

    /// Switches the transaction kind, dropping all kind-specific values.
    pub fn set_kind(&mut self, kind: TxnKind) -> ComposerResult<()> {
        self.ensure_editable("change the transaction kind")?;
        let draft = std::mem::take(&mut self.draft);
        self.draft = draft.set_kind(kind);
        self.touched.retain(|f| f.belongs_to(kind));
        tracing::info!(%kind, "transaction kind changed");
        self.after_edit();
        Ok(())
    }

    /// Re-resolves the preset from a new token. Values are kept; only
    /// required-ness changes, which can send a reviewed draft back to
    /// composing.
    pub fn set_preset(&mut self, token: Option<&str>) {
        self.preset = Preset::resolve(token);
        tracing::info!(preset = ?self.preset.map(|p| p.as_str()), "preset changed");
        self.revalidate();
        self.leave_review_if_invalid();
    }

    /// Switches the network the draft is fingerprinted for.
    pub fn set_network_params(&mut self, params: NetworkParams) {
        if params == self.params {
            return;
        }
        tracing::info!(genesis_id = %params.genesis_id, "network parameters changed");
        self.params = params;
        self.refresh_signature();
        self.autosave();
    }

    /// Fetches and applies current network parameters.
    pub async fn refresh_network_params(
        &mut self,
        source: &(dyn NetworkParamsSource + '_),
    ) -> ComposerResult<()> {
        let params = source.get_params().await?;
        self.set_network_params(params);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Submission & signing
    // -----------------------------------------------------------------------

    /// Shows all errors and, when the draft is fully valid, saves it and
    /// moves on to review.
    pub fn submit(&mut self) -> ComposerResult<()> {
        self.ensure_editable("submit")?;
        self.show_all_errors = true;
        self.revalidate();
        if !self.report.is_valid() {
            tracing::debug!(
                field_errors = self.report.field_errors.len(),
                broken_rules = self.report.broken_rules().count(),
                "submit blocked"
            );
            return Err(ComposerError::ValidationFailed(self.report.clone()));
        }
        let result = self.bridge.save(&StoredDraft::new(self.draft.clone(), &self.params));
        self.record(result);
        if self.step == WizardStep::Composing {
            self.transition(WizardStep::Reviewing);
        }
        Ok(())
    }

    /// Encodes the current draft for a wallet.
    pub fn begin_sign(&self) -> ComposerResult<SignRequest> {
        if !matches!(self.step, WizardStep::Reviewing | WizardStep::Signed) {
            return Err(ComposerError::InvalidStep {
                step: self.step,
                action: "sign",
            });
        }
        if !self.report.is_valid() {
            return Err(ComposerError::ValidationFailed(self.report.clone()));
        }
        let unsigned = self.encoder.encode_unsigned(&self.draft, &self.params)?;
        let fingerprint = self.encoder.fingerprint(&self.draft, &self.params)?;
        Ok(SignRequest {
            unsigned,
            fingerprint,
        })
    }

    /// Accepts a wallet's signed envelope if it still matches the draft as
    /// it is now.
    ///
    /// Only `Reviewing` and `Signed` accept a result. A wallet answering
    /// after the draft went back to composing, or after it was sent, gets
    /// `InvalidStep` and neither slot is touched.
    pub fn complete_sign(
        &mut self,
        request: SignRequest,
        signed: Vec<u8>,
    ) -> ComposerResult<SignOutcome> {
        if !matches!(self.step, WizardStep::Reviewing | WizardStep::Signed) {
            tracing::warn!(step = %self.step, "wallet answered outside of review");
            return Err(ComposerError::InvalidStep {
                step: self.step,
                action: "complete_sign",
            });
        }
        let txn_id = self.encoder.decode_signed(&signed)?;
        if txn_id != request.fingerprint {
            return Err(ComposerError::InvalidSignedPayload(format!(
                "wallet signed {txn_id}, expected {}",
                request.fingerprint
            )));
        }

        let reason = match self.encoder.fingerprint(&self.draft, &self.params) {
            Ok(current) if current == txn_id => None,
            Ok(_) => Some(StaleReason::FingerprintMismatch),
            Err(_) => Some(StaleReason::DraftNotEncodable),
        };
        if let Some(reason) = reason {
            tracing::warn!(%txn_id, ?reason, "discarding signature for a superseded draft");
            self.signature = None;
            let result = self.bridge.clear_signature();
            self.record(result);
            return Ok(SignOutcome::Discarded(reason));
        }

        let record = SignatureRecord {
            payload: signed,
            txn_id: txn_id.clone(),
        };
        let result = self.bridge.save_signature(&record);
        self.record(result);
        self.signature = Some(record);
        self.transition(WizardStep::Signed);
        Ok(SignOutcome::Accepted(txn_id))
    }

    /// Fetches network parameters, asks `wallet` for a signature and
    /// completes the request.
    pub async fn sign_with(
        &mut self,
        source: &(dyn NetworkParamsSource + '_),
        wallet: &(dyn WalletProvider + '_),
    ) -> ComposerResult<SignOutcome> {
        self.refresh_network_params(source).await?;
        let request = self.begin_sign()?;
        let signed = wallet.sign(&request.unsigned).await?;
        self.complete_sign(request, signed)
    }

    /// Records that the signed transaction has been handed off. Both slots
    /// are cleared; the session is over.
    pub fn mark_sent(&mut self) -> ComposerResult<TxnId> {
        if !self.can_send() {
            return Err(ComposerError::InvalidStep {
                step: self.step,
                action: "send",
            });
        }
        let Some(record) = self.signature.take() else {
            return Err(ComposerError::InvalidStep {
                step: self.step,
                action: "send",
            });
        };
        let result = self
            .bridge
            .clear_signature()
            .and_then(|()| self.bridge.clear_draft());
        self.record(result);
        self.transition(WizardStep::Sent);
        Ok(record.txn_id)
    }

    /// Throws the session away and starts over from the preset.
    pub fn reset(&mut self) {
        let result = self
            .bridge
            .clear_signature()
            .and_then(|()| self.bridge.clear_draft());
        self.record(result);
        self.draft = fresh_draft(self.preset);
        self.params = self.config.network.clone();
        self.touched.clear();
        self.show_all_errors = false;
        self.signature = None;
        self.revalidate();
        self.transition(WizardStep::Composing);
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_editable(&self, action: &'static str) -> ComposerResult<()> {
        if self.step == WizardStep::Sent {
            return Err(ComposerError::InvalidStep {
                step: self.step,
                action,
            });
        }
        Ok(())
    }

    fn after_edit(&mut self) {
        self.revalidate();
        self.leave_review_if_invalid();
        self.refresh_signature();
        self.autosave();
    }

    fn leave_review_if_invalid(&mut self) {
        if self.step == WizardStep::Reviewing && !self.report.is_valid() {
            self.transition(WizardStep::Composing);
        }
    }

    fn revalidate(&mut self) {
        let ctx = RuleContext {
            preset: self.preset,
            min_fee: self.config.min_fee,
        };
        self.report = validate_draft(&self.draft, &ctx);
    }

    fn refresh_signature(&mut self) {
        match self
            .bridge
            .check_staleness(&self.draft, &self.params, &self.encoder)
        {
            Ok(Staleness::Fresh(record)) => self.signature = Some(record),
            Ok(Staleness::Absent) => self.signature = None,
            Ok(Staleness::Cleared(reason)) => {
                tracing::info!(?reason, "signature no longer matches the draft");
                self.signature = None;
            }
            Err(e) => {
                self.signature = None;
                self.record(Err(e));
            }
        }
    }

    fn autosave(&mut self) {
        if self.config.autosave {
            let result = self.bridge.save(&StoredDraft::new(self.draft.clone(), &self.params));
            self.record(result);
        }
    }

    fn record(&mut self, result: ComposerResult<()>) {
        match result {
            Ok(()) => self.persistence_error = None,
            Err(e) => {
                tracing::warn!(error = %e, "persistence failed; keeping in-memory state");
                self.persistence_error = Some(e.to_string());
            }
        }
    }

    fn transition(&mut self, to: WizardStep) {
        if self.step != to {
            tracing::info!(from = %self.step, %to, "wizard step");
            self.step = to;
        }
    }
}

fn fresh_draft(preset: Option<Preset>) -> TransactionDraft {
    match preset {
        Some(preset) => preset.seed(TransactionDraft::empty(preset.kind())),
        None => TransactionDraft::default(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
