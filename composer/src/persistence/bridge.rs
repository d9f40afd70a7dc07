//! The persistence bridge: the only writer of the draft and signature slots.
//!
//! ## Slots
//!
//! | Slot        | Contents                                                   |
//! |-------------|------------------------------------------------------------|
//! | `draft`     | JSON `{ "v": 1, "gen": ..., "gh": ..., "txn": {...} }`     |
//! | `signature` | `data:application/octet-stream;base64,<signed envelope>`   |
//!
//! ## Staleness
//!
//! A stored signature is current only while the transaction id recovered
//! from it equals the fingerprint of the current draft on the current
//! network. [`PersistenceBridge::check_staleness`] compares the two and
//! clears the signature slot the moment they differ, or when either side
//! cannot be computed at all.
//!
//! Read failures are never fatal: a slot that cannot be read or parsed is
//! treated as empty. Write failures are returned to the caller.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::store::KeyValueStore;
use crate::config::{DRAFT_SCHEMA_VERSION, DRAFT_SLOT, SIGNATURE_DATA_URL_PREFIX, SIGNATURE_SLOT};
use crate::draft::TransactionDraft;
use crate::encoding::{NetworkParams, TxnEncoder, TxnId};
use crate::error::{ComposerError, ComposerResult};

// ---------------------------------------------------------------------------
// Stored shapes
// ---------------------------------------------------------------------------

/// Contents of the draft slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDraft {
    /// Schema version. Slots written before versioning have none and are
    /// read as version 1.
    #[serde(default = "first_version")]
    pub v: u32,
    pub gen: String,
    pub gh: String,
    pub txn: TransactionDraft,
}

fn first_version() -> u32 {
    1
}

impl StoredDraft {
    pub fn new(txn: TransactionDraft, params: &NetworkParams) -> Self {
        Self {
            v: DRAFT_SCHEMA_VERSION,
            gen: params.genesis_id.clone(),
            gh: params.genesis_hash.clone(),
            txn,
        }
    }

    pub fn params(&self) -> NetworkParams {
        NetworkParams::new(self.gen.clone(), self.gh.clone())
    }
}

/// A signed envelope together with the id it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRecord {
    pub payload: Vec<u8>,
    /// Transaction id recovered from `payload`; the fingerprint of the draft
    /// it was produced from.
    pub txn_id: TxnId,
}

/// Why a stored signature was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// The draft or the network changed since signing.
    FingerprintMismatch,
    /// The slot does not hold a decodable signed envelope.
    UndecodablePayload,
    /// The current draft cannot be encoded, so nothing can match it.
    DraftNotEncodable,
}

/// Result of a staleness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    /// No signature stored.
    Absent,
    /// The stored signature matches the current draft.
    Fresh(SignatureRecord),
    /// The stored signature was stale and has been removed.
    Cleared(StaleReason),
}

// ---------------------------------------------------------------------------
// PersistenceBridge
// ---------------------------------------------------------------------------

pub struct PersistenceBridge<S> {
    store: S,
}

impl<S: KeyValueStore> PersistenceBridge<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the draft slot, reporting why it could not be read.
    pub fn try_load(&self) -> ComposerResult<Option<StoredDraft>> {
        let read_error = |reason: String| ComposerError::PersistenceRead {
            slot: DRAFT_SLOT,
            reason,
        };
        let Some(raw) = self.store.get(DRAFT_SLOT).map_err(|e| read_error(e.to_string()))? else {
            return Ok(None);
        };
        let stored: StoredDraft =
            serde_json::from_str(&raw).map_err(|e| read_error(e.to_string()))?;
        if stored.v > DRAFT_SCHEMA_VERSION {
            return Err(read_error(format!(
                "schema version {} is newer than {}",
                stored.v, DRAFT_SCHEMA_VERSION
            )));
        }
        Ok(Some(stored))
    }

    /// Reads the draft slot. Anything unreadable counts as no draft.
    pub fn load(&self) -> Option<StoredDraft> {
        match self.try_load() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable draft");
                None
            }
        }
    }

    pub fn save(&self, stored: &StoredDraft) -> ComposerResult<()> {
        let json = serde_json::to_string(stored).map_err(|e| ComposerError::PersistenceWrite {
            slot: DRAFT_SLOT,
            reason: e.to_string(),
        })?;
        self.write(DRAFT_SLOT, &json)?;
        tracing::debug!(kind = %stored.txn.kind(), "draft saved");
        Ok(())
    }

    pub fn clear_draft(&self) -> ComposerResult<()> {
        self.erase(DRAFT_SLOT)
    }

    /// Reads and decodes the signature slot. Anything unreadable counts as
    /// no signature.
    pub fn load_signature<E: TxnEncoder + ?Sized>(&self, encoder: &E) -> Option<SignatureRecord> {
        self.read_signature(encoder).ok().flatten()
    }

    fn read_signature<E: TxnEncoder + ?Sized>(
        &self,
        encoder: &E,
    ) -> Result<Option<SignatureRecord>, String> {
        let raw = match self.store.get(SIGNATURE_SLOT) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable signature slot");
                return Ok(None);
            }
        };
        let encoded = raw
            .strip_prefix(SIGNATURE_DATA_URL_PREFIX)
            .ok_or_else(|| "signature slot is not a data URL".to_string())?;
        let payload = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| e.to_string())?;
        let txn_id = encoder.decode_signed(&payload).map_err(|e| e.to_string())?;
        Ok(Some(SignatureRecord { payload, txn_id }))
    }

    pub fn save_signature(&self, record: &SignatureRecord) -> ComposerResult<()> {
        let url = format!(
            "{SIGNATURE_DATA_URL_PREFIX}{}",
            base64::engine::general_purpose::STANDARD.encode(&record.payload)
        );
        self.write(SIGNATURE_SLOT, &url)?;
        tracing::info!(txn_id = %record.txn_id, "signature saved");
        Ok(())
    }

    pub fn clear_signature(&self) -> ComposerResult<()> {
        self.erase(SIGNATURE_SLOT)
    }

    /// Compares the stored signature with the current draft and clears it
    /// when they no longer match.
    pub fn check_staleness<E: TxnEncoder + ?Sized>(
        &self,
        draft: &TransactionDraft,
        params: &NetworkParams,
        encoder: &E,
    ) -> ComposerResult<Staleness> {
        let record = match self.read_signature(encoder) {
            Ok(None) => return Ok(Staleness::Absent),
            Ok(Some(record)) => record,
            Err(reason) => {
                tracing::warn!(%reason, "discarding undecodable signature");
                return self.discard(StaleReason::UndecodablePayload);
            }
        };
        match encoder.fingerprint(draft, params) {
            Ok(fingerprint) if fingerprint == record.txn_id => Ok(Staleness::Fresh(record)),
            Ok(fingerprint) => {
                tracing::warn!(
                    signed = %record.txn_id,
                    current = %fingerprint,
                    "discarding stale signature"
                );
                self.discard(StaleReason::FingerprintMismatch)
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding signature of a draft that no longer encodes");
                self.discard(StaleReason::DraftNotEncodable)
            }
        }
    }

    fn discard(&self, reason: StaleReason) -> ComposerResult<Staleness> {
        self.clear_signature()?;
        Ok(Staleness::Cleared(reason))
    }

    fn write(&self, slot: &'static str, value: &str) -> ComposerResult<()> {
        self.store.set(slot, value).map_err(|e| {
            tracing::warn!(slot, error = %e, "write failed");
            ComposerError::PersistenceWrite {
                slot,
                reason: e.to_string(),
            }
        })
    }

    fn erase(&self, slot: &'static str) -> ComposerResult<()> {
        self.store.remove(slot).map_err(|e| {
            tracing::warn!(slot, error = %e, "remove failed");
            ComposerError::PersistenceWrite {
                slot,
                reason: e.to_string(),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
