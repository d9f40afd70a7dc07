//! # Transaction Encoding
//!
//! The seam between a validated draft and the bytes a wallet signs.
//!
//! [`TxnEncoder`] is the collaborator contract: encode a draft into unsigned
//! bytes for a given network, recover the transaction id from a signed
//! payload, and compute the fingerprint used to tell whether a stored
//! signature still belongs to the current draft.
//!
//! [`CanonicalEncoder`] is the reference implementation used by the wizard
//! and the tests.
//!
//! ## Byte layout
//!
//! ```text
//! unsigned := "TX" record*
//! record   := key 0x00 len:u32le value          (records sorted by key)
//! signed   := "STX" signature:[u8; 64] unsigned
//! txid     := hex(SHA-512/256(unsigned))
//! ```
//!
//! Records cover `type`, `gen`, `gh` and every non-empty field of the
//! draft. Flags are written only when set. Fee and payment amount are
//! converted from whole units to integer microunits; other integral numbers
//! are written as `u64` little endian; lists go in as JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use thiserror::Error;

use crate::config::MICROUNITS_PER_UNIT;
use crate::draft::{number_as_u64, FieldName, FieldValue, TransactionDraft};
use crate::validation::schema_required;

/// Prefix of every unsigned payload.
pub const UNSIGNED_TAG: &[u8] = b"TX";

/// Prefix of every signed envelope.
pub const SIGNED_TAG: &[u8] = b"STX";

/// Length of an Ed25519 signature.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Network a transaction is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkParams {
    pub genesis_id: String,
    /// Base64 genesis block hash.
    pub genesis_hash: String,
}

impl NetworkParams {
    pub fn new(genesis_id: impl Into<String>, genesis_hash: impl Into<String>) -> Self {
        Self {
            genesis_id: genesis_id.into(),
            genesis_hash: genesis_hash.into(),
        }
    }

    /// Public test network.
    pub fn testnet() -> Self {
        Self::new(
            "testnet-v1.0",
            "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=",
        )
    }
}

/// Transaction identifier, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxnId(pub String);

impl TxnId {
    fn of(unsigned: &[u8]) -> Self {
        Self(hex::encode(Sha512_256::digest(unsigned)))
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A field the protocol needs is absent or unrepresentable.
    #[error("malformed draft: {0}")]
    MalformedDraft(String),

    #[error("malformed signed payload: {0}")]
    MalformedSignedPayload(String),
}

// ---------------------------------------------------------------------------
// TxnEncoder
// ---------------------------------------------------------------------------

/// Encoding collaborator.
pub trait TxnEncoder: Send + Sync {
    /// Bytes a wallet signs for `draft` on `params`' network.
    fn encode_unsigned(
        &self,
        draft: &TransactionDraft,
        params: &NetworkParams,
    ) -> Result<Vec<u8>, EncodeError>;

    /// Transaction id of a signed envelope.
    fn decode_signed(&self, signed: &[u8]) -> Result<TxnId, EncodeError>;

    /// Id the draft would have once signed on `params`' network.
    fn fingerprint(
        &self,
        draft: &TransactionDraft,
        params: &NetworkParams,
    ) -> Result<TxnId, EncodeError> {
        self.encode_unsigned(draft, params).map(|bytes| TxnId::of(&bytes))
    }
}

/// Reference encoder. See the module docs for the layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalEncoder;

impl TxnEncoder for CanonicalEncoder {
    fn encode_unsigned(
        &self,
        draft: &TransactionDraft,
        params: &NetworkParams,
    ) -> Result<Vec<u8>, EncodeError> {
        let missing: Vec<&str> = schema_required(draft.kind())
            .iter()
            .filter(|f| draft.get(**f).is_empty())
            .map(FieldName::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(EncodeError::MalformedDraft(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
        if params.genesis_id.is_empty() || params.genesis_hash.is_empty() {
            return Err(EncodeError::MalformedDraft(
                "network parameters are empty".into(),
            ));
        }

        let mut records: BTreeMap<&'static str, Vec<u8>> = BTreeMap::new();
        records.insert("type", draft.kind().as_str().as_bytes().to_vec());
        records.insert("gen", params.genesis_id.as_bytes().to_vec());
        records.insert("gh", params.genesis_hash.as_bytes().to_vec());
        for field in draft.fields() {
            if let Some(value) = encode_value(field, draft.get(field))? {
                records.insert(field.as_str(), value);
            }
        }

        let mut out = UNSIGNED_TAG.to_vec();
        for (key, value) in records {
            let len = u32::try_from(value.len()).map_err(|_| {
                EncodeError::MalformedDraft(format!("{key} is too large to encode"))
            })?;
            out.extend_from_slice(key.as_bytes());
            out.push(0);
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&value);
        }
        Ok(out)
    }

    fn decode_signed(&self, signed: &[u8]) -> Result<TxnId, EncodeError> {
        let (_, unsigned) = split_signed(signed)?;
        Ok(TxnId::of(unsigned))
    }
}

fn encode_value(field: FieldName, value: FieldValue) -> Result<Option<Vec<u8>>, EncodeError> {
    let bytes = match value {
        v if v.is_empty() => return Ok(None),
        FieldValue::Flag(false) => return Ok(None),
        FieldValue::Flag(true) => vec![1],
        FieldValue::Text(s) => s.into_bytes(),
        FieldValue::Number(Some(n)) => {
            let integer = match field {
                FieldName::Fee | FieldName::Amount => n
                    .as_f64()
                    .filter(|f| *f >= 0.0)
                    .map(|f| (f * MICROUNITS_PER_UNIT as f64).round() as u64),
                _ => number_as_u64(&n),
            };
            integer
                .ok_or_else(|| EncodeError::MalformedDraft(format!("{field} is not encodable: {n}")))?
                .to_le_bytes()
                .to_vec()
        }
        other => serde_json::to_vec(&other)
            .map_err(|e| EncodeError::MalformedDraft(format!("{field}: {e}")))?,
    };
    Ok(Some(bytes))
}

/// Wraps a signature and the bytes it covers into a signed envelope.
pub fn seal_signed(signature: &[u8; SIGNATURE_LENGTH], unsigned: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(SIGNED_TAG.len() + SIGNATURE_LENGTH + unsigned.len());
    out.extend_from_slice(SIGNED_TAG);
    out.extend_from_slice(signature);
    out.extend_from_slice(unsigned);
    out
}

/// Splits a signed envelope into its signature and unsigned payload.
pub fn split_signed(signed: &[u8]) -> Result<(&[u8], &[u8]), EncodeError> {
    let body = signed
        .strip_prefix(SIGNED_TAG)
        .ok_or_else(|| EncodeError::MalformedSignedPayload("missing STX tag".into()))?;
    if body.len() < SIGNATURE_LENGTH {
        return Err(EncodeError::MalformedSignedPayload(format!(
            "envelope of {} bytes is too short",
            signed.len()
        )));
    }
    let (signature, unsigned) = body.split_at(SIGNATURE_LENGTH);
    if !unsigned.starts_with(UNSIGNED_TAG) {
        return Err(EncodeError::MalformedSignedPayload(
            "payload is not an unsigned transaction".into(),
        ));
    }
    Ok((signature, unsigned))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{BoxRef, FieldShape, TxnKind};

    const ADDR_A: &str = "EW64GC6F24M7NDSC5R3ES4YUVE3ZXXNMARJHDCCCLIHZU6TBEOC7XRSBG4";
    const ADDR_B: &str = "GD64YIY3TWGDMCNPP553DZPPR6LDUSFQOIJVFDPPXWEG3FVOJCCDBBHU5A";

    fn payment() -> TransactionDraft {
        [
            (FieldName::Sender, ADDR_A),
            (FieldName::Fee, "0.001"),
            (FieldName::FirstValid, "6000000"),
            (FieldName::LastValid, "6001000"),
            (FieldName::Receiver, ADDR_B),
            (FieldName::Amount, "5"),
        ]
        .into_iter()
        .fold(TransactionDraft::default(), |d, (f, raw)| {
            d.set_field(f, FieldValue::from_input(f, raw))
        })
    }

    #[test]
    fn encoding_is_deterministic() {
        let enc = CanonicalEncoder;
        let params = NetworkParams::testnet();
        let a = enc.encode_unsigned(&payment(), &params).unwrap();
        let b = enc.encode_unsigned(&payment(), &params).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with(UNSIGNED_TAG));
    }

    #[test]
    fn fingerprint_tracks_draft_and_network() {
        let enc = CanonicalEncoder;
        let testnet = NetworkParams::testnet();
        let base = enc.fingerprint(&payment(), &testnet).unwrap();
        assert_eq!(base.0.len(), 64);

        let edited = payment().set_field(FieldName::Fee, FieldValue::from_input(FieldName::Fee, "0.002"));
        assert_ne!(enc.fingerprint(&edited, &testnet).unwrap(), base);

        let other = NetworkParams::new("mainnet-v1.0", "wGHE2Pwdvd7S12BL5FaOP20EGYesN73ktiC1qzkkit8=");
        assert_ne!(enc.fingerprint(&payment(), &other).unwrap(), base);
    }

    #[test]
    fn fee_is_encoded_in_microunits() {
        let enc = CanonicalEncoder;
        let params = NetworkParams::testnet();
        let as_float = enc.encode_unsigned(&payment(), &params).unwrap();
        // 0.0010 and 0.001 are the same 1000 microunits.
        let same = payment().set_field(FieldName::Fee, FieldValue::from_input(FieldName::Fee, "0.0010"));
        assert_eq!(enc.encode_unsigned(&same, &params).unwrap(), as_float);
    }

    #[test]
    fn every_field_change_alters_fingerprint() {
        let enc = CanonicalEncoder;
        let params = NetworkParams::testnet();
        let base_value = |f: FieldName| match f.shape() {
            FieldShape::Number => FieldValue::Number(Some(1u64.into())),
            _ => FieldValue::Text("base".into()),
        };
        let changed = |f: FieldName| match f.shape() {
            FieldShape::Text => FieldValue::Text("changed".into()),
            FieldShape::Number => FieldValue::Number(Some(777u64.into())),
            FieldShape::Flag => FieldValue::Flag(true),
            FieldShape::TextList => FieldValue::TextList(vec!["a".into()]),
            FieldShape::NumberList => FieldValue::NumberList(vec![Some(9u64.into())]),
            FieldShape::Boxes => FieldValue::Boxes(vec![BoxRef {
                app_id: None,
                name: "b".into(),
            }]),
        };

        for kind in TxnKind::ALL {
            let base = schema_required(kind)
                .iter()
                .fold(TransactionDraft::empty(kind), |d, f| d.set_field(*f, base_value(*f)));
            let id = enc.fingerprint(&base, &params).unwrap();
            for field in base.fields() {
                let edited = base.clone().set_field(field, changed(field));
                assert_ne!(
                    enc.fingerprint(&edited, &params).unwrap(),
                    id,
                    "{field} on {kind} does not reach the payload"
                );
            }
        }
    }

    #[test]
    fn missing_protocol_fields_are_malformed() {
        let enc = CanonicalEncoder;
        let draft = TransactionDraft::empty(TxnKind::AssetFreeze);
        match enc.encode_unsigned(&draft, &NetworkParams::testnet()) {
            Err(EncodeError::MalformedDraft(msg)) => assert!(msg.contains("snd"), "{msg}"),
            other => panic!("expected MalformedDraft, got {:?}", other),
        }
    }

    #[test]
    fn signed_envelope_roundtrip_yields_fingerprint() {
        let enc = CanonicalEncoder;
        let params = NetworkParams::testnet();
        let unsigned = enc.encode_unsigned(&payment(), &params).unwrap();
        let signed = seal_signed(&[7u8; SIGNATURE_LENGTH], &unsigned);
        assert_eq!(
            enc.decode_signed(&signed).unwrap(),
            enc.fingerprint(&payment(), &params).unwrap()
        );
    }

    #[test]
    fn garbage_is_not_a_signed_payload() {
        let enc = CanonicalEncoder;
        let cases: [&[u8]; 4] = [b"", b"STX", b"hello world", &[0u8; 80]];
        for bytes in cases {
            match enc.decode_signed(bytes) {
                Err(EncodeError::MalformedSignedPayload(_)) => {}
                other => panic!("expected MalformedSignedPayload, got {:?}", other),
            }
        }
    }
}
