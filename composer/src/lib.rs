// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # txn-composer — Transaction Draft State Machine
//!
//! Everything between "the user started typing" and "a wallet signed it":
//! a typed draft of one transaction, the validation that decides whether it
//! may be submitted, the presets that tighten that validation, and the
//! persistence contract that keeps a stored signature honest.
//!
//! ## Architecture
//!
//! - **draft** — The tagged transaction draft and its field vocabulary.
//! - **validation** — Per-field validators and cross-field rules.
//! - **preset** — Named intents that make optional fields required.
//! - **encoding** — Draft to bytes, transaction ids and fingerprints.
//! - **wallet** — Signing wallets and network parameter sources.
//! - **persistence** — Draft and signature slots, and the staleness check.
//! - **controller** — Ties it all together into compose → sign → send.
//! - **config** — Protocol limits and runtime configuration.
//!
//! ## Data flow
//!
//! ```text
//! raw input → field validators → cross-field rules → submit → persistence → signing
//! ```
//!
//! ## Ground rules
//!
//! 1. The draft is a value. Editing it never fails; validators judge it.
//! 2. Every rule runs on every change. No caching, no short-circuit.
//! 3. A signature is current exactly while its transaction id equals the
//!    fingerprint of the current draft on the current network.

pub mod config;
pub mod controller;
pub mod draft;
pub mod encoding;
pub mod error;
pub mod persistence;
pub mod preset;
pub mod validation;
pub mod wallet;

pub use config::ComposerConfig;
pub use controller::{DraftController, SignOutcome, SignRequest, WizardStep};
pub use draft::{FieldName, FieldValue, TransactionDraft, TxnKind};
pub use encoding::{CanonicalEncoder, NetworkParams, TxnEncoder, TxnId};
pub use error::{ComposerError, ComposerResult};
pub use persistence::{KeyValueStore, MemoryStore, PersistenceBridge, SledStore};
pub use preset::Preset;
pub use validation::{validate_draft, ValidationReport};
pub use wallet::{LocalKeyWallet, NetworkParamsSource, StaticNetworkParams, WalletProvider};
