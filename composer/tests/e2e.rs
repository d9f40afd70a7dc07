//! End-to-end tests for the composer.
//!
//! Each test drives a [`DraftController`] the way the wizard does: mount,
//! type into fields, submit, sign, send. Some remount over the same store
//! to check what survives between sessions. Every test owns its storage.

use std::sync::Arc;

use txn_composer::config::{ComposerConfig, DRAFT_SLOT, SIGNATURE_SLOT};
use txn_composer::controller::{DraftController, SignOutcome, WizardStep};
use txn_composer::draft::{FieldName, FieldValue, TxnKind};
use txn_composer::encoding::{CanonicalEncoder, NetworkParams};
use txn_composer::error::ComposerError;
use txn_composer::persistence::{KeyValueStore, MemoryStore, PersistenceBridge, SledStore};
use txn_composer::validation::RuleId;
use txn_composer::wallet::{
    LocalKeyWallet, StaticNetworkParams, WalletProvider, WalletRegistry,
};

const SENDER: &str = "EW64GC6F24M7NDSC5R3ES4YUVE3ZXXNMARJHDCCCLIHZU6TBEOC7XRSBG4";
const RECEIVER: &str = "GD64YIY3TWGDMCNPP553DZPPR6LDUSFQOIJVFDPPXWEG3FVOJCCDBBHU5A";
const CLOSE_TO: &str = "MWAPNXBDFFD2V5KWXAHWKBO7FO4JN36VR4CIBDKDDE7WAUAGZIXM3QPJW4";

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// A store that can be shared between two mounted sessions.
#[derive(Clone, Default)]
struct SharedStore(Arc<MemoryStore>);

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> txn_composer::persistence::store::StoreResult<Option<String>> {
        self.0.get(key)
    }
    fn set(&self, key: &str, value: &str) -> txn_composer::persistence::store::StoreResult<()> {
        self.0.set(key, value)
    }
    fn remove(&self, key: &str) -> txn_composer::persistence::store::StoreResult<()> {
        self.0.remove(key)
    }
}

fn mount<S: KeyValueStore>(store: S, preset: Option<&str>) -> DraftController<S, CanonicalEncoder> {
    DraftController::mount(
        PersistenceBridge::new(store),
        CanonicalEncoder,
        ComposerConfig::default(),
        preset,
    )
}

fn type_in<S: KeyValueStore>(
    c: &mut DraftController<S, CanonicalEncoder>,
    values: &[(FieldName, &str)],
) {
    for (field, raw) in values {
        c.handle_change(*field, FieldValue::from_input(*field, raw))
            .expect("editable");
        c.handle_blur(*field);
    }
}

fn header() -> Vec<(FieldName, &'static str)> {
    vec![
        (FieldName::Sender, SENDER),
        (FieldName::Fee, "0.001"),
        (FieldName::FirstValid, "6000000"),
        (FieldName::LastValid, "6001000"),
    ]
}

fn payment() -> Vec<(FieldName, &'static str)> {
    let mut v = header();
    v.extend([(FieldName::Receiver, RECEIVER), (FieldName::Amount, "5")]);
    v
}

async fn connected_wallet() -> LocalKeyWallet {
    let wallet = LocalKeyWallet::generate(SENDER);
    wallet.connect().await.expect("connect");
    wallet
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn payment_submission_persists_documented_shape() {
    let store = SharedStore::default();
    let mut c = mount(store.clone(), None);
    type_in(&mut c, &payment());
    c.submit().expect("valid payment");
    assert_eq!(c.step(), WizardStep::Reviewing);

    let raw = store.get(DRAFT_SLOT).unwrap().expect("draft saved");
    let saved: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved["gen"], "testnet-v1.0");
    assert_eq!(saved["gh"], "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=");
    assert_eq!(
        saved["txn"],
        serde_json::json!({
            "type": "pay",
            "snd": SENDER,
            "fee": 0.001,
            "fv": 6000000,
            "lv": 6001000,
            "rcv": RECEIVER,
            "amt": 5,
        })
    );
}

#[test]
fn asset_opt_out_requires_close_to() {
    let mut c = mount(MemoryStore::new(), Some("asset_opt_out"));
    assert_eq!(c.values().kind(), TxnKind::AssetTransfer);
    let mut values = header();
    values.extend([
        (FieldName::AssetReceiver, SENDER),
        (FieldName::TransferAssetId, "10458941"),
    ]);
    type_in(&mut c, &values);

    let broken: Vec<RuleId> = c.report().broken_rules().map(|r| r.rule).collect();
    assert_eq!(broken, vec![RuleId::ConditionalRequirement]);
    assert!(c.field_errors().contains_key(&FieldName::AssetCloseTo));
    match c.submit() {
        Err(ComposerError::ValidationFailed(_)) => {}
        other => panic!("expected ValidationFailed, got {:?}", other),
    }

    type_in(&mut c, &[(FieldName::AssetCloseTo, CLOSE_TO)]);
    assert!(c.report().broken_rules().next().is_none());
    assert!(!c.field_errors().contains_key(&FieldName::AssetCloseTo));
    c.submit().expect("opt-out is now valid");
}

#[tokio::test]
async fn full_wizard_with_local_wallet() {
    let store = SharedStore::default();
    let mut c = mount(store.clone(), Some("transfer_algos"));
    type_in(&mut c, &payment());
    c.submit().unwrap();

    let wallet = connected_wallet().await;
    let source = StaticNetworkParams::new(NetworkParams::testnet());
    let outcome = c.sign_with(&source, &wallet).await.unwrap();
    let txn_id = match outcome {
        SignOutcome::Accepted(id) => id,
        other => panic!("expected Accepted, got {:?}", other),
    };
    assert!(store.get(SIGNATURE_SLOT).unwrap().is_some());
    assert!(LocalKeyWallet::verify(
        &c.signature().unwrap().payload,
        &wallet.verifying_key()
    ));

    assert_eq!(c.mark_sent().unwrap(), txn_id);
    assert_eq!(store.get(DRAFT_SLOT).unwrap(), None);
    assert_eq!(store.get(SIGNATURE_SLOT).unwrap(), None);
}

#[tokio::test]
async fn fee_change_after_signing_clears_signature_slot() {
    let store = SharedStore::default();
    let mut c = mount(store.clone(), None);
    type_in(&mut c, &payment());
    c.submit().unwrap();
    let wallet = connected_wallet().await;
    let source = StaticNetworkParams::new(NetworkParams::testnet());
    c.sign_with(&source, &wallet).await.unwrap();
    assert!(c.can_send());

    type_in(&mut c, &[(FieldName::Fee, "0.002")]);
    assert_eq!(store.get(SIGNATURE_SLOT).unwrap(), None);
    assert_eq!(c.step(), WizardStep::Signed);
    assert!(!c.can_send());
}

#[tokio::test]
async fn network_unavailable_is_surfaced() {
    let mut c = mount(MemoryStore::new(), None);
    type_in(&mut c, &payment());
    c.submit().unwrap();
    let wallet = connected_wallet().await;
    let source = StaticNetworkParams::unavailable("node offline");
    match c.sign_with(&source, &wallet).await {
        Err(ComposerError::NetworkUnavailable(e)) => assert_eq!(e.0, "node offline"),
        other => panic!("expected NetworkUnavailable, got {:?}", other),
    }
    assert!(c.signature().is_none());
    assert_eq!(c.step(), WizardStep::Reviewing);
}

#[tokio::test]
async fn disconnected_wallet_leaves_slot_untouched() {
    let store = SharedStore::default();
    let mut c = mount(store.clone(), None);
    type_in(&mut c, &payment());
    c.submit().unwrap();
    let wallet = LocalKeyWallet::generate(SENDER);
    let source = StaticNetworkParams::new(NetworkParams::testnet());
    match c.sign_with(&source, &wallet).await {
        Err(ComposerError::Wallet(_)) => {}
        other => panic!("expected Wallet error, got {:?}", other),
    }
    assert_eq!(store.get(SIGNATURE_SLOT).unwrap(), None);
}

#[test]
fn remount_restores_draft_and_signature() {
    let store = SharedStore::default();
    {
        let mut c = mount(store.clone(), None);
        type_in(&mut c, &payment());
        c.submit().unwrap();
        let request = c.begin_sign().unwrap();
        let signed = txn_composer::encoding::seal_signed(&[3u8; 64], &request.unsigned);
        c.complete_sign(request, signed).unwrap();
    }

    let c = mount(store.clone(), None);
    assert_eq!(c.step(), WizardStep::Signed);
    assert!(c.can_send());
    assert_eq!(
        c.values().get(FieldName::Receiver),
        FieldValue::Text(RECEIVER.into())
    );
}

#[test]
fn remount_on_another_network_drops_signature() {
    let store = SharedStore::default();
    {
        let mut c = mount(store.clone(), None);
        type_in(&mut c, &payment());
        c.submit().unwrap();
        let request = c.begin_sign().unwrap();
        let signed = txn_composer::encoding::seal_signed(&[3u8; 64], &request.unsigned);
        c.complete_sign(request, signed).unwrap();
    }

    let mut c = mount(store.clone(), None);
    c.set_network_params(NetworkParams::new(
        "mainnet-v1.0",
        "wGHE2Pwdvd7S12BL5FaOP20EGYesN73ktiC1qzkkit8=",
    ));
    assert!(c.signature().is_none());
    assert_eq!(store.get(SIGNATURE_SLOT).unwrap(), None);
}

#[test]
fn sled_backed_session_survives_restart() {
    let dir = tempfile::tempdir().expect("temp dir");
    {
        let store = SledStore::open(dir.path()).expect("open store");
        let mut c = mount(store, Some("reg_nonpart"));
        type_in(&mut c, &header());
        c.submit().expect("nonparticipating registration is valid");
    }

    let store = SledStore::open(dir.path()).expect("reopen store");
    let c = mount(store, None);
    assert_eq!(c.values().kind(), TxnKind::KeyRegistration);
    assert_eq!(
        c.values().get(FieldName::Nonparticipation),
        FieldValue::Flag(true)
    );
    assert_eq!(c.step(), WizardStep::Reviewing);
}

#[test]
fn registry_exposes_local_wallet() {
    let mut registry = WalletRegistry::new();
    registry.register(Arc::new(LocalKeyWallet::generate(SENDER)));
    let providers = registry.list_providers();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0].id, LocalKeyWallet::ID);
}
