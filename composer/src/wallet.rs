//! # Wallet & Network Collaborators
//!
//! The two slow, external things the composer waits on:
//!
//! - a [`WalletProvider`] that turns unsigned bytes into a signed envelope,
//! - a [`NetworkParamsSource`] that reports the current genesis id and hash.
//!
//! Both are async traits so a real implementation can talk to a browser
//! extension, a hardware device or a node. The in-process implementations
//! here ([`LocalKeyWallet`], [`StaticNetworkParams`]) back the CLI and tests.

use std::sync::Arc;

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use serde::Serialize;
use thiserror::Error;

use crate::encoding::{seal_signed, split_signed, EncodeError, NetworkParams, UNSIGNED_TAG};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("no wallet provider with id {0}")]
    UnknownProvider(String),

    #[error("wallet is not connected")]
    NotConnected,

    #[error("wallet rejected the request: {0}")]
    Rejected(String),

    #[error("invalid signing key")]
    InvalidKey,

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Network parameters could not be fetched. Retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("network unavailable: {0}")]
pub struct NetworkUnavailable(pub String);

// ---------------------------------------------------------------------------
// WalletProvider
// ---------------------------------------------------------------------------

/// What a wallet provider says about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderMetadata {
    pub id: String,
    pub name: String,
}

/// Capability interface of a signing wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn metadata(&self) -> ProviderMetadata;

    /// Connects and returns the accounts the wallet can sign for.
    async fn connect(&self) -> Result<Vec<String>, WalletError>;

    /// Signs unsigned transaction bytes, returning the signed envelope.
    async fn sign(&self, unsigned: &[u8]) -> Result<Vec<u8>, WalletError>;

    async fn disconnect(&self) -> Result<(), WalletError>;
}

/// Known wallet providers, in registration order.
#[derive(Default, Clone)]
pub struct WalletRegistry {
    providers: Vec<Arc<dyn WalletProvider>>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn WalletProvider>) {
        tracing::debug!(id = %provider.metadata().id, "wallet provider registered");
        self.providers.push(provider);
    }

    pub fn list_providers(&self) -> Vec<ProviderMetadata> {
        self.providers.iter().map(|p| p.metadata()).collect()
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn WalletProvider>, WalletError> {
        self.providers
            .iter()
            .find(|p| p.metadata().id == id)
            .cloned()
            .ok_or_else(|| WalletError::UnknownProvider(id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// LocalKeyWallet
// ---------------------------------------------------------------------------

/// Signs with an Ed25519 key held in process memory.
pub struct LocalKeyWallet {
    signing_key: SigningKey,
    address: String,
    connected: Mutex<bool>,
}

impl LocalKeyWallet {
    pub const ID: &'static str = "local";

    /// Wraps an existing key. `address` is the account the key controls.
    pub fn new(signing_key: SigningKey, address: impl Into<String>) -> Self {
        Self {
            signing_key,
            address: address.into(),
            connected: Mutex::new(false),
        }
    }

    /// Fresh random key.
    pub fn generate(address: impl Into<String>) -> Self {
        Self::new(SigningKey::generate(&mut OsRng), address)
    }

    /// Key from its 32-byte secret, hex encoded.
    pub fn from_hex(secret: &str, address: impl Into<String>) -> Result<Self, WalletError> {
        let bytes: [u8; SECRET_KEY_LENGTH] = hex::decode(secret.trim())
            .map_err(|_| WalletError::InvalidKey)?
            .try_into()
            .map_err(|_| WalletError::InvalidKey)?;
        Ok(Self::new(SigningKey::from_bytes(&bytes), address))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Checks a signed envelope against `key`.
    pub fn verify(signed: &[u8], key: &VerifyingKey) -> bool {
        let Ok((signature, unsigned)) = split_signed(signed) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(unsigned, &signature).is_ok()
    }
}

#[async_trait]
impl WalletProvider for LocalKeyWallet {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            id: Self::ID.to_string(),
            name: "Local key".to_string(),
        }
    }

    async fn connect(&self) -> Result<Vec<String>, WalletError> {
        *self.connected.lock() = true;
        Ok(vec![self.address.clone()])
    }

    async fn sign(&self, unsigned: &[u8]) -> Result<Vec<u8>, WalletError> {
        if !*self.connected.lock() {
            return Err(WalletError::NotConnected);
        }
        if !unsigned.starts_with(UNSIGNED_TAG) {
            return Err(WalletError::Rejected(
                "payload is not an unsigned transaction".into(),
            ));
        }
        let signature = self.signing_key.sign(unsigned);
        tracing::info!(account = %self.address, bytes = unsigned.len(), "transaction signed");
        Ok(seal_signed(&signature.to_bytes(), unsigned))
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        *self.connected.lock() = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NetworkParamsSource
// ---------------------------------------------------------------------------

/// Source of the current network parameters.
#[async_trait]
pub trait NetworkParamsSource: Send + Sync {
    async fn get_params(&self) -> Result<NetworkParams, NetworkUnavailable>;
}

/// Fixed parameters, or a fixed failure.
#[derive(Debug, Clone)]
pub struct StaticNetworkParams {
    params: Result<NetworkParams, String>,
}

impl StaticNetworkParams {
    pub fn new(params: NetworkParams) -> Self {
        Self { params: Ok(params) }
    }

    /// A source that always fails with [`NetworkUnavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            params: Err(reason.into()),
        }
    }
}

#[async_trait]
impl NetworkParamsSource for StaticNetworkParams {
    async fn get_params(&self) -> Result<NetworkParams, NetworkUnavailable> {
        self.params.clone().map_err(NetworkUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "EW64GC6F24M7NDSC5R3ES4YUVE3ZXXNMARJHDCCCLIHZU6TBEOC7XRSBG4";

    #[tokio::test]
    async fn sign_requires_connection() {
        let wallet = LocalKeyWallet::generate(ADDR);
        match wallet.sign(b"TXpayload").await {
            Err(WalletError::NotConnected) => {}
            other => panic!("expected NotConnected, got {:?}", other),
        }
        assert_eq!(wallet.connect().await.unwrap(), vec![ADDR.to_string()]);
        assert!(wallet.sign(b"TXpayload").await.is_ok());
        wallet.disconnect().await.unwrap();
        assert!(wallet.sign(b"TXpayload").await.is_err());
    }

    #[tokio::test]
    async fn signed_envelope_verifies() {
        let wallet = LocalKeyWallet::generate(ADDR);
        wallet.connect().await.unwrap();
        let signed = wallet.sign(b"TXpayload").await.unwrap();
        assert!(LocalKeyWallet::verify(&signed, &wallet.verifying_key()));

        let other = LocalKeyWallet::generate(ADDR);
        assert!(!LocalKeyWallet::verify(&signed, &other.verifying_key()));
    }

    #[tokio::test]
    async fn refuses_non_transaction_bytes() {
        let wallet = LocalKeyWallet::generate(ADDR);
        wallet.connect().await.unwrap();
        match wallet.sign(b"hello").await {
            Err(WalletError::Rejected(_)) => {}
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn from_hex_checks_length() {
        assert!(LocalKeyWallet::from_hex(&"11".repeat(32), ADDR).is_ok());
        assert_eq!(
            LocalKeyWallet::from_hex("abcd", ADDR).err(),
            Some(WalletError::InvalidKey)
        );
    }

    #[test]
    fn registry_lookup() {
        let mut registry = WalletRegistry::new();
        registry.register(Arc::new(LocalKeyWallet::generate(ADDR)));
        assert_eq!(registry.list_providers().len(), 1);
        assert!(registry.get(LocalKeyWallet::ID).is_ok());
        match registry.get("pera") {
            Err(WalletError::UnknownProvider(id)) => assert_eq!(id, "pera"),
            other => panic!("expected UnknownProvider, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn static_source_reports_unavailability() {
        let ok = StaticNetworkParams::new(NetworkParams::testnet());
        assert_eq!(ok.get_params().await.unwrap(), NetworkParams::testnet());
        let down = StaticNetworkParams::unavailable("node offline");
        assert_eq!(
            down.get_params().await,
            Err(NetworkUnavailable("node offline".into()))
        );
    }
}
