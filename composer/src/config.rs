//! # Protocol Limits & Composer Configuration
//!
//! Every protocol limit the validators enforce lives here. If a length or a
//! bound shows up as a bare literal anywhere else in the crate, it belongs
//! in this file instead.
//!
//! The constants mirror the network's published parameter tables. They are
//! not tunable at runtime: a draft that violates them would be rejected by
//! the network no matter what the local configuration says. The one value
//! that *does* move (the minimum fee) is carried in [`ComposerConfig`] and
//! handed to the rule engine at evaluation time.

use serde::{Deserialize, Serialize};

use crate::encoding::NetworkParams;

// ---------------------------------------------------------------------------
// Field Limits
// ---------------------------------------------------------------------------

/// Number of characters in a valid account address.
pub const ADDRESS_LENGTH: usize = 58;

/// A lease is either absent or exactly this many bytes.
pub const LEASE_LENGTH: usize = 32;

/// Maximum note length in bytes.
pub const NOTE_MAX_LENGTH: usize = 1000;

/// Maximum asset unit name length in bytes.
pub const UNIT_NAME_MAX_LENGTH: usize = 8;

/// Maximum asset name length in bytes.
pub const ASSET_NAME_MAX_LENGTH: usize = 32;

/// Maximum asset URL length in bytes.
pub const URL_MAX_LENGTH: usize = 96;

/// Asset metadata hash length. No more and no fewer, unless empty.
pub const METADATA_HASH_LENGTH: usize = 32;

/// Maximum number of decimal places an asset may declare.
pub const MAX_DECIMAL_PLACES: u64 = 19;

/// Decimal places of the native unit. Fees and payment amounts are entered
/// in whole units and may not be more precise than one microunit.
pub const NATIVE_DECIMALS: u32 = 6;

/// Microunits per whole native unit.
pub const MICROUNITS_PER_UNIT: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// Participation Keys
// ---------------------------------------------------------------------------

/// Decoded length of a voting key.
pub const VOTE_KEY_LENGTH: usize = 32;

/// Decoded length of a selection key.
pub const SELECTION_KEY_LENGTH: usize = 32;

/// Decoded length of a state proof key.
pub const STATE_PROOF_KEY_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Application Limits
// ---------------------------------------------------------------------------

/// Maximum total of foreign accounts, apps, assets and box references.
pub const MAX_APP_TOTAL_DEPS: usize = 8;

/// Maximum number of application arguments.
pub const MAX_APP_ARGS: usize = 16;

/// Maximum global integers plus global byte slices.
pub const MAX_APP_GLOBALS: u64 = 64;

/// Maximum local integers plus local byte slices.
pub const MAX_APP_LOCALS: u64 = 16;

/// Maximum number of extra program pages.
pub const MAX_APP_EXTRA_PAGES: u64 = 3;

/// Maximum number of foreign accounts.
pub const MAX_APP_ACCTS: usize = 4;

/// Maximum length of a box name in bytes.
pub const MAX_APP_KEY_LENGTH: usize = 64;

/// Highest on-completion action code (DeleteApplication).
pub const MAX_ON_COMPLETE: u64 = 5;

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

/// Protocol minimum transaction fee in microunits at the time of writing.
/// The live value is supplied through [`ComposerConfig::min_fee`].
pub const MIN_TX_FEE: u64 = 1_000;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Storage key of the draft slot.
pub const DRAFT_SLOT: &str = "draft";

/// Storage key of the signature slot.
pub const SIGNATURE_SLOT: &str = "signature";

/// Schema version written into the draft slot. Slots carrying a newer
/// version are treated as "no prior draft".
pub const DRAFT_SCHEMA_VERSION: u32 = 1;

/// Prefix of the data URL written into the signature slot.
pub const SIGNATURE_DATA_URL_PREFIX: &str = "data:application/octet-stream;base64,";

// ---------------------------------------------------------------------------
// ComposerConfig
// ---------------------------------------------------------------------------

/// Runtime knobs for a composing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Minimum fee in microunits, fed to the fee rule.
    pub min_fee: u64,
    /// Network parameters used for fingerprinting until a fresher set is
    /// fetched from the network collaborator.
    pub network: NetworkParams,
    /// Persist the draft after every change instead of only on submit.
    pub autosave: bool,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            min_fee: MIN_TX_FEE,
            network: NetworkParams::testnet(),
            autosave: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_length_matches_encoding() {
        // 32-byte key + 4-byte checksum, base32 without padding.
        assert_eq!(ADDRESS_LENGTH, (36 * 8 + 4) / 5);
    }

    #[test]
    fn test_app_limits_sanity() {
        assert!(MAX_APP_ACCTS <= MAX_APP_TOTAL_DEPS);
        assert!(MAX_APP_LOCALS <= MAX_APP_GLOBALS);
    }

    #[test]
    fn test_default_config_uses_protocol_minimum() {
        let cfg = ComposerConfig::default();
        assert_eq!(cfg.min_fee, MIN_TX_FEE);
        assert!(cfg.autosave);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: ComposerConfig = serde_json::from_str(r#"{"min_fee": 2000}"#).unwrap();
        assert_eq!(cfg.min_fee, 2_000);
        assert_eq!(cfg.network, NetworkParams::testnet());
    }
}
