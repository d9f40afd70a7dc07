//! # Persistence
//!
//! ```text
//! store.rs  — KeyValueStore trait, MemoryStore, SledStore
//! bridge.rs — draft / signature slots and the staleness check
//! ```

pub mod bridge;
pub mod store;

pub use bridge::{PersistenceBridge, SignatureRecord, StaleReason, Staleness, StoredDraft};
pub use store::{KeyValueStore, MemoryStore, SledStore, StoreError};
