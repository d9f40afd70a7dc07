//! # Draft Model
//!
//! The typed, tagged data model of a transaction under construction.
//!
//! ```text
//! types.rs — TxnKind, FieldName, FieldValue and the other vocabulary types
//! model.rs — TransactionDraft: empty / set_kind / set_field / get
//! ```
//!
//! Everything in here is a pure value. Judging those values is the job of
//! [`crate::validation`].

pub mod model;
pub mod types;

pub use model::{
    ApplicationCallFields, AssetConfigFields, AssetFreezeFields, AssetTransferFields,
    CommonFields, KeyRegistrationFields, KindFields, PaymentFields, TransactionDraft,
};
pub use types::{
    number_as_u64, BoxRef, FieldName, FieldShape, FieldValue, OnComplete, TxnKind, UnknownName,
};
