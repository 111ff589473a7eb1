//! DICT request/response models and validation rules.
//!
//! These are the caller-facing types. Nothing here knows about XML or
//! SOAP; the translator maps them to the wire schema.

pub mod requests;
pub mod types;

pub use requests::*;
pub use types::{
    Account, AccountType, Claim, ClaimRef, ClaimStatus, ClaimType, DictKey, Entry, EntryLookup, KeyType, Owner,
    OwnerType, Portability, ValidationError,
};
