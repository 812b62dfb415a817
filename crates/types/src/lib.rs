//! Shared value types for the Namekit SDK.
//!
//! A [`Domain`] is the parsed, normalized form of a dotted name and carries
//! memoized EIP-137 hashes. The remaining types describe what the chain
//! reports about a name (its [`Registration`]) and what a caller reads or
//! writes through a resolver ([`RecordQuery`], [`RecordValues`],
//! [`RecordUpdate`]).

pub mod domain;
pub mod price;
pub mod records;
pub mod registration;

pub use domain::{labelhash, name_split, namehash, normalize, Domain, DomainError};
pub use price::Price;
pub use records::{
    AddressValue, CoinType, RawAddress, RawContentHash, RecordError, RecordQuery, RecordUpdate,
    RecordValues, RrSetQuery,
};
pub use registration::{Ownership, Registration, RegistrationSource, RegistrationStatus};
