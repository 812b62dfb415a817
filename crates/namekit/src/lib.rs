//! Client SDK for decentralized naming across registry families.
//!
//! A [`NameClient`] wraps a [`ChainProvider`], batches its reads
//! through an aggregating multicall, and routes each operation to the
//! handler for the name's registry family:
//!
//! - the standard family, shared registrar with per-TLD controllers
//!   and optional commit/reveal,
//! - ENS `.eth`, mandatory commit/reveal with name-wrapper custody,
//! - the forever family, one-time registrations with no expiry.
//!
//! Records, prices, registrations and domain values come from
//! [`namekit_types`]; DNS record sets are carried in the wire format
//! implemented by [`namekit_dnscodec`].

mod contracts;
mod gateway;
mod handlers;
mod resolver;

pub mod client;
pub mod error;
pub mod options;

pub use client::NameClient;
pub use error::{NameError, Result};
pub use options::{RegisterOptions, RenewOptions, TransferOptions, TxOptions, UpdateConfig};

pub use namekit_dnscodec::{
    CodecError, DnskeyData, DsData, Record, RecordClass, RecordData, RecordType, TlsaData, TxtData,
};
pub use namekit_provider::{
    contract_address, CallBatcher, ChainProvider, ContractRole, NetworkId, PendingTransaction,
    ProviderError, ReadCall, TransactionRequest,
};
pub use namekit_types::{
    labelhash, namehash, normalize, AddressValue, CoinType, Domain, DomainError, Ownership, Price,
    RawAddress, RawContentHash, RecordError, RecordQuery, RecordUpdate, RecordValues, Registration,
    RegistrationSource, RegistrationStatus, RrSetQuery,
};
