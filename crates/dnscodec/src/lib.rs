//! Binary codec for DNS resource records stored on chain.
//!
//! Records are carried as a flat run of uncompressed wire-format resource
//! records, the layout `setDNSRecords` resolvers expect. Encoding takes a
//! presentation-level [`Record`] list, normalizes it into canonical order,
//! collapses redundant delete markers and packs everything into one buffer;
//! decoding walks such a buffer back into [`Record`] values.
//!
//! A record with no data is a delete marker: it encodes as a bare header
//! with a zero-length payload, which instructs the resolver to drop the
//! whole record set for that name and type.

pub mod error;
pub mod name;
pub mod record;
pub mod wire;

pub use error::CodecError;
pub use name::{decode_name, encode_name, encoded_name};
pub use record::{
    DnskeyData, DsData, Record, RecordClass, RecordData, RecordType, TlsaData, TxtData,
};
pub use wire::{decode_rrsets, decode_rrsets_hex, encode_rrsets, rrset_id};
