use alloy_primitives::{Address, Bytes};
use namekit_dnscodec::{Record, RecordType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("unsupported coin type '{0}'")]
    UnsupportedCoinType(String),
}

/// SLIP-44 coin type used to select an address record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoinType(pub u64);

impl CoinType {
    pub const ETH: CoinType = CoinType(60);
}

impl std::str::FromStr for CoinType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("eth") {
            return Ok(CoinType::ETH);
        }
        s.parse::<u64>()
            .map(CoinType)
            .map_err(|_| RecordError::UnsupportedCoinType(s.to_string()))
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == CoinType::ETH {
            f.write_str("ETH")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Serialize for CoinType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CoinType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Address bytes for a coin without a checksummed text form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAddress(pub Bytes);

/// Multicodec content hash bytes, stored without interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawContentHash(pub Bytes);

/// An address record value, either a checksummable Ethereum address or
/// raw bytes for other coin types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressValue {
    Eth(Address),
    Raw(RawAddress),
}

/// One DNS resource-record set to read, identified by name and type.
///
/// The name defaults to the domain being queried when `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RrSetQuery {
    pub name: Option<String>,
    pub rtype: RecordType,
}

impl From<RecordType> for RrSetQuery {
    fn from(rtype: RecordType) -> Self {
        RrSetQuery { name: None, rtype }
    }
}

/// Which record kinds to read in a single resolver query.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub dns: Vec<RrSetQuery>,
    pub text: Vec<String>,
    pub address: Vec<CoinType>,
    pub content_hash: bool,
}

/// Values read back for a [`RecordQuery`].
///
/// Map entries exist for every requested key; `None` means the resolver
/// holds nothing for it (or the underlying call failed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordValues {
    pub dns: Vec<Record>,
    pub text: BTreeMap<String, Option<String>>,
    pub address: BTreeMap<CoinType, Option<AddressValue>>,
    pub content_hash: Option<RawContentHash>,
}

/// Record values to write in a single transaction.
#[derive(Debug, Clone, Default)]
pub struct RecordUpdate {
    pub dns: Vec<Record>,
    pub text: BTreeMap<String, String>,
    pub address: BTreeMap<CoinType, AddressValue>,
    pub content_hash: Option<RawContentHash>,
}

impl RecordUpdate {
    pub fn is_empty(&self) -> bool {
        self.dns.is_empty()
            && self.text.is_empty()
            && self.address.is_empty()
            && self.content_hash.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_type_parsing() {
        assert_eq!("ETH".parse::<CoinType>().unwrap(), CoinType::ETH);
        assert_eq!("eth".parse::<CoinType>().unwrap(), CoinType(60));
        assert_eq!("0".parse::<CoinType>().unwrap(), CoinType(0));
        assert_eq!("2147483648".parse::<CoinType>().unwrap(), CoinType(2147483648));
        assert!(matches!(
            "btc".parse::<CoinType>(),
            Err(RecordError::UnsupportedCoinType(_))
        ));
        assert!("-3".parse::<CoinType>().is_err());
    }

    #[test]
    fn coin_type_display() {
        assert_eq!(CoinType::ETH.to_string(), "ETH");
        assert_eq!(CoinType(0).to_string(), "0");
    }

    #[test]
    fn empty_update() {
        assert!(RecordUpdate::default().is_empty());
        let update = RecordUpdate {
            text: BTreeMap::from([("avatar".to_string(), "ipfs://x".to_string())]),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
