use crate::error::CodecError;
use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// DNS resource record type.
///
/// Types without a dedicated payload shape round-trip through
/// [`RecordType::Unknown`] and carry their data as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Ns,
    Cname,
    Ptr,
    Txt,
    Aaaa,
    Dname,
    Ds,
    Dnskey,
    Tlsa,
    Unknown(u16),
}

impl RecordType {
    pub fn code(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Ns => 2,
            RecordType::Cname => 5,
            RecordType::Ptr => 12,
            RecordType::Txt => 16,
            RecordType::Aaaa => 28,
            RecordType::Dname => 39,
            RecordType::Ds => 43,
            RecordType::Dnskey => 48,
            RecordType::Tlsa => 52,
            RecordType::Unknown(code) => code,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            1 => RecordType::A,
            2 => RecordType::Ns,
            5 => RecordType::Cname,
            12 => RecordType::Ptr,
            16 => RecordType::Txt,
            28 => RecordType::Aaaa,
            39 => RecordType::Dname,
            43 => RecordType::Ds,
            48 => RecordType::Dnskey,
            52 => RecordType::Tlsa,
            other => RecordType::Unknown(other),
        }
    }
}

impl PartialOrd for RecordType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code().cmp(&other.code())
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => f.write_str("A"),
            RecordType::Ns => f.write_str("NS"),
            RecordType::Cname => f.write_str("CNAME"),
            RecordType::Ptr => f.write_str("PTR"),
            RecordType::Txt => f.write_str("TXT"),
            RecordType::Aaaa => f.write_str("AAAA"),
            RecordType::Dname => f.write_str("DNAME"),
            RecordType::Ds => f.write_str("DS"),
            RecordType::Dnskey => f.write_str("DNSKEY"),
            RecordType::Tlsa => f.write_str("TLSA"),
            RecordType::Unknown(code) => write!(f, "UNKNOWN_{code}"),
        }
    }
}

impl FromStr for RecordType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "NS" => Ok(RecordType::Ns),
            "CNAME" => Ok(RecordType::Cname),
            "PTR" => Ok(RecordType::Ptr),
            "TXT" => Ok(RecordType::Txt),
            "AAAA" => Ok(RecordType::Aaaa),
            "DNAME" => Ok(RecordType::Dname),
            "DS" => Ok(RecordType::Ds),
            "DNSKEY" => Ok(RecordType::Dnskey),
            "TLSA" => Ok(RecordType::Tlsa),
            other => match other.strip_prefix("UNKNOWN_") {
                Some(code) => code
                    .parse::<u16>()
                    .map(RecordType::from_code)
                    .map_err(|_| CodecError::UnknownType(s.to_string())),
                None => Err(CodecError::UnknownType(s.to_string())),
            },
        }
    }
}

impl Serialize for RecordType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = RecordType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a record type name or numeric code")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<RecordType, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<RecordType, E> {
                u16::try_from(v)
                    .map(RecordType::from_code)
                    .map_err(|_| E::custom("record type code out of range"))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

/// DNS record class. Everything on chain is `IN` in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordClass {
    In,
    Cs,
    Ch,
    Hs,
    Any,
    Unknown(u16),
}

impl RecordClass {
    pub fn code(self) -> u16 {
        match self {
            RecordClass::In => 1,
            RecordClass::Cs => 2,
            RecordClass::Ch => 3,
            RecordClass::Hs => 4,
            RecordClass::Any => 255,
            RecordClass::Unknown(code) => code,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            1 => RecordClass::In,
            2 => RecordClass::Cs,
            3 => RecordClass::Ch,
            4 => RecordClass::Hs,
            255 => RecordClass::Any,
            other => RecordClass::Unknown(other),
        }
    }
}

impl Default for RecordClass {
    fn default() -> Self {
        RecordClass::In
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordClass::In => f.write_str("IN"),
            RecordClass::Cs => f.write_str("CS"),
            RecordClass::Ch => f.write_str("CH"),
            RecordClass::Hs => f.write_str("HS"),
            RecordClass::Any => f.write_str("ANY"),
            RecordClass::Unknown(code) => write!(f, "UNKNOWN_{code}"),
        }
    }
}

impl FromStr for RecordClass {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Ok(RecordClass::In),
            "CS" => Ok(RecordClass::Cs),
            "CH" => Ok(RecordClass::Ch),
            "HS" => Ok(RecordClass::Hs),
            "ANY" => Ok(RecordClass::Any),
            other => match other.strip_prefix("UNKNOWN_") {
                Some(code) => code
                    .parse::<u16>()
                    .map(RecordClass::from_code)
                    .map_err(|_| CodecError::UnknownClass(s.to_string())),
                None => Err(CodecError::UnknownClass(s.to_string())),
            },
        }
    }
}

impl Serialize for RecordClass {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordClass {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = RecordClass;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a record class name or numeric code")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<RecordClass, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<RecordClass, E> {
                u16::try_from(v)
                    .map(RecordClass::from_code)
                    .map_err(|_| E::custom("record class code out of range"))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

/// TXT payload: one or several character-strings.
///
/// A single string is the common case and decodes back to `Single`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxtData {
    Single(String),
    Many(Vec<String>),
}

impl TxtData {
    pub fn strings(&self) -> Vec<&str> {
        match self {
            TxtData::Single(s) => vec![s.as_str()],
            TxtData::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for TxtData {
    fn from(s: &str) -> Self {
        TxtData::Single(s.to_string())
    }
}

/// TLSA payload. The certificate data is presented as hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsaData {
    pub usage: u8,
    pub selector: u8,
    pub matching_type: u8,
    pub certificate: String,
}

/// DS payload. The digest is presented as hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsData {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: String,
}

/// DNSKEY payload. The key is presented as base64; the wire protocol
/// octet is fixed at 3 and not part of the presentation model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnskeyData {
    pub flags: u16,
    pub algorithm: u8,
    pub key: String,
}

/// Typed payload of a resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(String),
    Dname(String),
    Ns(String),
    Ptr(String),
    Txt(TxtData),
    Tlsa(TlsaData),
    Ds(DsData),
    Dnskey(DnskeyData),
    /// Raw rdata for types this codec has no shape for.
    Unknown(Bytes),
}

/// A presentation-level resource record.
///
/// `data` of `None` marks the whole record set for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub rtype: RecordType,
    pub class: RecordClass,
    pub ttl: u32,
    pub data: Option<RecordData>,
}

impl Record {
    pub fn new(name: impl Into<String>, rtype: RecordType, ttl: u32, data: RecordData) -> Self {
        Record {
            name: name.into(),
            rtype,
            class: RecordClass::In,
            ttl,
            data: Some(data),
        }
    }

    /// A delete marker for the record set identified by name and type.
    pub fn delete(name: impl Into<String>, rtype: RecordType) -> Self {
        Record {
            name: name.into(),
            rtype,
            class: RecordClass::In,
            ttl: 0,
            data: None,
        }
    }
}

/// Serde view of a record, with the payload shape keyed off the type.
#[derive(Serialize, Deserialize)]
struct RecordRepr {
    name: String,
    #[serde(rename = "type")]
    rtype: RecordType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    class: Option<RecordClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<DataRepr>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DataRepr {
    Tlsa {
        usage: u8,
        selector: u8,
        #[serde(rename = "matchingType")]
        matching_type: u8,
        certificate: String,
    },
    Ds {
        #[serde(rename = "keyTag")]
        key_tag: u16,
        algorithm: u8,
        #[serde(rename = "digestType")]
        digest_type: u8,
        digest: String,
    },
    Dnskey {
        flags: u16,
        algorithm: u8,
        key: String,
    },
    Text(String),
    List(Vec<String>),
}

impl Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = match &self.data {
            None => None,
            Some(RecordData::A(ip)) => Some(DataRepr::Text(ip.to_string())),
            Some(RecordData::Aaaa(ip)) => Some(DataRepr::Text(ip.to_string())),
            Some(RecordData::Cname(t))
            | Some(RecordData::Dname(t))
            | Some(RecordData::Ns(t))
            | Some(RecordData::Ptr(t)) => Some(DataRepr::Text(t.clone())),
            Some(RecordData::Txt(TxtData::Single(s))) => Some(DataRepr::Text(s.clone())),
            Some(RecordData::Txt(TxtData::Many(v))) => Some(DataRepr::List(v.clone())),
            Some(RecordData::Tlsa(t)) => Some(DataRepr::Tlsa {
                usage: t.usage,
                selector: t.selector,
                matching_type: t.matching_type,
                certificate: t.certificate.clone(),
            }),
            Some(RecordData::Ds(d)) => Some(DataRepr::Ds {
                key_tag: d.key_tag,
                algorithm: d.algorithm,
                digest_type: d.digest_type,
                digest: d.digest.clone(),
            }),
            Some(RecordData::Dnskey(k)) => Some(DataRepr::Dnskey {
                flags: k.flags,
                algorithm: k.algorithm,
                key: k.key.clone(),
            }),
            Some(RecordData::Unknown(bytes)) => Some(DataRepr::Text(bytes.to_string())),
        };
        RecordRepr {
            name: self.name.clone(),
            rtype: self.rtype,
            class: Some(self.class),
            ttl: Some(self.ttl),
            data,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let repr = RecordRepr::deserialize(deserializer)?;
        let data = match (repr.rtype, repr.data) {
            (_, None) => None,
            (RecordType::A, Some(DataRepr::Text(s))) => Some(RecordData::A(
                s.parse().map_err(|_| D::Error::custom("invalid A address"))?,
            )),
            (RecordType::Aaaa, Some(DataRepr::Text(s))) => Some(RecordData::Aaaa(
                s.parse()
                    .map_err(|_| D::Error::custom("invalid AAAA address"))?,
            )),
            (RecordType::Cname, Some(DataRepr::Text(s))) => Some(RecordData::Cname(s)),
            (RecordType::Dname, Some(DataRepr::Text(s))) => Some(RecordData::Dname(s)),
            (RecordType::Ns, Some(DataRepr::Text(s))) => Some(RecordData::Ns(s)),
            (RecordType::Ptr, Some(DataRepr::Text(s))) => Some(RecordData::Ptr(s)),
            (RecordType::Txt, Some(DataRepr::Text(s))) => {
                Some(RecordData::Txt(TxtData::Single(s)))
            }
            (RecordType::Txt, Some(DataRepr::List(v))) => Some(RecordData::Txt(TxtData::Many(v))),
            (
                RecordType::Tlsa,
                Some(DataRepr::Tlsa {
                    usage,
                    selector,
                    matching_type,
                    certificate,
                }),
            ) => Some(RecordData::Tlsa(TlsaData {
                usage,
                selector,
                matching_type,
                certificate,
            })),
            (
                RecordType::Ds,
                Some(DataRepr::Ds {
                    key_tag,
                    algorithm,
                    digest_type,
                    digest,
                }),
            ) => Some(RecordData::Ds(DsData {
                key_tag,
                algorithm,
                digest_type,
                digest,
            })),
            (
                RecordType::Dnskey,
                Some(DataRepr::Dnskey {
                    flags,
                    algorithm,
                    key,
                }),
            ) => Some(RecordData::Dnskey(DnskeyData {
                flags,
                algorithm,
                key,
            })),
            (RecordType::Unknown(_), Some(DataRepr::Text(s))) => {
                let hex_str = s.strip_prefix("0x").unwrap_or(&s);
                let bytes = hex::decode(hex_str)
                    .map_err(|_| D::Error::custom("invalid raw record data hex"))?;
                Some(RecordData::Unknown(bytes.into()))
            }
            (rtype, Some(_)) => {
                return Err(D::Error::custom(format!(
                    "data shape does not match record type {rtype}"
                )))
            }
        };
        Ok(Record {
            name: repr.name,
            rtype: repr.rtype,
            class: repr.class.unwrap_or_default(),
            ttl: repr.ttl.unwrap_or(0),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes_roundtrip() {
        for code in [1u16, 2, 5, 12, 16, 28, 39, 43, 48, 52, 999] {
            assert_eq!(RecordType::from_code(code).code(), code);
        }
        assert_eq!(RecordType::from_code(1), RecordType::A);
        assert_eq!(RecordType::from_code(999), RecordType::Unknown(999));
    }

    #[test]
    fn type_names() {
        assert_eq!("txt".parse::<RecordType>().unwrap(), RecordType::Txt);
        assert_eq!("UNKNOWN_7".parse::<RecordType>().unwrap(), RecordType::Unknown(7));
        assert_eq!(RecordType::Unknown(7).to_string(), "UNKNOWN_7");
        assert!(matches!(
            "BOGUS".parse::<RecordType>(),
            Err(CodecError::UnknownType(_))
        ));
    }

    #[test]
    fn types_order_by_code() {
        let mut types = vec![RecordType::Aaaa, RecordType::Cname, RecordType::A];
        types.sort();
        assert_eq!(types, vec![RecordType::A, RecordType::Cname, RecordType::Aaaa]);
    }

    #[test]
    fn record_json_roundtrip() {
        let record = Record::new(
            "a.example.eth",
            RecordType::Txt,
            300,
            RecordData::Txt(TxtData::Single("hello".to_string())),
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn record_json_accepts_sparse_input() {
        let record: Record =
            serde_json::from_str(r#"{"name":"example.eth","type":"A","data":"1.2.3.4"}"#).unwrap();
        assert_eq!(record.class, RecordClass::In);
        assert_eq!(record.ttl, 0);
        assert_eq!(record.data, Some(RecordData::A("1.2.3.4".parse().unwrap())));
    }

    #[test]
    fn record_json_numeric_type() {
        let record: Record = serde_json::from_str(r#"{"name":"example.eth","type":16,"data":["a","b"]}"#).unwrap();
        assert_eq!(record.rtype, RecordType::Txt);
        assert_eq!(
            record.data,
            Some(RecordData::Txt(TxtData::Many(vec![
                "a".to_string(),
                "b".to_string()
            ])))
        );
    }

    #[test]
    fn delete_marker_json_has_no_data() {
        let marker = Record::delete("example.eth", RecordType::Txt);
        let json = serde_json::to_value(&marker).unwrap();
        assert!(json.get("data").is_none());
        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, marker);
    }

    #[test]
    fn tlsa_json_shape() {
        let json = r#"{
            "name": "_443._tcp.example.eth",
            "type": "TLSA",
            "ttl": 3600,
            "data": {"usage": 3, "selector": 1, "matchingType": 1, "certificate": "AABB"}
        }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(
            record.data,
            Some(RecordData::Tlsa(TlsaData {
                usage: 3,
                selector: 1,
                matching_type: 1,
                certificate: "AABB".to_string(),
            }))
        );
    }

    #[test]
    fn mismatched_data_shape_is_rejected() {
        let result: Result<Record, _> =
            serde_json::from_str(r#"{"name":"x.eth","type":"A","data":["1.2.3.4"]}"#);
        assert!(result.is_err());
    }
}
