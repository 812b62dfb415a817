use crate::record::RecordType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid name: empty label")]
    EmptyLabel,
    #[error("invalid name: label '{label}' is longer than 63 bytes")]
    LabelTooLong { label: String },
    #[error("record data truncated at offset {offset}")]
    Truncated { offset: usize },
    #[error("compressed names are not supported")]
    CompressedName,
    #[error("invalid {field} hex: {source}")]
    InvalidHex {
        field: &'static str,
        source: hex::FromHexError,
    },
    #[error("invalid dnskey key base64: {source}")]
    InvalidBase64 { source: base64::DecodeError },
    #[error("malformed {rtype} record data")]
    MalformedRdata { rtype: RecordType },
    #[error("record data is {len} bytes, longer than 65535")]
    RdataTooLong { len: usize },
    #[error("txt string is longer than 255 bytes")]
    TxtStringTooLong,
    #[error("unknown record type '{0}'")]
    UnknownType(String),
    #[error("unknown record class '{0}'")]
    UnknownClass(String),
}
