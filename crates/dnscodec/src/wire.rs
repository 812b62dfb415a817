//! Encoding and decoding of flat resource-record runs.

use crate::error::{CodecError, Result};
use crate::name::{decode_name, encoded_name};
use crate::record::{
    DnskeyData, DsData, Record, RecordClass, RecordData, RecordType, TlsaData, TxtData,
};
use alloy_primitives::{keccak256, Bytes, B256};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::warn;

/// Wire value of the DNSKEY protocol octet, fixed by RFC 4034.
const DNSKEY_PROTOCOL: u8 = 3;

/// mDNS cache-flush bit carried in the class field.
const CLASS_FLUSH_BIT: u16 = 0x8000;

/// Identifier of an on-chain record set: keccak of the wire-encoded name
/// plus the numeric type code.
pub fn rrset_id(name: &str, rtype: RecordType) -> Result<(B256, u16)> {
    Ok((keccak256(encoded_name(name)?), rtype.code()))
}

/// Encodes records into one canonical wire buffer.
///
/// Records are ordered by name, then by numeric type code. When a record
/// set appears both with data and as a delete marker, the marker is
/// dropped so the update cannot delete what it also writes. Duplicate
/// data records for one set are kept as given.
pub fn encode_rrsets(records: &[Record]) -> Result<Vec<u8>> {
    let mut records = records.to_vec();
    records.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.rtype.code().cmp(&b.rtype.code()))
    });
    drop_shadowed_deletes(&mut records);

    let mut staged = Vec::with_capacity(records.len());
    let mut total = 0usize;
    for record in &records {
        let name = encoded_name(&record.name)?;
        let rdata = match &record.data {
            Some(data) => {
                if !shape_matches(record.rtype, data) {
                    return Err(CodecError::MalformedRdata {
                        rtype: record.rtype,
                    });
                }
                let rdata = pack_rdata(data)?;
                if rdata.len() > u16::MAX as usize {
                    return Err(CodecError::RdataTooLong { len: rdata.len() });
                }
                Some(rdata)
            }
            None => None,
        };
        total += name.len() + 10 + rdata.as_ref().map_or(0, Vec::len);
        staged.push((record, name, rdata));
    }

    let mut out = Vec::with_capacity(total);
    for (record, name, rdata) in staged {
        out.extend_from_slice(&name);
        out.extend_from_slice(&record.rtype.code().to_be_bytes());
        match rdata {
            Some(rdata) => {
                out.extend_from_slice(&record.class.code().to_be_bytes());
                out.extend_from_slice(&record.ttl.to_be_bytes());
                out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
                out.extend_from_slice(&rdata);
            }
            None => {
                // Delete marker: bare header, nothing to carry.
                out.extend_from_slice(&RecordClass::In.code().to_be_bytes());
                out.extend_from_slice(&0u32.to_be_bytes());
                out.extend_from_slice(&0u16.to_be_bytes());
            }
        }
    }
    Ok(out)
}

/// Removes delete markers that sit next to a data record for the same
/// record set. Input must already be sorted by (name, type).
fn drop_shadowed_deletes(records: &mut Vec<Record>) {
    let mut i = 0;
    while i + 1 < records.len() {
        let same_set = records[i].name == records[i + 1].name
            && records[i].rtype.code() == records[i + 1].rtype.code();
        if !same_set {
            i += 1;
            continue;
        }
        match (records[i].data.is_some(), records[i + 1].data.is_some()) {
            (false, true) => {
                records.remove(i);
                // The survivor may now adjoin an earlier marker.
                i = i.saturating_sub(1);
            }
            (true, false) => {
                records.remove(i + 1);
            }
            (true, true) => {
                warn!(
                    name = %records[i].name,
                    rtype = %records[i].rtype,
                    "duplicate data records for one record set kept in update"
                );
                i += 1;
            }
            (false, false) => {
                i += 1;
            }
        }
    }
}

fn shape_matches(rtype: RecordType, data: &RecordData) -> bool {
    matches!(
        (rtype, data),
        (RecordType::A, RecordData::A(_))
            | (RecordType::Aaaa, RecordData::Aaaa(_))
            | (RecordType::Cname, RecordData::Cname(_))
            | (RecordType::Dname, RecordData::Dname(_))
            | (RecordType::Ns, RecordData::Ns(_))
            | (RecordType::Ptr, RecordData::Ptr(_))
            | (RecordType::Txt, RecordData::Txt(_))
            | (RecordType::Tlsa, RecordData::Tlsa(_))
            | (RecordType::Ds, RecordData::Ds(_))
            | (RecordType::Dnskey, RecordData::Dnskey(_))
            | (RecordType::Unknown(_), RecordData::Unknown(_))
    )
}

fn pack_rdata(data: &RecordData) -> Result<Vec<u8>> {
    match data {
        RecordData::A(ip) => Ok(ip.octets().to_vec()),
        RecordData::Aaaa(ip) => Ok(ip.octets().to_vec()),
        RecordData::Cname(target)
        | RecordData::Dname(target)
        | RecordData::Ns(target)
        | RecordData::Ptr(target) => encoded_name(target),
        RecordData::Txt(txt) => {
            let mut out = Vec::new();
            for s in txt.strings() {
                let bytes = s.as_bytes();
                if bytes.len() > 255 {
                    return Err(CodecError::TxtStringTooLong);
                }
                out.push(bytes.len() as u8);
                out.extend_from_slice(bytes);
            }
            Ok(out)
        }
        RecordData::Tlsa(tlsa) => {
            let mut out = vec![tlsa.usage, tlsa.selector, tlsa.matching_type];
            out.extend(hex_field(&tlsa.certificate, "tlsa certificate")?);
            Ok(out)
        }
        RecordData::Ds(ds) => {
            let mut out = Vec::new();
            out.extend_from_slice(&ds.key_tag.to_be_bytes());
            out.push(ds.algorithm);
            out.push(ds.digest_type);
            out.extend(hex_field(&ds.digest, "ds digest")?);
            Ok(out)
        }
        RecordData::Dnskey(key) => {
            let mut out = Vec::new();
            out.extend_from_slice(&key.flags.to_be_bytes());
            out.push(DNSKEY_PROTOCOL);
            out.push(key.algorithm);
            out.extend(base64_field(&key.key)?);
            Ok(out)
        }
        RecordData::Unknown(bytes) => Ok(bytes.to_vec()),
    }
}

/// Decodes whitespace-tolerant hex, with or without a `0x` prefix.
fn hex_field(value: &str, field: &'static str) -> Result<Vec<u8>> {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned = cleaned.strip_prefix("0x").unwrap_or(&cleaned);
    hex::decode(cleaned).map_err(|source| CodecError::InvalidHex { field, source })
}

fn base64_field(value: &str) -> Result<Vec<u8>> {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64
        .decode(cleaned)
        .map_err(|source| CodecError::InvalidBase64 { source })
}

/// Decodes a `0x`-prefixed hex record run as read from a resolver.
pub fn decode_rrsets_hex(wire: &str) -> Result<Vec<Record>> {
    let stripped = wire.strip_prefix("0x").unwrap_or(wire);
    if stripped.is_empty() {
        return Ok(Vec::new());
    }
    let bytes = hex::decode(stripped).map_err(|source| CodecError::InvalidHex {
        field: "record set",
        source,
    })?;
    decode_rrsets(&bytes)
}

/// Decodes a flat run of wire-format records.
pub fn decode_rrsets(wire: &[u8]) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut offset = 0;
    while offset < wire.len() {
        let (record, consumed) = decode_record(wire, offset)?;
        records.push(record);
        offset += consumed;
    }
    Ok(records)
}

fn decode_record(wire: &[u8], offset: usize) -> Result<(Record, usize)> {
    let (name, name_len) = decode_name(wire, offset)?;
    let header = offset + name_len;
    let type_code = be_u16(wire, header).ok_or(CodecError::Truncated { offset: header })?;
    let class_code = be_u16(wire, header + 2).ok_or(CodecError::Truncated { offset: header })?;
    let ttl = be_u32(wire, header + 4).ok_or(CodecError::Truncated { offset: header })?;
    let rdlength =
        be_u16(wire, header + 8).ok_or(CodecError::Truncated { offset: header })? as usize;

    let rtype = RecordType::from_code(type_code);
    let class = RecordClass::from_code(class_code & !CLASS_FLUSH_BIT);
    let rdata_start = header + 10;
    let rdata = wire
        .get(rdata_start..rdata_start + rdlength)
        .ok_or(CodecError::Truncated { offset: rdata_start })?;
    let data = if rdlength == 0 {
        None
    } else {
        Some(parse_rdata(rtype, rdata)?)
    };

    Ok((
        Record {
            name,
            rtype,
            class,
            ttl,
            data,
        },
        name_len + 10 + rdlength,
    ))
}

fn parse_rdata(rtype: RecordType, rdata: &[u8]) -> Result<RecordData> {
    match rtype {
        RecordType::A => {
            let octets: [u8; 4] = rdata
                .try_into()
                .map_err(|_| CodecError::MalformedRdata { rtype })?;
            Ok(RecordData::A(octets.into()))
        }
        RecordType::Aaaa => {
            let octets: [u8; 16] = rdata
                .try_into()
                .map_err(|_| CodecError::MalformedRdata { rtype })?;
            Ok(RecordData::Aaaa(octets.into()))
        }
        RecordType::Cname | RecordType::Dname | RecordType::Ns | RecordType::Ptr => {
            let (target, consumed) = decode_name(rdata, 0)?;
            if consumed != rdata.len() {
                return Err(CodecError::MalformedRdata { rtype });
            }
            Ok(match rtype {
                RecordType::Cname => RecordData::Cname(target),
                RecordType::Dname => RecordData::Dname(target),
                RecordType::Ns => RecordData::Ns(target),
                _ => RecordData::Ptr(target),
            })
        }
        RecordType::Txt => {
            let mut strings = Vec::new();
            let mut pos = 0;
            while pos < rdata.len() {
                let len = rdata[pos] as usize;
                let bytes = rdata
                    .get(pos + 1..pos + 1 + len)
                    .ok_or(CodecError::MalformedRdata { rtype })?;
                strings.push(String::from_utf8_lossy(bytes).into_owned());
                pos += 1 + len;
            }
            Ok(RecordData::Txt(if strings.len() == 1 {
                TxtData::Single(strings.remove(0))
            } else {
                TxtData::Many(strings)
            }))
        }
        RecordType::Tlsa => {
            if rdata.len() < 3 {
                return Err(CodecError::MalformedRdata { rtype });
            }
            Ok(RecordData::Tlsa(TlsaData {
                usage: rdata[0],
                selector: rdata[1],
                matching_type: rdata[2],
                certificate: hex::encode_upper(&rdata[3..]),
            }))
        }
        RecordType::Ds => {
            if rdata.len() < 4 {
                return Err(CodecError::MalformedRdata { rtype });
            }
            Ok(RecordData::Ds(DsData {
                key_tag: u16::from_be_bytes([rdata[0], rdata[1]]),
                algorithm: rdata[2],
                digest_type: rdata[3],
                digest: hex::encode_upper(&rdata[4..]),
            }))
        }
        RecordType::Dnskey => {
            if rdata.len() < 4 || rdata[2] != DNSKEY_PROTOCOL {
                return Err(CodecError::MalformedRdata { rtype });
            }
            Ok(RecordData::Dnskey(DnskeyData {
                flags: u16::from_be_bytes([rdata[0], rdata[1]]),
                algorithm: rdata[3],
                key: BASE64.encode(&rdata[4..]),
            }))
        }
        RecordType::Unknown(_) => Ok(RecordData::Unknown(Bytes::copy_from_slice(rdata))),
    }
}

fn be_u16(buf: &[u8], at: usize) -> Option<u16> {
    let bytes: [u8; 2] = buf.get(at..at + 2)?.try_into().ok()?;
    Some(u16::from_be_bytes(bytes))
}

fn be_u32(buf: &[u8], at: usize) -> Option<u32> {
    let bytes: [u8; 4] = buf.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a_record(name: &str, ttl: u32, ip: &str) -> Record {
        Record::new(name, RecordType::A, ttl, RecordData::A(ip.parse().unwrap()))
    }

    fn txt_record(name: &str, value: &str) -> Record {
        Record::new(
            name,
            RecordType::Txt,
            300,
            RecordData::Txt(TxtData::Single(value.to_string())),
        )
    }

    #[test]
    fn a_record_wire_layout() {
        let wire = encode_rrsets(&[a_record("example.eth", 3600, "1.2.3.4")]).unwrap();
        assert_eq!(
            wire,
            hex::decode("076578616d706c6503657468000001000100000e10000401020304").unwrap()
        );
    }

    #[test]
    fn delete_marker_wire_layout() {
        let wire = encode_rrsets(&[Record::delete("example.eth", RecordType::Txt)]).unwrap();
        assert_eq!(
            wire,
            hex::decode("076578616d706c65036574680000100001000000000000").unwrap()
        );
        let records = decode_rrsets(&wire).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rtype, RecordType::Txt);
        assert_eq!(records[0].data, None);
    }

    #[test]
    fn sorts_by_name_then_type_code() {
        let wire = encode_rrsets(&[
            txt_record("b.eth", "later"),
            Record::new(
                "a.eth",
                RecordType::Aaaa,
                60,
                RecordData::Aaaa("::1".parse().unwrap()),
            ),
            a_record("a.eth", 60, "1.2.3.4"),
        ])
        .unwrap();
        let records = decode_rrsets(&wire).unwrap();
        let keys: Vec<(String, u16)> = records
            .iter()
            .map(|r| (r.name.clone(), r.rtype.code()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("a.eth".to_string(), 1),
                ("a.eth".to_string(), 28),
                ("b.eth".to_string(), 16)
            ]
        );
    }

    #[test]
    fn marker_beside_data_is_dropped_either_way() {
        for records in [
            vec![
                Record::delete("a.eth", RecordType::A),
                a_record("a.eth", 60, "1.2.3.4"),
            ],
            vec![
                a_record("a.eth", 60, "1.2.3.4"),
                Record::delete("a.eth", RecordType::A),
            ],
        ] {
            let decoded = decode_rrsets(&encode_rrsets(&records).unwrap()).unwrap();
            assert_eq!(decoded.len(), 1);
            assert!(decoded[0].data.is_some());
        }
    }

    #[test]
    fn repeated_markers_all_yield_to_data() {
        let decoded = decode_rrsets(
            &encode_rrsets(&[
                Record::delete("a.eth", RecordType::A),
                Record::delete("a.eth", RecordType::A),
                a_record("a.eth", 60, "1.2.3.4"),
            ])
            .unwrap(),
        )
        .unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(decoded[0].data.is_some());
    }

    #[test]
    fn marker_for_other_type_survives() {
        let decoded = decode_rrsets(
            &encode_rrsets(&[
                Record::delete("a.eth", RecordType::Txt),
                a_record("a.eth", 60, "1.2.3.4"),
            ])
            .unwrap(),
        )
        .unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].data.is_some());
        assert_eq!(decoded[1].rtype, RecordType::Txt);
        assert!(decoded[1].data.is_none());
    }

    #[test]
    fn duplicate_data_records_are_kept() {
        let decoded = decode_rrsets(
            &encode_rrsets(&[
                a_record("a.eth", 60, "1.2.3.4"),
                a_record("a.eth", 120, "5.6.7.8"),
            ])
            .unwrap(),
        )
        .unwrap();
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn txt_single_and_many() {
        let single = decode_rrsets(&encode_rrsets(&[txt_record("a.eth", "hello")]).unwrap())
            .unwrap();
        assert_eq!(
            single[0].data,
            Some(RecordData::Txt(TxtData::Single("hello".to_string())))
        );

        let many = decode_rrsets(
            &encode_rrsets(&[Record::new(
                "a.eth",
                RecordType::Txt,
                300,
                RecordData::Txt(TxtData::Many(vec!["a".to_string(), "b".to_string()])),
            )])
            .unwrap(),
        )
        .unwrap();
        assert_eq!(
            many[0].data,
            Some(RecordData::Txt(TxtData::Many(vec![
                "a".to_string(),
                "b".to_string()
            ])))
        );
    }

    #[test]
    fn name_targets_roundtrip() {
        let decoded = decode_rrsets(
            &encode_rrsets(&[Record::new(
                "www.a.eth",
                RecordType::Cname,
                300,
                RecordData::Cname("a.eth".to_string()),
            )])
            .unwrap(),
        )
        .unwrap();
        assert_eq!(decoded[0].data, Some(RecordData::Cname("a.eth".to_string())));
    }

    #[test]
    fn tlsa_hex_is_normalized() {
        let decoded = decode_rrsets(
            &encode_rrsets(&[Record::new(
                "_443._tcp.a.eth",
                RecordType::Tlsa,
                3600,
                RecordData::Tlsa(TlsaData {
                    usage: 3,
                    selector: 1,
                    matching_type: 1,
                    certificate: "aa bb\ncc".to_string(),
                }),
            )])
            .unwrap(),
        )
        .unwrap();
        assert_eq!(
            decoded[0].data,
            Some(RecordData::Tlsa(TlsaData {
                usage: 3,
                selector: 1,
                matching_type: 1,
                certificate: "AABBCC".to_string(),
            }))
        );
    }

    #[test]
    fn ds_digest_decodes_uppercase() {
        let decoded = decode_rrsets(
            &encode_rrsets(&[Record::new(
                "a.eth",
                RecordType::Ds,
                3600,
                RecordData::Ds(DsData {
                    key_tag: 12345,
                    algorithm: 8,
                    digest_type: 2,
                    digest: "abcdef".to_string(),
                }),
            )])
            .unwrap(),
        )
        .unwrap();
        assert_eq!(
            decoded[0].data,
            Some(RecordData::Ds(DsData {
                key_tag: 12345,
                algorithm: 8,
                digest_type: 2,
                digest: "ABCDEF".to_string(),
            }))
        );
    }

    #[test]
    fn dnskey_key_roundtrips_as_base64() {
        let record = Record::new(
            "a.eth",
            RecordType::Dnskey,
            3600,
            RecordData::Dnskey(DnskeyData {
                flags: 257,
                algorithm: 8,
                key: BASE64.encode([1u8, 2, 3, 4]),
            }),
        );
        let wire = encode_rrsets(&[record.clone()]).unwrap();
        // flags(2) + protocol(1) + algorithm(1) + key(4)
        let decoded = decode_rrsets(&wire).unwrap();
        assert_eq!(decoded[0].data, record.data);
    }

    #[test]
    fn dnskey_protocol_is_validated() {
        let mut wire = encode_rrsets(&[Record::new(
            "a.eth",
            RecordType::Dnskey,
            3600,
            RecordData::Dnskey(DnskeyData {
                flags: 257,
                algorithm: 8,
                key: BASE64.encode([1u8, 2, 3, 4]),
            }),
        )])
        .unwrap();
        // name(7) + header(10) puts the protocol octet at rdata + 2.
        let protocol_at = wire.len() - 6;
        wire[protocol_at] = 4;
        assert!(matches!(
            decode_rrsets(&wire),
            Err(CodecError::MalformedRdata {
                rtype: RecordType::Dnskey
            })
        ));
    }

    #[test]
    fn unknown_types_pass_through_raw() {
        let record = Record::new(
            "a.eth",
            RecordType::Unknown(999),
            60,
            RecordData::Unknown(Bytes::from(vec![0xDE, 0xAD, 0xBE, 0xEF])),
        );
        let decoded = decode_rrsets(&encode_rrsets(&[record.clone()]).unwrap()).unwrap();
        assert_eq!(decoded[0], record);
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        let record = Record {
            name: "a.eth".to_string(),
            rtype: RecordType::A,
            class: RecordClass::In,
            ttl: 60,
            data: Some(RecordData::Txt(TxtData::Single("nope".to_string()))),
        };
        assert!(matches!(
            encode_rrsets(&[record]),
            Err(CodecError::MalformedRdata {
                rtype: RecordType::A
            })
        ));
    }

    #[test]
    fn flush_bit_is_masked_off_class() {
        let mut wire = encode_rrsets(&[a_record("a.eth", 60, "1.2.3.4")]).unwrap();
        // class hi byte sits right after name(7) + type(2).
        wire[9] |= 0x80;
        let decoded = decode_rrsets(&wire).unwrap();
        assert_eq!(decoded[0].class, RecordClass::In);
    }

    #[test]
    fn truncated_input_errors() {
        let wire = encode_rrsets(&[a_record("a.eth", 60, "1.2.3.4")]).unwrap();
        assert!(matches!(
            decode_rrsets(&wire[..wire.len() - 1]),
            Err(CodecError::Truncated { .. })
        ));
        assert!(matches!(
            decode_rrsets(&wire[..10]),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(encode_rrsets(&[]).unwrap(), Vec::<u8>::new());
        assert!(decode_rrsets(&[]).unwrap().is_empty());
        assert!(decode_rrsets_hex("0x").unwrap().is_empty());
    }

    #[test]
    fn hex_wrapper_decodes() {
        let wire = encode_rrsets(&[a_record("a.eth", 60, "1.2.3.4")]).unwrap();
        let records = decode_rrsets_hex(&format!("0x{}", hex::encode(&wire))).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn oversized_rdata_is_rejected() {
        let record = Record::new(
            "a.eth",
            RecordType::Txt,
            60,
            RecordData::Txt(TxtData::Many(vec!["x".repeat(255); 300])),
        );
        assert!(matches!(
            encode_rrsets(&[record]),
            Err(CodecError::RdataTooLong { .. })
        ));
    }

    #[test]
    fn rrset_id_hashes_wire_name() {
        let (hash, code) = rrset_id("example.eth", RecordType::Txt).unwrap();
        assert_eq!(hash, keccak256(encoded_name("example.eth").unwrap()));
        assert_eq!(code, 16);
    }

    #[test]
    fn multi_record_roundtrip() {
        let records = vec![
            a_record("a.eth", 60, "1.2.3.4"),
            Record::new(
                "a.eth",
                RecordType::Aaaa,
                60,
                RecordData::Aaaa("2001:db8::1".parse().unwrap()),
            ),
            txt_record("b.a.eth", "v=spf1 -all"),
            Record::new(
                "c.a.eth",
                RecordType::Ns,
                86400,
                RecordData::Ns("ns1.a.eth".to_string()),
            ),
        ];
        let decoded = decode_rrsets(&encode_rrsets(&records).unwrap()).unwrap();
        assert_eq!(decoded, records);
    }
}
