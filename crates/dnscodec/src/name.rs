//! Uncompressed DNS wire-format names.

use crate::error::{CodecError, Result};

const MAX_LABEL_LEN: usize = 63;

/// Appends a name as length-prefixed labels plus a zero terminator.
///
/// A trailing dot is tolerated; an empty name or `"."` encodes as the root.
pub fn encode_name(name: &str, out: &mut Vec<u8>) -> Result<()> {
    let trimmed = name.trim_end_matches('.');
    if !trimmed.is_empty() {
        for label in trimmed.split('.') {
            if label.is_empty() {
                return Err(CodecError::EmptyLabel);
            }
            let bytes = label.as_bytes();
            if bytes.len() > MAX_LABEL_LEN {
                return Err(CodecError::LabelTooLong {
                    label: label.to_string(),
                });
            }
            out.push(bytes.len() as u8);
            out.extend_from_slice(bytes);
        }
    }
    out.push(0);
    Ok(())
}

/// Encodes a name into a fresh buffer.
pub fn encoded_name(name: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(name.len() + 2);
    encode_name(name, &mut out)?;
    Ok(out)
}

/// Decodes a name starting at `start`, returning the name and the number
/// of bytes consumed.
///
/// Compression pointers are rejected; record sets are stored standalone
/// and have no message to point back into. The root decodes as `"."`.
pub fn decode_name(buf: &[u8], start: usize) -> Result<(String, usize)> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = start;
    loop {
        let len = *buf
            .get(pos)
            .ok_or(CodecError::Truncated { offset: pos })? as usize;
        if len == 0 {
            pos += 1;
            break;
        }
        if len & 0xC0 != 0 {
            return Err(CodecError::CompressedName);
        }
        let label = buf
            .get(pos + 1..pos + 1 + len)
            .ok_or(CodecError::Truncated { offset: pos })?;
        labels.push(String::from_utf8_lossy(label).into_owned());
        pos += 1 + len;
    }
    let name = if labels.is_empty() {
        ".".to_string()
    } else {
        labels.join(".")
    };
    Ok((name, pos - start))
}
