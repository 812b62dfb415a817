use alloy_primitives::{keccak256, B256};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum length of a single label in bytes, per RFC 1035.
const MAX_LABEL_LEN: usize = 63;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid name '{name}'")]
    InvalidName { name: String },
    #[error("invalid name: empty label")]
    EmptyLabel,
    #[error("invalid name: label '{label}' is longer than {MAX_LABEL_LEN} bytes")]
    LabelTooLong { label: String },
}

/// Lowercases a name and checks that every label is usable.
///
/// Full UTS-46 processing is out of scope here; normalization is plain
/// Unicode lowercasing, which is enough to make hashing deterministic.
pub fn normalize(name: &str) -> Result<String, DomainError> {
    Ok(name_split(name)?.join("."))
}

/// Splits a name into normalized labels, leftmost first.
///
/// An empty name yields an empty label list rather than an error, so that
/// callers can decide whether the empty case is acceptable.
pub fn name_split(name: &str) -> Result<Vec<String>, DomainError> {
    let normal = name.to_lowercase();
    if normal.is_empty() {
        return Ok(Vec::new());
    }
    let mut labels = Vec::new();
    for label in normal.split('.') {
        if label.is_empty() {
            return Err(DomainError::EmptyLabel);
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DomainError::LabelTooLong {
                label: label.to_string(),
            });
        }
        labels.push(label.to_string());
    }
    Ok(labels)
}

/// EIP-137 hash of a single label.
pub fn labelhash(label: &str) -> B256 {
    keccak256(label.as_bytes())
}

/// EIP-137 namehash of a full dotted name.
pub fn namehash(name: &str) -> Result<B256, DomainError> {
    let labels = name_split(name)?;
    if labels.is_empty() {
        return Err(DomainError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(hash_labels(&labels))
}

fn hash_labels(labels: &[String]) -> B256 {
    let mut node = B256::ZERO;
    for label in labels.iter().rev() {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(labelhash(label).as_slice());
        node = keccak256(buf);
    }
    node
}

/// A parsed, normalized name.
///
/// Labels are stored in presentation order, so `labels()[0]` is the leftmost
/// label and the TLD is last. The namehash and the parent domain are computed
/// on first use and cached; equality and hashing consider only the labels.
#[derive(Clone)]
pub struct Domain {
    labels: Vec<String>,
    hash: OnceCell<B256>,
    parent: OnceCell<Box<Domain>>,
}

impl Domain {
    /// Parses and normalizes a dotted name.
    pub fn parse(name: &str) -> Result<Self, DomainError> {
        let labels = name_split(name)?;
        if labels.is_empty() {
            return Err(DomainError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(Self::from_labels_unchecked(labels))
    }

    fn from_labels_unchecked(labels: Vec<String>) -> Self {
        Domain {
            labels,
            hash: OnceCell::new(),
            parent: OnceCell::new(),
        }
    }

    /// Labels in presentation order, leftmost first.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The full dotted name.
    pub fn name(&self) -> String {
        self.labels.join(".")
    }

    /// The parent domain, or `None` for a TLD.
    pub fn parent(&self) -> Option<&Domain> {
        if self.labels.len() < 2 {
            return None;
        }
        let parent = self.parent.get_or_init(|| {
            Box::new(Domain::from_labels_unchecked(self.labels[1..].to_vec()))
        });
        Some(parent)
    }

    /// EIP-137 namehash of the full name, memoized.
    pub fn namehash(&self) -> B256 {
        *self.hash.get_or_init(|| hash_labels(&self.labels))
    }

    /// The rightmost label.
    pub fn tld(&self) -> &str {
        // Construction guarantees at least one label.
        self.labels.last().map(String::as_str).unwrap_or_default()
    }

    /// Labelhash of the TLD.
    pub fn tld_hash(&self) -> B256 {
        labelhash(self.tld())
    }

    /// The second-level label, if the name has one.
    pub fn sld(&self) -> Option<&str> {
        if self.labels.len() < 2 {
            return None;
        }
        Some(&self.labels[self.labels.len() - 2])
    }

    /// Labelhash of the second-level label, if the name has one.
    pub fn sld_hash(&self) -> Option<B256> {
        self.sld().map(labelhash)
    }

    pub fn is_tld(&self) -> bool {
        self.labels.len() == 1
    }

    pub fn is_sld(&self) -> bool {
        self.labels.len() == 2
    }

    pub fn is_subdomain(&self) -> bool {
        self.labels.len() > 2
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl Eq for Domain {}

impl std::hash::Hash for Domain {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.labels.hash(state);
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Domain").field(&self.name()).finish()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl std::str::FromStr for Domain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::parse(s)
    }
}

impl Serialize for Domain {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for Domain {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Domain::parse(&name).map_err(serde::de::Error::custom)
    }
}
