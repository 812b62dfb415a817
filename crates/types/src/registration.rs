use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a second-level name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Unregistered,
    Registered,
    /// Held back for a specific address, which may still claim it.
    Reserved,
    /// The registrar is not accepting registrations at all.
    Closed,
    /// The chain state could not be interpreted for this name.
    Unknown,
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegistrationStatus::Unregistered => "unregistered",
            RegistrationStatus::Registered => "registered",
            RegistrationStatus::Reserved => "reserved",
            RegistrationStatus::Closed => "closed",
            RegistrationStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// How strongly the owner controls the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    /// The registry cannot take the name back from its owner.
    Emancipated,
}

/// Which on-chain contract the ownership facts were read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSource {
    /// Dotted family/contract label, e.g. `ens.nameWrapper`.
    pub name: String,
    /// Address of the contract that holds the authoritative state.
    pub address: Address,
    /// Token or node identifier within that contract, in decimal.
    pub id: String,
}

/// Everything the chain reports about a name's registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub status: RegistrationStatus,
    pub ownership: Option<Ownership>,
    /// Current owner, or the zero address when unregistered.
    pub owner: Address,
    /// Set when `status` is [`RegistrationStatus::Reserved`].
    pub reserved_for: Option<Address>,
    /// Unix expiry timestamp, 0 when the registration does not expire.
    pub expiry: u64,
    pub source: RegistrationSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RegistrationStatus::Unregistered).unwrap(),
            "\"unregistered\""
        );
        assert_eq!(
            serde_json::to_string(&Ownership::Emancipated).unwrap(),
            "\"emancipated\""
        );
    }

    #[test]
    fn registration_roundtrip() {
        let registration = Registration {
            status: RegistrationStatus::Registered,
            ownership: Some(Ownership::Emancipated),
            owner: Address::repeat_byte(0x11),
            reserved_for: None,
            expiry: 1_700_000_000,
            source: RegistrationSource {
                name: "ens.registrar".to_string(),
                address: Address::repeat_byte(0x22),
                id: "12345".to_string(),
            },
        };
        let json = serde_json::to_string(&registration).unwrap();
        let back: Registration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, registration);
    }
}
