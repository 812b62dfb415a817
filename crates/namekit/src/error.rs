use alloy_primitives::Address;
use namekit_dnscodec::CodecError;
use namekit_provider::ProviderError;
use namekit_types::{DomainError, RecordError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NameError>;

#[derive(Debug, Error)]
pub enum NameError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("abi decoding failed: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("missing required option '{0}'")]
    MissingOption(&'static str),
    #[error("record update contains nothing to set")]
    NothingToSet,
    #[error("coin type '{coin}' only accepts raw address bytes")]
    UnsupportedCoin { coin: String },

    #[error("{operation} is not supported for '{name}'")]
    UnsupportedNode {
        operation: &'static str,
        name: String,
    },
    #[error("{operation} is not supported for source '{source_name}'")]
    UnsupportedSource {
        operation: &'static str,
        source_name: String,
    },
    #[error("controller {controller} does not support '.{tld}'")]
    UnsupportedController { controller: Address, tld: String },
    #[error("failed to read {method} from controller {controller}")]
    ControllerRead {
        method: &'static str,
        controller: Address,
    },
    #[error("failed to read {what}: {source}")]
    Read {
        what: &'static str,
        source: ProviderError,
    },

    #[error("'{name}' is already taken")]
    AlreadyTaken { name: String },
    #[error("registrations are closed for '.{tld}' names")]
    RegistrationsClosed { tld: String },
    #[error("'{name}' is reserved for {reserved_for}, not {signer}")]
    ReservedForOther {
        name: String,
        reserved_for: Address,
        signer: Address,
    },
    #[error("'{name}' is not registered")]
    NotRegistered { name: String },
    #[error("'.{tld}' names do not renew")]
    NotRenewable { tld: String },
    #[error("no commitment is required, register directly")]
    CommitmentNotRequired,
    #[error("signer {signer} is neither owner nor manager")]
    NotAuthorized { signer: Address },
    #[error("no resolver set for '{name}'")]
    NoResolver { name: String },
}
