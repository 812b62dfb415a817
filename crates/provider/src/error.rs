use crate::chain::NetworkId;
use crate::deployments::ContractRole;
use alloy_primitives::{Address, Bytes};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors from chain access.
///
/// Clonable so that one failed aggregate call can reject every read that
/// was batched into it.
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("contract {role} is not deployed on network {network}")]
    MissingContract {
        role: ContractRole,
        network: NetworkId,
    },
    #[error("call to {to} reverted")]
    CallFailed {
        to: Address,
        data: Bytes,
        revert: Bytes,
    },
    #[error("aggregate call inconsistent: {message}")]
    Inconsistent { message: String },
    #[error("transport error: {message}")]
    Transport { message: String },
    #[error("no default signer configured")]
    NoSigner,
}
