//! Per-call options for state-changing operations.
//!
//! Every option struct takes an optional `signer`; when absent the
//! provider's default signer is used.

use alloy_primitives::{Address, B256, U256};
use namekit_provider::ChainProvider;
use std::sync::Arc;

/// Options common to simple transactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxOptions {
    pub signer: Option<Address>,
    pub value: Option<U256>,
}

/// Options for `register`, `make_commitment` and the commit flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterOptions {
    /// Who will own the name; defaults to the signer.
    pub owner: Option<Address>,
    /// Registration duration in seconds, where the family requires one.
    pub duration: Option<U256>,
    /// Commitment salt, required when the family uses commit/reveal.
    pub secret: Option<B256>,
    /// Resolver to configure; defaults to the family's public resolver.
    pub resolver: Option<Address>,
    pub signer: Option<Address>,
    /// Payment to attach, typically a [`namekit_types::Price::buffered`] total.
    pub value: Option<U256>,
}

/// Options for `renew`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenewOptions {
    pub duration: Option<U256>,
    pub signer: Option<Address>,
    pub value: Option<U256>,
}

/// Options for `transfer`. The recipient is not optional.
#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    pub to: Address,
    /// Current holder; defaults to the signer.
    pub from: Option<Address>,
    pub signer: Option<Address>,
}

impl TransferOptions {
    pub fn to(to: Address) -> Self {
        TransferOptions {
            to,
            from: None,
            signer: None,
        }
    }
}

/// Reconfiguration of a live [`crate::NameClient`].
#[derive(Clone, Default)]
pub struct UpdateConfig {
    pub network: Option<namekit_provider::NetworkId>,
    pub provider: Option<Arc<dyn ChainProvider>>,
}
