//! Registry family handlers.
//!
//! Every top-level domain belongs to one registry family, and each
//! family implements the same capability surface behind
//! [`RegistryFamily`]. The facade picks a handler by TLD and never
//! looks past this trait.

use crate::error::{NameError, Result};
use crate::options::{RegisterOptions, RenewOptions, TransferOptions, TxOptions};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use namekit_provider::{ChainProvider, NetworkId, PendingTransaction};
use namekit_types::{Domain, Price, RecordQuery, RecordUpdate, RecordValues, Registration};
use std::sync::Arc;

mod ens;
mod forever;
mod standard;

pub(crate) use ens::EnsHandler;
pub(crate) use forever::ForeverHandler;
pub(crate) use standard::StandardHandler;

/// Everything a handler needs to resolve its deployment.
#[derive(Clone)]
pub(crate) struct HandlerConfig {
    pub network: NetworkId,
    pub provider: Arc<dyn ChainProvider>,
}

/// The capability surface shared by all registry families.
#[async_trait]
pub(crate) trait RegistryFamily: Send + Sync {
    /// Swaps in a new network or provider.
    fn update(&self, config: HandlerConfig) -> Result<()>;

    async fn get_owner(&self, domain: &Domain) -> Result<Address>;
    async fn get_manager(&self, domain: &Domain) -> Result<Address>;
    async fn set_manager(
        &self,
        domain: &Domain,
        to: Address,
        options: &TxOptions,
    ) -> Result<PendingTransaction>;
    async fn can_edit_records(&self, domain: &Domain, address: Address) -> Result<bool>;

    async fn get_registration(&self, domain: &Domain) -> Result<Registration>;
    async fn get_price(&self, domain: &Domain, duration: Option<U256>) -> Result<Price>;

    async fn requires_commitment(&self, domain: &Domain) -> Result<bool>;
    async fn get_min_commitment_age(&self, domain: &Domain) -> Result<U256>;
    async fn get_max_commitment_age(&self, domain: &Domain) -> Result<U256>;
    async fn get_commitment_time(&self, domain: &Domain, commitment: B256) -> Result<U256>;
    async fn make_commitment(&self, domain: &Domain, options: &RegisterOptions) -> Result<B256>;
    async fn commit(
        &self,
        domain: &Domain,
        commitment: B256,
        options: &TxOptions,
    ) -> Result<PendingTransaction>;

    async fn register(
        &self,
        domain: &Domain,
        options: &RegisterOptions,
    ) -> Result<PendingTransaction>;
    async fn renew(&self, domain: &Domain, options: &RenewOptions) -> Result<PendingTransaction>;
    async fn transfer(
        &self,
        domain: &Domain,
        options: &TransferOptions,
    ) -> Result<PendingTransaction>;

    async fn get_resolver(&self, domain: &Domain) -> Result<Address>;
    async fn set_resolver(
        &self,
        domain: &Domain,
        resolver: Address,
        options: &TxOptions,
    ) -> Result<PendingTransaction>;

    async fn get_records(&self, domain: &Domain, query: &RecordQuery) -> Result<RecordValues>;
    async fn set_records(
        &self,
        domain: &Domain,
        update: &RecordUpdate,
        options: &TxOptions,
    ) -> Result<PendingTransaction>;
    async fn get_name(&self, domain: &Domain) -> Result<Option<String>>;
}

/// Splits a second-level domain into its label and parent node, the
/// shape every registration operation works on.
pub(crate) fn require_sld<'a>(
    domain: &'a Domain,
    operation: &'static str,
) -> Result<(&'a str, B256)> {
    match (domain.sld(), domain.parent()) {
        (Some(sld), Some(parent)) if domain.is_sld() => Ok((sld, parent.namehash())),
        _ => Err(NameError::UnsupportedNode {
            operation,
            name: domain.name(),
        }),
    }
}

/// ERC-721 token ids are the big-endian value of the node hash.
pub(crate) fn token_id(node: B256) -> U256 {
    U256::from_be_bytes(node.0)
}

/// Promotes a provider failure on a read the caller cannot do without
/// into an error naming what was being read.
pub(crate) fn required_read<T>(what: &'static str, result: Result<T>) -> Result<T> {
    result.map_err(|err| match err {
        NameError::Provider(source) => NameError::Read { what, source },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sld_splits_into_label_and_parent() {
        let domain = Domain::parse("alice.eth").unwrap();
        let (label, parent) = require_sld(&domain, "register").unwrap();
        assert_eq!(label, "alice");
        assert_eq!(parent, Domain::parse("eth").unwrap().namehash());
    }

    #[test]
    fn tld_and_subdomain_are_refused() {
        for name in ["eth", "a.b.eth"] {
            let domain = Domain::parse(name).unwrap();
            let err = require_sld(&domain, "register").unwrap_err();
            assert!(matches!(err, NameError::UnsupportedNode { .. }));
        }
    }

    #[test]
    fn token_ids_are_big_endian_nodes() {
        let node = B256::repeat_byte(0x11);
        assert_eq!(token_id(node).to_be_bytes::<32>(), node.0);
    }
}
