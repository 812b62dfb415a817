//! The client facade.
//!
//! [`NameClient`] parses names, picks the registry family handler for
//! the TLD and forwards the call. Handlers are built lazily on first
//! use and share one read batcher, so concurrent lookups coalesce into
//! aggregated multicalls regardless of which family they hit.

use crate::error::Result;
use crate::handlers::{EnsHandler, ForeverHandler, HandlerConfig, RegistryFamily, StandardHandler};
use crate::options::{RegisterOptions, RenewOptions, TransferOptions, TxOptions, UpdateConfig};
use alloy_primitives::{Address, B256, U256};
use namekit_dnscodec::Record;
use namekit_provider::{CallBatcher, ChainProvider, NetworkId, PendingTransaction};
use namekit_types::{
    AddressValue, CoinType, Domain, Price, RawContentHash, RecordQuery, RecordUpdate, RecordValues,
    Registration, RrSetQuery,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

struct ClientState {
    network: NetworkId,
    provider: Arc<dyn ChainProvider>,
    batch: Arc<CallBatcher>,
    handlers: HashMap<String, Arc<dyn RegistryFamily>>,
    standard: Option<Arc<dyn RegistryFamily>>,
}

impl ClientState {
    fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            network: self.network,
            provider: self.batch.clone(),
        }
    }
}

/// Entry point for name lookups and registrations across all families.
pub struct NameClient {
    state: RwLock<ClientState>,
}

impl NameClient {
    pub fn new(network: NetworkId, provider: Arc<dyn ChainProvider>) -> Self {
        let batch = Arc::new(CallBatcher::new(provider.clone()));
        NameClient {
            state: RwLock::new(ClientState {
                network,
                provider,
                batch,
                handlers: HashMap::new(),
                standard: None,
            }),
        }
    }

    pub fn network(&self) -> NetworkId {
        self.state.read().network
    }

    /// The underlying provider, without read batching.
    pub fn provider(&self) -> Arc<dyn ChainProvider> {
        self.state.read().provider.clone()
    }

    /// Points the client at another network or provider. Existing
    /// handlers re-resolve their deployments in place.
    pub fn update(&self, config: UpdateConfig) -> Result<()> {
        let mut state = self.state.write();
        if let Some(network) = config.network {
            state.network = network;
        }
        if let Some(provider) = config.provider {
            state.batch = Arc::new(CallBatcher::new(provider.clone()));
            state.provider = provider;
        }
        let handler_config = state.handler_config();
        for handler in state.handlers.values() {
            handler.update(handler_config.clone())?;
        }
        if let Some(standard) = &state.standard {
            standard.update(handler_config.clone())?;
        }
        Ok(())
    }

    fn handler(&self, domain: &Domain) -> Result<Arc<dyn RegistryFamily>> {
        let tld = domain.tld().to_string();
        {
            let state = self.state.read();
            let cached = match tld.as_str() {
                "eth" | "forever" => state.handlers.get(&tld),
                _ => state.standard.as_ref(),
            };
            if let Some(handler) = cached {
                return Ok(handler.clone());
            }
        }

        let mut state = self.state.write();
        let config = state.handler_config();
        match tld.as_str() {
            "eth" => {
                if let Some(handler) = state.handlers.get(&tld) {
                    return Ok(handler.clone());
                }
                debug!(tld = %tld, "constructing ens family handler");
                let handler: Arc<dyn RegistryFamily> = Arc::new(EnsHandler::new(config)?);
                state.handlers.insert(tld, handler.clone());
                Ok(handler)
            }
            "forever" => {
                if let Some(handler) = state.handlers.get(&tld) {
                    return Ok(handler.clone());
                }
                debug!(tld = %tld, "constructing forever family handler");
                let handler: Arc<dyn RegistryFamily> = Arc::new(ForeverHandler::new(config)?);
                state.handlers.insert(tld, handler.clone());
                Ok(handler)
            }
            _ => {
                if let Some(handler) = &state.standard {
                    return Ok(handler.clone());
                }
                debug!("constructing standard family handler");
                let handler: Arc<dyn RegistryFamily> = Arc::new(StandardHandler::new(config)?);
                state.standard = Some(handler.clone());
                Ok(handler)
            }
        }
    }

    /// The registered holder of the name.
    pub async fn get_owner(&self, name: &str) -> Result<Address> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.get_owner(&domain).await
    }

    /// The account allowed to manage records for the name.
    pub async fn get_manager(&self, name: &str) -> Result<Address> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.get_manager(&domain).await
    }

    pub async fn set_manager(
        &self,
        name: &str,
        to: Address,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.set_manager(&domain, to, options).await
    }

    pub async fn can_edit_records(&self, name: &str, address: Address) -> Result<bool> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.can_edit_records(&domain, address).await
    }

    /// Registration status, owner, expiry and custody source.
    pub async fn get_registration(&self, name: &str) -> Result<Registration> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.get_registration(&domain).await
    }

    /// Registration price for `duration` seconds. Families without
    /// renewal ignore the duration.
    pub async fn get_price(&self, name: &str, duration: Option<U256>) -> Result<Price> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.get_price(&domain, duration).await
    }

    /// Whether registering this name takes a commit/reveal round.
    pub async fn requires_commitment(&self, name: &str) -> Result<bool> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.requires_commitment(&domain).await
    }

    pub async fn get_min_commitment_age(&self, name: &str) -> Result<U256> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.get_min_commitment_age(&domain).await
    }

    pub async fn get_max_commitment_age(&self, name: &str) -> Result<U256> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.get_max_commitment_age(&domain).await
    }

    /// When `commitment` was committed on chain, zero if never.
    pub async fn get_commitment_time(&self, name: &str, commitment: B256) -> Result<U256> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?
            .get_commitment_time(&domain, commitment)
            .await
    }

    /// Computes the commitment hash for a later [`Self::register`].
    pub async fn make_commitment(&self, name: &str, options: &RegisterOptions) -> Result<B256> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.make_commitment(&domain, options).await
    }

    /// Publishes a commitment. Fails with
    /// [`crate::NameError::CommitmentNotRequired`] where the family
    /// registers directly.
    pub async fn commit(
        &self,
        name: &str,
        commitment: B256,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.commit(&domain, commitment, options).await
    }

    /// Registers the name, picking the family's direct or reveal path.
    pub async fn register(
        &self,
        name: &str,
        options: &RegisterOptions,
    ) -> Result<PendingTransaction> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.register(&domain, options).await
    }

    pub async fn renew(&self, name: &str, options: &RenewOptions) -> Result<PendingTransaction> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.renew(&domain, options).await
    }

    /// Transfers the name's token to `options.to`.
    pub async fn transfer(
        &self,
        name: &str,
        options: &TransferOptions,
    ) -> Result<PendingTransaction> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.transfer(&domain, options).await
    }

    pub async fn get_resolver(&self, name: &str) -> Result<Address> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.get_resolver(&domain).await
    }

    pub async fn set_resolver(
        &self,
        name: &str,
        resolver: Address,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?
            .set_resolver(&domain, resolver, options)
            .await
    }

    /// Reads every record named by `query` in one round trip.
    pub async fn get_records(&self, name: &str, query: &RecordQuery) -> Result<RecordValues> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.get_records(&domain, query).await
    }

    /// Writes all records in `update` in one transaction.
    pub async fn set_records(
        &self,
        name: &str,
        update: &RecordUpdate,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let domain = Domain::parse(name)?;
        self.handler(&domain)?.set_records(&domain, update, options).await
    }

    /// The primary name an address points back at, if any family's
    /// reverse registry has one.
    pub async fn get_name(&self, address: Address) -> Result<Option<String>> {
        let hex = hex::encode(address);
        let ens = self.lookup_name(format!("0x{hex}.eth"));
        let forever = self.lookup_name(format!("0x{hex}.forever"));
        let standard = self.lookup_name(format!("0x{hex}.invalid"));
        let (ens, forever, standard) = tokio::join!(ens, forever, standard);
        Ok(ens?.or(forever?).or(standard?))
    }

    async fn lookup_name(&self, name: String) -> Result<Option<String>> {
        let domain = Domain::parse(&name)?;
        self.handler(&domain)?.get_name(&domain).await
    }

    pub async fn get_dns(&self, name: &str, queries: Vec<RrSetQuery>) -> Result<Vec<Record>> {
        let query = RecordQuery {
            dns: queries,
            ..Default::default()
        };
        Ok(self.get_records(name, &query).await?.dns)
    }

    pub async fn get_text(&self, name: &str, key: &str) -> Result<Option<String>> {
        let query = RecordQuery {
            text: vec![key.to_string()],
            ..Default::default()
        };
        let mut values = self.get_records(name, &query).await?;
        Ok(values.text.remove(key).flatten())
    }

    pub async fn get_address(&self, name: &str, coin: CoinType) -> Result<Option<AddressValue>> {
        let query = RecordQuery {
            address: vec![coin],
            ..Default::default()
        };
        let mut values = self.get_records(name, &query).await?;
        Ok(values.address.remove(&coin).flatten())
    }

    pub async fn get_content_hash(&self, name: &str) -> Result<Option<RawContentHash>> {
        let query = RecordQuery {
            content_hash: true,
            ..Default::default()
        };
        Ok(self.get_records(name, &query).await?.content_hash)
    }

    pub async fn set_dns(
        &self,
        name: &str,
        records: Vec<Record>,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let update = RecordUpdate {
            dns: records,
            ..Default::default()
        };
        self.set_records(name, &update, options).await
    }

    pub async fn set_text(
        &self,
        name: &str,
        key: &str,
        value: &str,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let mut update = RecordUpdate::default();
        update.text.insert(key.to_string(), value.to_string());
        self.set_records(name, &update, options).await
    }

    pub async fn set_address(
        &self,
        name: &str,
        address: Address,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let mut update = RecordUpdate::default();
        update.address.insert(CoinType::ETH, AddressValue::Eth(address));
        self.set_records(name, &update, options).await
    }

    pub async fn set_content_hash(
        &self,
        name: &str,
        hash: RawContentHash,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let update = RecordUpdate {
            content_hash: Some(hash),
            ..Default::default()
        };
        self.set_records(name, &update, options).await
    }
}
