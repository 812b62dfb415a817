use crate::error::Result;
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

/// EVM chain id.
pub type NetworkId = u64;

/// A read-only contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCall {
    pub to: Address,
    pub data: Bytes,
}

/// A state-changing call to sign and submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    /// Sender; `None` lets the provider pick its default signer.
    pub from: Option<Address>,
}

/// Handle to a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: B256,
}

/// The SDK's connection to a chain.
///
/// Implementations wrap whatever RPC stack the host application uses.
/// All SDK reads funnel through [`ChainProvider::call`], which is what
/// makes wrapping a provider in a [`crate::CallBatcher`] effective.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Chain id this provider is connected to.
    fn network(&self) -> NetworkId;

    /// Executes a read-only call and returns the raw return data.
    async fn call(&self, call: ReadCall) -> Result<Bytes>;

    /// Signs and submits a transaction.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<PendingTransaction>;

    /// The address transactions are sent from when no signer is given.
    async fn default_signer(&self) -> Result<Address>;
}
