//! In-memory provider for tests.

use crate::batch::Multicall3;
use crate::chain::{ChainProvider, NetworkId, PendingTransaction, ReadCall, TransactionRequest};
use crate::deployments::{contract_address, ContractRole};
use crate::error::{ProviderError, Result};
use alloy_primitives::{keccak256, Address, Bytes};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Clone)]
enum Route {
    Return(Bytes),
    Revert(Bytes),
}

/// Scripted [`ChainProvider`] backed by routing tables.
///
/// Reads are answered by exact calldata match first, then by
/// `(target, selector)`. Calls to the Multicall3 deployment are unpacked
/// and each inner call routed individually, so code under test behaves
/// the same behind a [`crate::CallBatcher`]. Unmatched inner calls report
/// failure in their aggregate slot; unmatched direct reads error.
pub struct StubProvider {
    network: NetworkId,
    signer: Option<Address>,
    exact: Mutex<HashMap<(Address, Bytes), Route>>,
    by_selector: Mutex<HashMap<(Address, [u8; 4]), Route>>,
    reads: Mutex<Vec<ReadCall>>,
    transactions: Mutex<Vec<TransactionRequest>>,
    nonce: Mutex<u64>,
}

impl StubProvider {
    pub fn new(network: NetworkId) -> Self {
        StubProvider {
            network,
            signer: None,
            exact: Mutex::new(HashMap::new()),
            by_selector: Mutex::new(HashMap::new()),
            reads: Mutex::new(Vec::new()),
            transactions: Mutex::new(Vec::new()),
            nonce: Mutex::new(0),
        }
    }

    pub fn with_signer(mut self, signer: Address) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Answers any call to `to` with the given selector.
    pub fn set_return(&self, to: Address, selector: [u8; 4], data: impl Into<Bytes>) {
        self.by_selector
            .lock()
            .insert((to, selector), Route::Return(data.into()));
    }

    /// Makes any call to `to` with the given selector revert.
    pub fn set_revert(&self, to: Address, selector: [u8; 4]) {
        self.by_selector
            .lock()
            .insert((to, selector), Route::Revert(Bytes::new()));
    }

    /// Answers only an exact calldata match, taking precedence over
    /// selector routes.
    pub fn set_return_exact(&self, to: Address, calldata: impl Into<Bytes>, data: impl Into<Bytes>) {
        self.exact
            .lock()
            .insert((to, calldata.into()), Route::Return(data.into()));
    }

    pub fn set_revert_exact(&self, to: Address, calldata: impl Into<Bytes>) {
        self.exact
            .lock()
            .insert((to, calldata.into()), Route::Revert(Bytes::new()));
    }

    /// Every raw read seen, aggregates included.
    pub fn reads(&self) -> Vec<ReadCall> {
        self.reads.lock().clone()
    }

    /// Every transaction submitted.
    pub fn transactions(&self) -> Vec<TransactionRequest> {
        self.transactions.lock().clone()
    }

    fn route(&self, to: Address, data: &Bytes) -> Option<Route> {
        if let Some(route) = self.exact.lock().get(&(to, data.clone())) {
            return Some(route.clone());
        }
        let selector: [u8; 4] = data.get(0..4)?.try_into().ok()?;
        self.by_selector.lock().get(&(to, selector)).cloned()
    }

    fn aggregate(&self, data: &Bytes) -> Result<Bytes> {
        let call = Multicall3::aggregate3Call::abi_decode(data, true).map_err(|err| {
            ProviderError::Transport {
                message: format!("bad aggregate call: {err}"),
            }
        })?;
        let results: Vec<Multicall3::Call3Result> = call
            .calls
            .into_iter()
            .map(|inner| match self.route(inner.target, &inner.callData) {
                Some(Route::Return(bytes)) => Multicall3::Call3Result {
                    success: true,
                    returnData: bytes,
                },
                Some(Route::Revert(bytes)) => Multicall3::Call3Result {
                    success: false,
                    returnData: bytes,
                },
                None => Multicall3::Call3Result {
                    success: false,
                    returnData: Bytes::new(),
                },
            })
            .collect();
        Ok(results.abi_encode().into())
    }
}

#[async_trait]
impl ChainProvider for StubProvider {
    fn network(&self) -> NetworkId {
        self.network
    }

    async fn call(&self, call: ReadCall) -> Result<Bytes> {
        self.reads.lock().push(call.clone());
        let is_aggregate = contract_address(self.network, ContractRole::Multicall)
            .map(|multicall| call.to == multicall)
            .unwrap_or(false)
            && call.data.get(0..4) == Some(&Multicall3::aggregate3Call::SELECTOR[..]);
        if is_aggregate {
            return self.aggregate(&call.data);
        }
        match self.route(call.to, &call.data) {
            Some(Route::Return(bytes)) => Ok(bytes),
            Some(Route::Revert(revert)) => Err(ProviderError::CallFailed {
                to: call.to,
                data: call.data,
                revert,
            }),
            None => Err(ProviderError::CallFailed {
                to: call.to,
                data: call.data,
                revert: Bytes::new(),
            }),
        }
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<PendingTransaction> {
        self.transactions.lock().push(tx);
        let nonce = {
            let mut guard = self.nonce.lock();
            *guard += 1;
            *guard
        };
        Ok(PendingTransaction {
            hash: keccak256(nonce.to_be_bytes()),
        })
    }

    async fn default_signer(&self) -> Result<Address> {
        self.signer.ok_or(ProviderError::NoSigner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[tokio::test]
    async fn exact_routes_win_over_selector_routes() {
        let target = address!("00000000000000000000000000000000000000CC");
        let stub = StubProvider::new(1);
        let calldata = Bytes::from(vec![0xAB, 0xCD, 0xEF, 0x01, 0x02]);
        stub.set_return(target, [0xAB, 0xCD, 0xEF, 0x01], vec![0x11]);
        stub.set_return_exact(target, calldata.clone(), vec![0x22]);

        let exact = stub
            .call(ReadCall {
                to: target,
                data: calldata,
            })
            .await
            .unwrap();
        assert_eq!(exact, Bytes::from(vec![0x22]));

        let by_selector = stub
            .call(ReadCall {
                to: target,
                data: Bytes::from(vec![0xAB, 0xCD, 0xEF, 0x01, 0x99]),
            })
            .await
            .unwrap();
        assert_eq!(by_selector, Bytes::from(vec![0x11]));
    }

    #[tokio::test]
    async fn unmatched_direct_reads_error() {
        let target = address!("00000000000000000000000000000000000000CC");
        let stub = StubProvider::new(1);
        let err = stub
            .call(ReadCall {
                to: target,
                data: Bytes::from(vec![0, 0, 0, 0]),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::CallFailed { .. }));
    }
}
