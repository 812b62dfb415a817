//! Debounced coalescing of reads into Multicall3 aggregates.

use crate::chain::{ChainProvider, NetworkId, PendingTransaction, ReadCall, TransactionRequest};
use crate::deployments::{contract_address, ContractRole};
use crate::error::{ProviderError, Result};
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

sol! {
    /// Multicall3, deployed at the same address on every supported chain.
    contract Multicall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Call3Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Call3Result[] memory returnData);
    }
}

/// How long a tick stays open for more reads before it flushes.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(6);

struct QueuedCall {
    call: ReadCall,
    reply: oneshot::Sender<Result<Bytes>>,
}

struct BatchState {
    inner: Arc<dyn ChainProvider>,
    multicall: OnceCell<Address>,
    queue: Mutex<Vec<QueuedCall>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// Wraps a provider and coalesces concurrent reads.
///
/// Each read is queued and answered through a oneshot channel. Every
/// enqueue restarts a short debounce timer; when it lapses, the whole
/// queue is drained into one `aggregate3` call with per-call failure
/// allowed, and each queued read is resolved from its slot of the
/// aggregate response. Transactions and signer lookups pass straight
/// through to the wrapped provider.
pub struct CallBatcher {
    state: Arc<BatchState>,
    debounce: Duration,
}

impl CallBatcher {
    pub fn new(inner: Arc<dyn ChainProvider>) -> Self {
        Self::with_debounce(inner, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(inner: Arc<dyn ChainProvider>, debounce: Duration) -> Self {
        CallBatcher {
            state: Arc::new(BatchState {
                inner,
                multicall: OnceCell::new(),
                queue: Mutex::new(Vec::new()),
                timer: Mutex::new(None),
            }),
            debounce,
        }
    }

    fn schedule_flush(&self) {
        let state = Arc::clone(&self.state);
        let debounce = self.debounce;
        let mut timer = self.state.timer.lock();
        if let Some(previous) = timer.take() {
            previous.abort();
        }
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // Flush in a detached task: a reschedule may only cancel the
            // sleep, never a drain that has already begun.
            tokio::spawn(async move { flush(&state).await });
        }));
    }
}

async fn flush(state: &BatchState) {
    let pending = std::mem::take(&mut *state.queue.lock());
    if pending.is_empty() {
        return;
    }
    let multicall = match state
        .multicall
        .get_or_try_init(|| contract_address(state.inner.network(), ContractRole::Multicall))
    {
        Ok(address) => *address,
        Err(err) => return reject_all(pending, err),
    };
    debug!(reads = pending.len(), %multicall, "flushing coalesced read batch");

    let calls: Vec<Multicall3::Call3> = pending
        .iter()
        .map(|queued| Multicall3::Call3 {
            target: queued.call.to,
            allowFailure: true,
            callData: queued.call.data.clone(),
        })
        .collect();
    let request = ReadCall {
        to: multicall,
        data: Multicall3::aggregate3Call { calls }.abi_encode().into(),
    };
    let raw = match state.inner.call(request).await {
        Ok(raw) => raw,
        Err(err) => return reject_all(pending, err),
    };
    let results = match Multicall3::aggregate3Call::abi_decode_returns(&raw, true) {
        Ok(decoded) => decoded.returnData,
        Err(err) => {
            return reject_all(
                pending,
                ProviderError::Inconsistent {
                    message: format!("undecodable aggregate response: {err}"),
                },
            )
        }
    };
    if results.len() != pending.len() {
        let message = format!(
            "{} responses for {} queued calls",
            results.len(),
            pending.len()
        );
        return reject_all(pending, ProviderError::Inconsistent { message });
    }
    for (queued, result) in pending.into_iter().zip(results) {
        let outcome = if result.success {
            Ok(result.returnData)
        } else {
            Err(ProviderError::CallFailed {
                to: queued.call.to,
                data: queued.call.data,
                revert: result.returnData,
            })
        };
        let _ = queued.reply.send(outcome);
    }
}

fn reject_all(pending: Vec<QueuedCall>, err: ProviderError) {
    for queued in pending {
        let _ = queued.reply.send(Err(err.clone()));
    }
}

#[async_trait]
impl ChainProvider for CallBatcher {
    fn network(&self) -> NetworkId {
        self.state.inner.network()
    }

    async fn call(&self, call: ReadCall) -> Result<Bytes> {
        let (reply, response) = oneshot::channel();
        self.state.queue.lock().push(QueuedCall { call, reply });
        self.schedule_flush();
        response.await.map_err(|_| ProviderError::Inconsistent {
            message: "read batch dropped before completion".to_string(),
        })?
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<PendingTransaction> {
        self.state.inner.send_transaction(tx).await
    }

    async fn default_signer(&self) -> Result<Address> {
        self.state.inner.default_signer().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubProvider;
    use alloy_primitives::{address, U256};
    use alloy_sol_types::SolValue;

    sol! {
        contract Probe {
            function ping() external view returns (uint256 value);
            function pong() external view returns (uint256 value);
        }
    }

    const TARGET: Address = address!("00000000000000000000000000000000000000AA");

    struct Canned {
        response: Result<Bytes>,
        reads: Mutex<Vec<ReadCall>>,
    }

    impl Canned {
        fn new(response: Result<Bytes>) -> Self {
            Canned {
                response,
                reads: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChainProvider for Canned {
        fn network(&self) -> NetworkId {
            1
        }

        async fn call(&self, call: ReadCall) -> Result<Bytes> {
            self.reads.lock().push(call);
            self.response.clone()
        }

        async fn send_transaction(&self, _tx: TransactionRequest) -> Result<PendingTransaction> {
            Err(ProviderError::Transport {
                message: "reads only".to_string(),
            })
        }

        async fn default_signer(&self) -> Result<Address> {
            Err(ProviderError::NoSigner)
        }
    }

    fn ping() -> ReadCall {
        ReadCall {
            to: TARGET,
            data: Probe::pingCall {}.abi_encode().into(),
        }
    }

    fn pong() -> ReadCall {
        ReadCall {
            to: TARGET,
            data: Probe::pongCall {}.abi_encode().into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn coalesces_concurrent_reads_into_one_aggregate() {
        let stub = Arc::new(StubProvider::new(1));
        stub.set_return(TARGET, Probe::pingCall::SELECTOR, U256::from(7).abi_encode());
        stub.set_return(TARGET, Probe::pongCall::SELECTOR, U256::from(9).abi_encode());
        let batcher = CallBatcher::new(stub.clone());

        let (a, b) = tokio::join!(batcher.call(ping()), batcher.call(pong()));
        let a = Probe::pingCall::abi_decode_returns(&a.unwrap(), true).unwrap();
        let b = Probe::pongCall::abi_decode_returns(&b.unwrap(), true).unwrap();
        assert_eq!(a.value, U256::from(7));
        assert_eq!(b.value, U256::from(9));
        assert_eq!(stub.reads().len(), 1, "both reads share one aggregate");
    }

    #[tokio::test(start_paused = true)]
    async fn separate_ticks_make_separate_aggregates() {
        let stub = Arc::new(StubProvider::new(1));
        stub.set_return(TARGET, Probe::pingCall::SELECTOR, U256::from(7).abi_encode());
        let batcher = CallBatcher::new(stub.clone());

        batcher.call(ping()).await.unwrap();
        batcher.call(ping()).await.unwrap();
        assert_eq!(stub.reads().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn per_call_failures_stay_isolated() {
        let stub = Arc::new(StubProvider::new(1));
        stub.set_return(TARGET, Probe::pingCall::SELECTOR, U256::from(7).abi_encode());
        stub.set_revert(TARGET, Probe::pongCall::SELECTOR);
        let batcher = CallBatcher::new(stub.clone());

        let (a, b) = tokio::join!(batcher.call(ping()), batcher.call(pong()));
        assert!(a.is_ok());
        match b.unwrap_err() {
            ProviderError::CallFailed { to, data, .. } => {
                assert_eq!(to, TARGET);
                assert_eq!(data, pong().data);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn short_aggregate_response_rejects_every_read() {
        let response = vec![Multicall3::Call3Result {
            success: true,
            returnData: Bytes::new(),
        }]
        .abi_encode();
        let inner = Arc::new(Canned::new(Ok(response.into())));
        let batcher = CallBatcher::new(inner);

        let (a, b) = tokio::join!(batcher.call(ping()), batcher.call(pong()));
        assert!(matches!(a, Err(ProviderError::Inconsistent { .. })));
        assert!(matches!(b, Err(ProviderError::Inconsistent { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_rejects_every_read() {
        let inner = Arc::new(Canned::new(Err(ProviderError::Transport {
            message: "connection refused".to_string(),
        })));
        let batcher = CallBatcher::new(inner);

        let (a, b) = tokio::join!(batcher.call(ping()), batcher.call(pong()));
        assert!(matches!(a, Err(ProviderError::Transport { .. })));
        assert!(matches!(b, Err(ProviderError::Transport { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_multicall_deployment_fails_the_batch() {
        let stub = Arc::new(StubProvider::new(777));
        let batcher = CallBatcher::new(stub.clone());
        let err = batcher.call(ping()).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::MissingContract {
                role: ContractRole::Multicall,
                ..
            }
        ));
        assert!(stub.reads().is_empty(), "nothing reaches the chain");
    }

    #[tokio::test(start_paused = true)]
    async fn transactions_bypass_the_queue() {
        let signer = address!("00000000000000000000000000000000000000BB");
        let stub = Arc::new(StubProvider::new(1).with_signer(signer));
        let batcher = CallBatcher::new(stub.clone());

        assert_eq!(batcher.network(), 1);
        assert_eq!(batcher.default_signer().await.unwrap(), signer);
        batcher
            .send_transaction(TransactionRequest {
                to: TARGET,
                data: Bytes::new(),
                value: U256::ZERO,
                from: Some(signer),
            })
            .await
            .unwrap();
        assert_eq!(stub.transactions().len(), 1);
        assert!(stub.reads().is_empty());
    }
}
