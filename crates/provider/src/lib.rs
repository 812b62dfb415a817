//! Chain access for the Namekit SDK.
//!
//! [`ChainProvider`] is the only seam to the outside world: everything the
//! SDK does on chain goes through its four methods. [`CallBatcher`] wraps
//! any provider and transparently coalesces concurrent reads into single
//! Multicall3 `aggregate3` calls. [`deployments`] maps contract roles to
//! their per-network addresses.

pub mod batch;
pub mod chain;
pub mod deployments;
pub mod error;
pub mod testing;

pub use batch::CallBatcher;
pub use chain::{ChainProvider, NetworkId, PendingTransaction, ReadCall, TransactionRequest};
pub use deployments::{contract_address, ContractRole};
pub use error::{ProviderError, Result};
