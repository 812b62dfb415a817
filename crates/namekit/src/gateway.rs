//! Capability-scoped controller discovery.
//!
//! Registries advertise registration capabilities through controller
//! contracts. The on-chain controller resolver walks a registry's
//! controllable surface for a capability id and relays probe calls to
//! whichever controller it finds, so one round trip answers both "who
//! controls this node" and "what does it say".

use crate::contracts::{self, ControllerResolver};
use crate::error::{NameError, Result};
use alloy_primitives::{Address, Bytes, FixedBytes, B256};
use alloy_sol_types::SolCall;
use namekit_provider::{contract_address, ChainProvider, ContractRole, NetworkId};
use std::sync::Arc;

/// Availability codes reported by controller `availabilityInfo` and
/// `available` probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Availability {
    Taken,
    Available,
    Reserved,
    Closed,
    Other(u8),
}

impl From<u8> for Availability {
    fn from(code: u8) -> Self {
        match code {
            0 => Availability::Taken,
            1 => Availability::Available,
            2 => Availability::Reserved,
            3 => Availability::Closed,
            other => Availability::Other(other),
        }
    }
}

/// Outcome of one relayed controller call.
#[derive(Debug, Clone)]
pub(crate) struct CallResult {
    pub success: bool,
    pub data: Option<Bytes>,
}

impl CallResult {
    /// Decodes the payload against `C`'s return type. `None` when the
    /// call reverted or the reply does not decode.
    pub fn decode<C: SolCall>(&self) -> Option<C::Return> {
        let data = self.data.as_deref()?;
        C::abi_decode_returns(data, true).ok()
    }

    /// As [`Self::decode`], but a missing value is a hard error naming
    /// the controller method that failed.
    pub fn require<C: SolCall>(
        &self,
        method: &'static str,
        controller: Address,
    ) -> Result<C::Return> {
        self.decode::<C>()
            .ok_or(NameError::ControllerRead { method, controller })
    }
}

/// Client handle for the deployed controller resolver.
pub(crate) struct ControllerGateway {
    address: Address,
    provider: Arc<dyn ChainProvider>,
}

impl ControllerGateway {
    pub fn new(network: NetworkId, provider: Arc<dyn ChainProvider>) -> Result<Self> {
        let address = contract_address(network, ContractRole::ControllerResolver)?;
        Ok(Self { address, provider })
    }

    /// Locates the controller advertising `capability` for a registry
    /// node without relaying any calls.
    pub async fn find_controller(
        &self,
        registry: Address,
        registrar: Address,
        node: B256,
        capability: FixedBytes<4>,
    ) -> Result<Address> {
        let ret = contracts::read(
            &self.provider,
            self.address,
            ControllerResolver::findControllerCall {
                registry,
                registrar,
                node,
                capability,
            },
        )
        .await?;
        Ok(ret.controller)
    }

    /// Relays `calls` to the capability's controller. Individual call
    /// failures stay isolated in their [`CallResult`] slot.
    pub async fn multicall(
        &self,
        registry: Address,
        registrar: Address,
        node: B256,
        capability: FixedBytes<4>,
        calls: Vec<Bytes>,
    ) -> Result<(Vec<CallResult>, Address)> {
        let ret = contracts::read(
            &self.provider,
            self.address,
            ControllerResolver::multicallCall {
                registry,
                registrar,
                node,
                capability,
                calls,
            },
        )
        .await?;
        let results = ret
            .returnData
            .into_iter()
            .map(|outcome| CallResult {
                success: outcome.success,
                data: outcome.success.then(|| outcome.data),
            })
            .collect();
        Ok((results, ret.controller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::StandardController;
    use alloy_primitives::U256;
    use alloy_sol_types::SolValue;
    use namekit_provider::testing::StubProvider;

    #[test]
    fn availability_codes_map() {
        assert_eq!(Availability::from(0), Availability::Taken);
        assert_eq!(Availability::from(1), Availability::Available);
        assert_eq!(Availability::from(2), Availability::Reserved);
        assert_eq!(Availability::from(3), Availability::Closed);
        assert_eq!(Availability::from(7), Availability::Other(7));
    }

    #[test]
    fn failed_call_decodes_to_none() {
        let result = CallResult {
            success: false,
            data: None,
        };
        assert!(result
            .decode::<StandardController::minCommitmentAgeCall>()
            .is_none());
    }

    #[test]
    fn successful_payload_decodes() {
        let result = CallResult {
            success: true,
            data: Some(U256::from(90u64).abi_encode().into()),
        };
        let ret = result
            .decode::<StandardController::minCommitmentAgeCall>()
            .unwrap();
        assert_eq!(ret.age, U256::from(90u64));
    }

    #[test]
    fn require_names_the_failing_method() {
        let result = CallResult {
            success: true,
            data: Some(Bytes::from(vec![1, 2, 3])),
        };
        let err = result
            .require::<StandardController::minCommitmentAgeCall>("minCommitmentAge", Address::ZERO)
            .unwrap_err();
        assert!(matches!(
            err,
            NameError::ControllerRead {
                method: "minCommitmentAge",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn failed_slot_keeps_its_position_in_a_relayed_batch() {
        let stub = Arc::new(StubProvider::new(1));
        let controller = Address::repeat_byte(0xC3);
        let outcomes = vec![
            ControllerResolver::CallOutcome {
                data: U256::from(60u64).abi_encode().into(),
                success: true,
            },
            ControllerResolver::CallOutcome {
                data: Bytes::new(),
                success: false,
            },
            ControllerResolver::CallOutcome {
                data: U256::from(86_400u64).abi_encode().into(),
                success: true,
            },
        ];
        stub.set_return(
            contract_address(1, ContractRole::ControllerResolver).unwrap(),
            ControllerResolver::multicallCall::SELECTOR,
            (outcomes, controller).abi_encode_params(),
        );

        let gateway = ControllerGateway::new(1, stub).unwrap();
        let (results, found) = gateway
            .multicall(
                Address::repeat_byte(1),
                Address::repeat_byte(2),
                B256::repeat_byte(3),
                FixedBytes([0, 1, 2, 3]),
                vec![Bytes::new(), Bytes::new(), Bytes::new()],
            )
            .await
            .unwrap();

        assert_eq!(found, controller);
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0]
                .decode::<StandardController::minCommitmentAgeCall>()
                .unwrap()
                .age,
            U256::from(60u64)
        );
        assert!(!results[1].success);
        assert!(results[1]
            .decode::<StandardController::minCommitmentAgeCall>()
            .is_none());
        assert_eq!(
            results[2]
                .decode::<StandardController::maxCommitmentAgeCall>()
                .unwrap()
                .age,
            U256::from(86_400u64)
        );
    }
}
