//! Static table of contract deployments per network.

use crate::chain::NetworkId;
use crate::error::{ProviderError, Result};
use alloy_primitives::{address, Address};
use std::fmt;

pub const MAINNET: NetworkId = 1;
pub const GOERLI: NetworkId = 5;

/// Local development chains resolve against the mainnet table.
const LOCAL_DEV: NetworkId = 31337;

/// Well-known contracts the SDK talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractRole {
    Multicall,
    MultiRegistryResolver,
    ControllerResolver,
    NamekitRegistry,
    NamekitRegistrar,
    NamekitRoot,
    NamekitRootWrapper,
    NamekitResolver,
    EnsRegistry,
    EnsRegistrar,
    EnsNameWrapper,
    EnsResolver,
    ForeverRegistry,
    ForeverRegistrar,
    ForeverResolver,
}

impl fmt::Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContractRole::Multicall => "multicall",
            ContractRole::MultiRegistryResolver => "multiRegistryResolver",
            ContractRole::ControllerResolver => "controllerResolver",
            ContractRole::NamekitRegistry => "namekitRegistry",
            ContractRole::NamekitRegistrar => "namekitRegistrar",
            ContractRole::NamekitRoot => "namekitRoot",
            ContractRole::NamekitRootWrapper => "namekitRootWrapper",
            ContractRole::NamekitResolver => "namekitResolver",
            ContractRole::EnsRegistry => "ensRegistry",
            ContractRole::EnsRegistrar => "ensRegistrar",
            ContractRole::EnsNameWrapper => "ensNameWrapper",
            ContractRole::EnsResolver => "ensResolver",
            ContractRole::ForeverRegistry => "foreverRegistry",
            ContractRole::ForeverRegistrar => "foreverRegistrar",
            ContractRole::ForeverResolver => "foreverResolver",
        };
        f.write_str(s)
    }
}

/// Looks up the deployed address of `role` on `network`.
pub fn contract_address(network: NetworkId, role: ContractRole) -> Result<Address> {
    let effective = if network == LOCAL_DEV { MAINNET } else { network };
    let found = match effective {
        MAINNET => mainnet(role),
        GOERLI => goerli(role),
        _ => None,
    };
    found.ok_or(ProviderError::MissingContract { role, network })
}

fn mainnet(role: ContractRole) -> Option<Address> {
    Some(match role {
        ContractRole::Multicall => address!("cA11bde05977b3631167028862bE2a173976CA11"),
        ContractRole::MultiRegistryResolver => {
            address!("00001F01A52B8fd2ef88DD3c87d502E90Ea505cb")
        }
        ContractRole::ControllerResolver => address!("76e325A21527E403a6b335e8efc2e0500aEF77D9"),
        ContractRole::NamekitRegistry => address!("06081C6B2B876EABDC41DFD3345e8Fa59588C02e"),
        ContractRole::NamekitRegistrar => address!("fEDDc1448Eb4480714A9942ba28a27b16Caf9cE4"),
        ContractRole::NamekitRoot => address!("D5237534f8800e1d30d3D5961CFE1104E93fa03a"),
        ContractRole::NamekitRootWrapper => address!("C48B94b7295f1Ec859c5D3f6A4b1cA474859bA31"),
        ContractRole::NamekitResolver => address!("e0297BD2A61c5f24b78DA28749D704e44c431578"),
        ContractRole::EnsRegistry => address!("00000000000C2E074eC69A0dFb2997BA6C7d2e1e"),
        ContractRole::EnsRegistrar => address!("57f1887a8BF19b14fC0dF6Fd9B2acc9Af147eA85"),
        ContractRole::EnsNameWrapper => address!("D4416b13d2b3a9aBae7AcD5D6C2BbDBE25686401"),
        ContractRole::EnsResolver => address!("231b0Ee14048e9dCcD1d247744d114a4EB5E8E63"),
        ContractRole::ForeverRegistry => address!("0001af047E9fb5dCD99E6823C900f3D8f5b2c5f4"),
        ContractRole::ForeverRegistrar => address!("8436F16c090B0A6B2A7ae4CfCc82E007302a4b38"),
        ContractRole::ForeverResolver => address!("E3D46B4b1585307CE4F255dA191b66AF5E0611A6"),
    })
}

fn goerli(role: ContractRole) -> Option<Address> {
    Some(match role {
        ContractRole::Multicall => address!("cA11bde05977b3631167028862bE2a173976CA11"),
        ContractRole::MultiRegistryResolver => {
            address!("00001F01A52B8fd2ef88DD3c87d502E90Ea505cb")
        }
        ContractRole::ControllerResolver => address!("76e325A21527E403a6b335e8efc2e0500aEF77D9"),
        ContractRole::NamekitRegistry => address!("905cD3aE367C62D29d8B019DEfF7919fa8672d0f"),
        ContractRole::NamekitRegistrar => address!("E6388006625C16Bac3B52A06Cb2BEFcF8Faa0349"),
        ContractRole::NamekitRoot => address!("0f2bF5b1446685FA72a371512986179ECDe4831a"),
        ContractRole::NamekitRootWrapper => address!("Dbe6c3420C6ABF8dB6ab16DF6255bbC738618e54"),
        ContractRole::NamekitResolver => address!("E4b17134aE6460DC8d216D179A77c65A63A542C8"),
        ContractRole::EnsRegistry => address!("00000000000C2E074eC69A0dFb2997BA6C7d2e1e"),
        ContractRole::EnsRegistrar => address!("57f1887a8BF19b14fC0dF6Fd9B2acc9Af147eA85"),
        ContractRole::EnsNameWrapper => address!("114D4603199df73e7D157787f8778E21fCd13066"),
        ContractRole::EnsResolver => address!("d7a4F6473f32aC2Af804B3686AE8F1932bC35750"),
        ContractRole::ForeverRegistry => address!("1E5266f64F0BcFC7C9E13fC900a75F53C51321C9"),
        ContractRole::ForeverRegistrar => address!("412C25ed3f7c688eEeF5E6A48612027388Bc9E63"),
        ContractRole::ForeverResolver => address!("b0737DcEbA696eEEAede9Cd672a6F04b8DF9447D"),
    })
}
